mod app;
mod auth;
mod config;
mod error;
mod state;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "arcade_auth=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    // Idempotent schema bootstrap: an ordered list of migration steps,
    // each a no-op when already applied.
    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("apply migrations")?;

    let app = app::build_app(app_state);
    app::serve(app).await
}
