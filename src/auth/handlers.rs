use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        repo::User,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

// A body axum cannot parse gets the same {success, message} envelope
// as every other rejection instead of axum's plain-text default.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    Ok(body)
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let payload = parse_body(payload)?;
    let outcome = services::register(&state, payload.username, payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "user registered successfully".into(),
            user: outcome.user,
            token: outcome.token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let payload = parse_body(payload)?;
    let outcome = services::login(&state, payload.username, payload.password).await?;
    Ok(Json(AuthResponse {
        success: true,
        message: "login successful".into(),
        user: outcome.user,
        token: outcome.token,
    }))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    success: bool,
    user: PublicUser,
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    // The token is the authorization evidence; the row lookup just
    // reflects the current stored identity back.
    let user = User::find_by_id(&state.db, claims.id)
        .await?
        .ok_or(AppError::InvalidToken)?;
    Ok(Json(MeResponse {
        success: true,
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
    }))
}
