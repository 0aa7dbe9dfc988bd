use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::PublicUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::AppError,
    state::AppState,
};

/// Result of a successful register or login: the public identity plus
/// a freshly signed access token.
#[derive(Debug)]
pub struct AuthOutcome {
    pub user: PublicUser,
    pub token: String,
}

fn contains_whitespace(username: &str) -> bool {
    lazy_static! {
        static ref WS_RE: Regex = Regex::new(r"\s").unwrap();
    }
    WS_RE.is_match(username)
}

fn require_fields(
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, String), AppError> {
    match (username, password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
        _ => Err(AppError::Validation(
            "username and password are required".into(),
        )),
    }
}

/// Register a new user: validate, check uniqueness, hash, persist,
/// issue a token. Steps short-circuit on the first failure.
pub async fn register(
    state: &AppState,
    username: Option<String>,
    password: Option<String>,
) -> Result<AuthOutcome, AppError> {
    let (username, password) = require_fields(username, password)?;

    if password.chars().count() < 6 {
        return Err(AppError::Validation(
            "password must be at least 6 characters long".into(),
        ));
    }

    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(AppError::Validation(
            "username must be between 3 and 20 characters".into(),
        ));
    }

    if contains_whitespace(&username) {
        return Err(AppError::Validation("username cannot contain spaces".into()));
    }

    // Early exit only; the store's UNIQUE constraint is the real
    // uniqueness guarantee against a concurrent insert.
    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(username = %username, "registration for taken username");
        return Err(AppError::Conflict("username already exists".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = User::create(&state.db, &username, &password_hash).await?;

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id, &user.username)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(AuthOutcome {
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
        token,
    })
}

/// Log an existing user in. Unknown username and wrong password yield
/// the identical error so neither field is revealed.
pub async fn login(
    state: &AppState,
    username: Option<String>,
    password: Option<String>,
) -> Result<AuthOutcome, AppError> {
    let (username, password) = require_fields(username, password)?;

    let user = match User::find_by_username(&state.db, &username).await? {
        Some(u) => u,
        None => {
            warn!(username = %username, "login for unknown username");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id, &user.username)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(AuthOutcome {
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
        token,
    })
}
