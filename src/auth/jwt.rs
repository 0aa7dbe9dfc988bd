use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig, error::AppError, state::AppState};

/// HMAC signing/verification keys derived from the process-wide secret.
///
/// The secret is loaded once at startup; tokens live `ttl` (24h by
/// default) and expire purely by elapsed time.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig { secret, ttl_hours } = state.config.jwt.clone();
        Self::new(&secret, ttl_hours)
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_hours as u64) * 3600),
        }
    }

    /// Sign an access token for `{id, username}`, expiring ttl from now.
    pub fn sign(&self, id: i64, username: &str) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Token(e.to_string()))?;
        debug!(user_id = id, "jwt signed");
        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Bad signature, malformed payload and elapsed expiry all collapse
    /// into the same `InvalidToken` so callers cannot probe which check
    /// failed.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| AppError::InvalidToken)?;
        debug!(user_id = data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::new("test-secret", 24)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let token = keys.sign(1, "alice").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, 1);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let keys = make_keys();
        let token = keys.sign(1, "alice").expect("sign");
        let (rest, sig) = token.rsplit_once('.').expect("jwt has three segments");
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", rest, flipped, &sig[1..]);
        let err = keys.verify(&tampered).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = make_keys().sign(1, "alice").expect("sign");
        let other = JwtKeys::new("different-secret", 24);
        assert!(matches!(other.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        // Hand-craft a token whose expiry elapsed well past the default
        // leeway window.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            id: 1,
            username: "alice".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys();
        assert!(matches!(
            keys.verify("not-a-token"),
            Err(AppError::InvalidToken)
        ));
    }
}
