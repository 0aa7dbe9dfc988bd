use serde::{Deserialize, Serialize};

/// JWT payload: which user authenticated, and when the token dies.
///
/// Tokens are stateless; expiry is the only invalidation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: i64,          // user ID
    pub username: String, // user name at issuance
    pub iat: i64,         // issued at (unix timestamp)
    pub exp: i64,         // expires at (unix timestamp)
}
