//! Authentication utilities: JWT validation and session extraction
//!
//! Tokens are issued by the hosted auth service; the worker only validates
//! them and turns the claims into a [`Session`].

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Request, Session};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// 1 = admin, 2 = supervisor, 3 = table operator
    pub role_tier: i32,
    /// Assigned table, for operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesa_numero: Option<i32>,
    /// Issued at (unix timestamp)
    pub iat: usize,
    /// Expiration (unix timestamp)
    pub exp: usize,
}

/// Validate a JWT token and return claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("Invalid token: {}", e))?;

    Ok(token_data.claims)
}

/// Build the caller's session from a NATS request. A valid token is required.
pub fn extract_session<T>(request: &Request<T>, jwt_secret: &str) -> Result<Session> {
    let token = request
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("No authentication provided: JWT token is required"))?;
    let claims = validate_token(token, jwt_secret)?;
    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|e| anyhow!("Invalid user_id in token: {}", e))?;
    Ok(Session::new(user_id, claims.role_tier, claims.mesa_numero))
}

/// Issue a token the way the auth service does.
#[cfg(test)]
pub fn generate_token(
    user_id: Uuid,
    role_tier: i32,
    mesa_numero: Option<i32>,
    secret: &str,
) -> Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role_tier,
        mesa_numero,
        iat: now,
        exp: now + 12 * 60 * 60, // election day shift
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

// =============================================================================
// Tests
// =============================================================================
