//! JWT validation for the opaque identity provider.
//!
//! dialflow never issues credentials; it validates bearer tokens minted by
//! the identity service and extracts the caller's id, email and role.
//! Generation exists for tests and operational tooling.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by identity-provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// Validates an access token and returns its claims.
///
/// Fails closed: expiry, signature and token-type mismatches all map to
/// `Unauthorized`.
pub fn validate_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::Unauthorized {
        message: format!("Invalid token: {}", e),
    })?;

    if data.claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized {
            message: "Expected an access token".to_string(),
        });
    }
    Ok(data.claims)
}

/// Generates an access token. Mirrors what the identity provider issues;
/// used by tests and local tooling.
pub fn generate_access_token(
    user_id: i32,
    email: String,
    role: String,
    secret: &str,
    expiration_hours: i64,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email,
        role,
        token_type: TokenType::Access,
        iat: now,
        exp: now + expiration_hours * 3600,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal {
        source: anyhow::anyhow!("Token encoding failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_at_least_32_characters_long";

    #[test]
    fn roundtrip_validates() {
        let token =
            generate_access_token(42, "a@b.co".to_string(), "user".to_string(), SECRET, 1).unwrap();
        let claims = validate_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@b.co");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            generate_access_token(42, "a@b.co".to_string(), "user".to_string(), SECRET, 1).unwrap();
        let err = validate_access_token(&token, "another_secret_also_32_characters!!").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            generate_access_token(42, "a@b.co".to_string(), "user".to_string(), SECRET, -1)
                .unwrap();
        let err = validate_access_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }
}
