//! JWT authentication middleware.
//!
//! Bridges to the opaque identity provider: validates the bearer token and
//! exposes the caller as `AuthUser` in request extensions. Fails closed.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt::{Claims, validate_access_token};

/// Authenticated caller, extracted in handlers via `Extension<AuthUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub.parse().unwrap_or(0),
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Validates the `Authorization: Bearer <token>` header and adds the
/// authenticated user to request extensions.
///
/// Returns 401 if the header is missing, malformed, or the token fails
/// validation (signature, expiry, token type).
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing authorization header".to_string(),
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized {
            message: "Invalid authorization header format. Expected: Bearer <token>".to_string(),
        })?;

    let claims = validate_access_token(token, &state.jwt_config.secret)?;

    let auth_user = AuthUser::from(claims);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt::TokenType;

    #[test]
    fn auth_user_from_claims() {
        let claims = Claims {
            sub: "123".to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            token_type: TokenType::Access,
            iat: 0,
            exp: 9999999999,
        };

        let auth_user = AuthUser::from(claims);
        assert_eq!(auth_user.user_id, 123);
        assert_eq!(auth_user.email, "test@example.com");
        assert_eq!(auth_user.role, "user");
    }

    #[test]
    fn auth_user_from_claims_invalid_id() {
        let claims = Claims {
            sub: "invalid".to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            token_type: TokenType::Access,
            iat: 0,
            exp: 9999999999,
        };

        // Falls back to 0 on parse error
        assert_eq!(AuthUser::from(claims).user_id, 0);
    }
}
