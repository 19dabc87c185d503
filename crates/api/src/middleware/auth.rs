//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use runforge_core::error::CoreError;
use runforge_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token.
///
/// The token normally arrives in the `Authorization` header. `EventSource`
/// clients cannot set headers, so a `?token=` query parameter is accepted as
/// a fallback when the header is absent.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get("authorization").and_then(|v| v.to_str().ok());

        let token = match header {
            Some(value) => value.strip_prefix("Bearer ").ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                ))
            })?,
            None => token_from_query(parts.uri.query().unwrap_or("")).ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header or token parameter".into(),
                ))
            })?,
        };

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Pull a `token=` value out of a raw query string. JWTs only contain
/// URL-safe characters, so no percent-decoding is needed.
fn token_from_query(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| pair.strip_prefix("token="))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_found_anywhere_in_the_query() {
        assert_eq!(token_from_query("token=abc"), Some("abc"));
        assert_eq!(token_from_query("a=1&token=abc&b=2"), Some("abc"));
        assert_eq!(token_from_query("a=1&b=2"), None);
        assert_eq!(token_from_query(""), None);
    }

    #[test]
    fn lookalike_keys_do_not_match() {
        assert_eq!(token_from_query("xtoken=abc"), None);
        assert_eq!(token_from_query("token_extra=abc"), None);
    }
}
