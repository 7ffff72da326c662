//! Authorization middleware: Bearer token extraction, JWT verification,
//! live user lookup and optional role enforcement.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use folio_core::auth::jwt::AccessClaims;
use folio_core::models::{User, UserType};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The caller, as loaded from the store for this request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: AccessClaims,
}

/// Middleware state: the app state plus the role a route group requires.
#[derive(Clone)]
pub struct AuthGuard {
    state: AppState,
    required: Option<UserType>,
}

impl AuthGuard {
    /// Any active, authenticated user.
    pub fn any(state: AppState) -> Self {
        Self {
            state,
            required: None,
        }
    }

    /// Only users of the given type.
    pub fn requiring(state: AppState, role: UserType) -> Self {
        Self {
            state,
            required: Some(role),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware guarding a route group.
///
/// Any authentication failure is a bare 401. A store failure surfaces as a
/// server error rather than being mistaken for "not authenticated".
pub async fn authorize(
    State(guard): State<AuthGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(request.headers()) else {
        debug!("missing or malformed authorization header");
        return Err(AppError::Unauthorized);
    };

    let claims = guard
        .state
        .tokens
        .validate_and_get_claims(token)
        .ok_or(AppError::Unauthorized)?;

    let Some(user_id) = claims.user_id() else {
        debug!("token carries no usable user id");
        return Err(AppError::Unauthorized);
    };

    let user = match guard.state.store.find_user(user_id).await? {
        Some(user) if user.is_active() => user,
        Some(_) => {
            debug!(user_id, "inactive user presented a token");
            return Err(AppError::Unauthorized);
        }
        None => {
            debug!(user_id, "token subject not found");
            return Err(AppError::Unauthorized);
        }
    };

    if let Some(required) = guard.required {
        if user.user_type != required {
            debug!(user_id, role = %user.user_type, %required, "role not permitted");
            return Err(AppError::Forbidden);
        }
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, claims });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
