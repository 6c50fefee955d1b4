use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::domain::user::{Role, UserId};
use crate::http::AppError;
use crate::AppState;

/// A signed-in, non-banned user resolved from `Authorization: Bearer <token>`.
/// Use `Option<AuthUser>` on routes that also serve guests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let service = AuthService::new(state.store.clone());
        let session = service
            .authenticate(token)
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        Ok(AuthUser {
            user_id: session.user_id,
            role: session.role,
            token: token.to_string(),
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::forbidden("admin access required"));
        }
        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}
