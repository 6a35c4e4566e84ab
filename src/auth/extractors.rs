use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{cookies, policy, repo_types::PublicUser, services};
use crate::{error::ApiError, state::AppState};

/// The authenticated caller. Adding this extractor to a handler is what makes a route private.
pub struct AuthUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookies::access_token(&parts.headers);
        let identity =
            services::authenticate(&state.keys, state.users.as_ref(), token.as_deref()).await?;
        Ok(AuthUser(identity))
    }
}

/// An authenticated caller with the admin flag set; others get 403.
pub struct AdminUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        policy::require_admin(&identity)?;
        Ok(AdminUser(identity))
    }
}
