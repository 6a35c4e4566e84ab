//! Credential checks and the session token lifecycle: login, refresh rotation, logout,
//! and resolving an access token to an identity.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{Credentials, UpdateProfileRequest},
    jwt::{JwtKeys, TokenPair},
    password,
    repo::UserStore,
    repo_types::{NewUser, ProfileChanges, PublicUser},
};
use crate::error::ApiError;

/// Resolves an access token to the user it names. Stateless: nothing is cached between calls.
pub async fn authenticate(
    keys: &JwtKeys,
    users: &dyn UserStore,
    token: Option<&str>,
) -> Result<PublicUser, ApiError> {
    let Some(token) = token else {
        return Err(ApiError::unauthorized("Unauthorized request"));
    };

    let claims = keys.verify_access(token).map_err(|e| {
        warn!(reason = %e, "access token rejected");
        ApiError::unauthorized("Invalid or expired access token")
    })?;

    match users.find_by_id(claims.sub).await? {
        Some(user) => Ok(user.into()),
        None => {
            warn!(user_id = %claims.sub, "access token for unknown user");
            Err(ApiError::unauthorized("Invalid Access Token"))
        }
    }
}

pub async fn register(users: &dyn UserStore, creds: Credentials) -> Result<PublicUser, ApiError> {
    let creds = creds.normalized()?;
    creds.validate_for_registration()?;

    if users.find_by_email(&creds.email).await?.is_some() {
        warn!(email = %creds.email, "email already registered");
        return Err(ApiError::validation("User with email already exist."));
    }

    let password_hash = password::hash_password_blocking(creds.password).await?;
    let user = users
        .create(NewUser {
            email: creds.email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Issues a fresh pair and stores its refresh token, replacing any previous one.
pub async fn start_session(
    keys: &JwtKeys,
    users: &dyn UserStore,
    user_id: Uuid,
) -> Result<TokenPair, ApiError> {
    let tokens = keys.sign_pair(user_id).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal(e)
    })?;
    if !users
        .set_refresh_token(user_id, Some(&tokens.refresh_token))
        .await?
    {
        return Err(ApiError::unauthorized("User not found"));
    }
    Ok(tokens)
}

pub async fn login(
    keys: &JwtKeys,
    users: &dyn UserStore,
    creds: Credentials,
) -> Result<(PublicUser, TokenPair), ApiError> {
    let creds = creds.normalized()?;

    let Some(user) = users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(ApiError::not_found("User not found"));
    };

    let ok = password::verify_password_blocking(creds.password, user.password_hash.clone())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "stored password hash unreadable");
            ApiError::Internal(e)
        })?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let tokens = start_session(keys, users, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user.into(), tokens))
}

/// Exchanges the current refresh token for a new pair. The presented token must be the
/// one stored on the user; a superseded token is refused even if its signature is valid.
pub async fn refresh(
    keys: &JwtKeys,
    users: &dyn UserStore,
    presented: Option<&str>,
) -> Result<(PublicUser, TokenPair), ApiError> {
    let Some(presented) = presented.filter(|t| !t.is_empty()) else {
        return Err(ApiError::unauthorized("unauthorized request"));
    };

    let claims = keys.verify_refresh(presented).map_err(|e| {
        warn!(reason = %e, "refresh token rejected");
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let Some(user) = users.find_by_id(claims.sub).await? else {
        warn!(user_id = %claims.sub, "refresh token for unknown user");
        return Err(ApiError::unauthorized("Invalid refresh token"));
    };

    if user.refresh_token.as_deref() != Some(presented) {
        warn!(user_id = %user.id, "superseded refresh token presented");
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    let tokens = keys.sign_pair(user.id).map_err(ApiError::Internal)?;
    // A concurrent refresh may have rotated the token since the read above.
    if !users
        .rotate_refresh_token(user.id, presented, &tokens.refresh_token)
        .await?
    {
        warn!(user_id = %user.id, "refresh token rotated concurrently");
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    info!(user_id = %user.id, "access token refreshed");
    Ok((user.into(), tokens))
}

pub async fn logout(users: &dyn UserStore, user_id: Uuid) -> Result<(), ApiError> {
    users.set_refresh_token(user_id, None).await?;
    info!(user_id = %user_id, "user logged out");
    Ok(())
}

pub async fn find_user(users: &dyn UserStore, id: Uuid) -> Result<PublicUser, ApiError> {
    users
        .find_by_id(id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<PublicUser, ApiError> {
    let req = req.normalized()?;

    // Only a supplied password is hashed; the stored digest is never rehashed.
    let password_hash = match req.password {
        Some(plain) => Some(password::hash_password_blocking(plain).await?),
        None => None,
    };
    let changes = ProfileChanges {
        email: req.email,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
    };

    let user = users
        .update_profile(user_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user.into())
}
