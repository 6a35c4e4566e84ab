use uuid::Uuid;

use super::repo_types::PublicUser;
use crate::error::ApiError;

pub fn is_admin(identity: &PublicUser) -> bool {
    identity.is_admin
}

pub fn is_owner(identity: &PublicUser, owner_id: Uuid) -> bool {
    identity.id == owner_id
}

pub fn require_admin(identity: &PublicUser) -> Result<(), ApiError> {
    if is_admin(identity) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Forbidden: Admins only"))
    }
}

/// Ownership failures answer 401, not 403.
pub fn require_owner(identity: &PublicUser, owner_id: Uuid) -> Result<(), ApiError> {
    if is_owner(identity, owner_id) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("You are not allowed to access this resource"))
    }
}
