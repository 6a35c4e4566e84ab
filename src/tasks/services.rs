use tracing::warn;

use super::{
    dto::TaskQuery,
    repo::TaskStore,
    repo_types::{Task, TaskFilter, TaskStatus},
};
use crate::{
    auth::{policy, repo_types::PublicUser},
    error::ApiError,
    validation::parse_id,
};

/// Loads a task by its raw path id and checks the caller owns it.
pub async fn load_owned(
    tasks: &dyn TaskStore,
    caller: &PublicUser,
    raw_id: &str,
) -> Result<Task, ApiError> {
    let id = parse_id(raw_id, "task id")?;
    let task = tasks
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    if let Err(e) = policy::require_owner(caller, task.user_id) {
        warn!(user_id = %caller.id, task_id = %task.id, "task ownership mismatch");
        return Err(e);
    }
    Ok(task)
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<TaskStatus>, ApiError> {
    raw.map(|s| {
        s.parse()
            .map_err(|_| ApiError::validation("Invalid status query parameter"))
    })
    .transpose()
}

/// Builds the listing filter. Non-admins are pinned to their own tasks; naming another
/// user is an ownership failure. Admins may filter by any user, or none.
pub fn listing_filter(caller: &PublicUser, query: &TaskQuery) -> Result<TaskFilter, ApiError> {
    let status = parse_status(query.status.as_deref())?;
    let requested = query
        .user_id
        .as_deref()
        .map(|raw| {
            parse_id(raw, "userId").map_err(|_| ApiError::validation("Invalid userId query parameter"))
        })
        .transpose()?;

    let user_id = if policy::is_admin(caller) {
        requested
    } else {
        if let Some(other) = requested {
            policy::require_owner(caller, other)?;
        }
        Some(caller.id)
    };
    Ok(TaskFilter { user_id, status })
}
