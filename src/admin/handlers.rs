use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{extractors::AdminUser, repo_types::PublicUser, services::find_user},
    error::ApiResult,
    response::ApiResponse,
    state::AppState,
    tasks::{repo_types::TaskFilter, GroupedTasks},
    validation::parse_id,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:user_id/tasks", get(user_tasks_grouped))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<ApiResponse<Vec<PublicUser>>> {
    let users: Vec<PublicUser> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    info!(count = users.len(), "listed users");
    Ok(ApiResponse::ok(users, "All users retrieved successfully"))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn user_tasks_grouped(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<GroupedTasks>> {
    let id = parse_id(&user_id, "userId")?;
    let user = find_user(state.users.as_ref(), id).await?;
    let tasks = state
        .tasks
        .list(TaskFilter {
            user_id: Some(id),
            status: None,
        })
        .await?;
    Ok(ApiResponse::ok(
        GroupedTasks::new(user, tasks),
        "User tasks grouped successfully",
    ))
}
