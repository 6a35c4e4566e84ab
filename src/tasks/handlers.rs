use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateTaskRequest, TaskQuery, UpdateTaskRequest},
    repo_types::{NewTask, Task, TaskFilter},
    services::{listing_filter, load_owned, parse_status},
};
use crate::{
    auth::{dto::Empty, extractors::AuthUser},
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/", get(list_tasks).post(create_task))
        .route("/tasks/user-tasks", get(user_tasks))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Task>> {
    let Json(req) = payload?;
    req.validate()?;
    let task = state
        .tasks
        .create(NewTask {
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            status: req.status.unwrap_or_default(),
            user_id: user.id,
        })
        .await?;
    info!(task_id = %task.id, "task created");
    Ok(ApiResponse::created(task, "Task created successfully"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Task>>> {
    let Query(query) = query?;
    let filter = listing_filter(&user, &query)?;
    let tasks = state.tasks.list(filter).await?;
    Ok(ApiResponse::ok(tasks, "Tasks retrieved successfully"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn user_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Task>>> {
    let Query(query) = query?;
    let filter = TaskFilter {
        user_id: Some(user.id),
        status: parse_status(query.status.as_deref())?,
    };
    let tasks = state.tasks.list(filter).await?;
    Ok(ApiResponse::ok(tasks, "Tasks retrieved successfully"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Task>> {
    let task = load_owned(state.tasks.as_ref(), &user, &id).await?;
    Ok(ApiResponse::ok(task, "Task retrieved successfully"))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Task>> {
    let task = load_owned(state.tasks.as_ref(), &user, &id).await?;
    let Json(req) = payload?;
    let changes = req.into_changes()?;
    let updated = state
        .tasks
        .update(task.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    info!(task_id = %updated.id, "task updated");
    Ok(ApiResponse::ok(updated, "Task updated successfully"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Empty>> {
    let task = load_owned(state.tasks.as_ref(), &user, &id).await?;
    if !state.tasks.delete(task.id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    info!(task_id = %task.id, "task deleted");
    Ok(ApiResponse::ok(Empty {}, "Task deleted"))
}
