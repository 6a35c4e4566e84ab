use serde::{Deserialize, Serialize};

use super::repo_types::{Task, TaskChanges, TaskStatus};
use crate::{auth::repo_types::PublicUser, error::ApiError, validation::FieldErrors};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        FieldErrors::new()
            .length("title", &self.title, 1, TITLE_MAX)
            .length("description", &self.description, 1, DESCRIPTION_MAX)
            .finish("Invalid task data")
    }
}

/// Partial task update; at least one field must be present. The owner cannot be changed.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl UpdateTaskRequest {
    pub fn into_changes(self) -> Result<TaskChanges, ApiError> {
        let mut v = FieldErrors::new();
        v.check(
            self.title.is_some() || self.description.is_some() || self.status.is_some(),
            "\"value\" must have at least 1 key",
        );
        if let Some(title) = &self.title {
            v.length("title", title, 1, TITLE_MAX);
        }
        if let Some(description) = &self.description {
            v.length("description", description, 1, DESCRIPTION_MAX);
        }
        v.finish("Invalid task data")?;
        Ok(TaskChanges {
            title: self.title.map(|s| s.trim().to_string()),
            description: self.description.map(|s| s.trim().to_string()),
            status: self.status,
        })
    }
}

/// Query string for task listings. Raw strings so bad values answer with our 400 envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
}

/// A user's tasks split by status, newest first within each group.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTasks {
    pub user: PublicUser,
    pub pending: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
}

impl GroupedTasks {
    pub fn new(user: PublicUser, tasks: Vec<Task>) -> Self {
        let mut grouped = Self {
            user,
            pending: Vec::new(),
            in_progress: Vec::new(),
            completed: Vec::new(),
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => grouped.pending.push(task),
                TaskStatus::InProgress => grouped.in_progress.push(task),
                TaskStatus::Completed => grouped.completed.push(task),
            }
        }
        grouped
    }
}
