use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::StoreResult,
    tasks::repo_types::{NewTask, Task, TaskChanges, TaskFilter, TaskRow},
};

const TASK_COLUMNS: &str = "id, title, description, status, user_id, created_at, updated_at";

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, new: NewTask) -> StoreResult<Task>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;
    /// Matching tasks, newest first.
    async fn list(&self, filter: TaskFilter) -> StoreResult<Vec<Task>>;
    async fn update(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

fn into_tasks(rows: Vec<TaskRow>) -> StoreResult<Vec<Task>> {
    Ok(rows
        .into_iter()
        .map(Task::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?)
}

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, new: NewTask) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, title, description, status, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(new.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(Task::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn list(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
              FROM tasks
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;
        into_tasks(rows)
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
               SET title       = COALESCE($2, title),
                   description = COALESCE($3, description),
                   status      = COALESCE($4, status),
                   updated_at  = now()
             WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
