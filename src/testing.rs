//! In-memory stores and request helpers shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, ProfileChanges, User},
    },
    db::{StoreError, StoreResult},
    state::AppState,
    tasks::{
        repo::TaskStore,
        repo_types::{NewTask, Task, TaskChanges, TaskFilter},
    },
};

/// A client over the full router plus a handle on its user rows.
pub fn client() -> (TestClient, std::sync::Arc<MemoryUserStore>) {
    let (state, users) = AppState::fake_with_users();
    (TestClient::new(crate::app::build_app(state)), users)
}

// Creation order stands in for created_at so "newest first" is stable inside one clock tick.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn set_admin(&self, id: Uuid, is_admin: bool) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(u) = rows.iter_mut().find(|u| u.id == id) {
            u.is_admin = is_admin;
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.rows.lock().unwrap().retain(|u| u.id != id);
    }

    pub fn stored_refresh_token(&self, id: Uuid) -> Option<String> {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|u| u.id == id).and_then(|u| u.refresh_token.clone())
    }

    pub fn stored_password_hash(&self, id: Uuid) -> Option<String> {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|u| u.id == id).map(|u| u.password_hash.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            is_admin: false,
            refresh_token: None,
            first_name: None,
            last_name: None,
            phone: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.rows.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        Ok(match rows.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.refresh_token = token.map(str::to_string);
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }

    async fn rotate_refresh_token(&self, id: Uuid, current: &str, next: &str) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        Ok(match rows.iter_mut().find(|u| u.id == id) {
            Some(u) if u.refresh_token.as_deref() == Some(current) => {
                u.refresh_token = Some(next.to_string());
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            _ => false,
        })
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(email) = &changes.email {
            if rows.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(u) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.email {
            u.email = v;
        }
        if let Some(v) = changes.password_hash {
            u.password_hash = v;
        }
        if let Some(v) = changes.first_name {
            u.first_name = Some(v);
        }
        if let Some(v) = changes.last_name {
            u.last_name = Some(v);
        }
        if let Some(v) = changes.phone {
            u.phone = Some(v);
        }
        u.updated_at = OffsetDateTime::now_utc();
        Ok(Some(u.clone()))
    }
}

#[derive(Default)]
pub struct MemoryTaskStore {
    rows: Mutex<Vec<Task>>,
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, new: NewTask) -> StoreResult<Task> {
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            status: new.status,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|t| filter.user_id.map_or(true, |u| t.user_id == u))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(t) = rows.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            t.title = v;
        }
        if let Some(v) = changes.description {
            t.description = v;
        }
        if let Some(v) = changes.status {
            t.status = v;
        }
        t.updated_at = OffsetDateTime::now_utc();
        Ok(Some(t.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.id != id);
        Ok(rows.len() != before)
    }
}

/// Response pieces a test usually asserts on.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }
}

pub struct TestClient {
    app: Router,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send_with(method, uri, token, None, body).await
    }

    pub async fn send_with(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers and logs in; returns (user id, access token, refresh token).
    pub async fn signup(&self, email: &str, password: &str) -> (Uuid, String, String) {
        let body = serde_json::json!({ "email": email, "password": password });
        let res = self
            .send(Method::POST, "/api/v1/users/register", None, Some(body.clone()))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);

        let res = self.send(Method::POST, "/api/v1/users/login", None, Some(body)).await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        let data = &res.body["data"];
        let id = data["user"]["id"].as_str().unwrap().parse().unwrap();
        (
            id,
            data["accessToken"].as_str().unwrap().to_string(),
            data["refreshToken"].as_str().unwrap().to_string(),
        )
    }
}
