use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookies,
        dto::{Credentials, Empty, RefreshRequest, SessionResponse, UpdateProfileRequest},
        extractors::AuthUser,
        repo_types::PublicUser,
        services,
    },
    error::ApiResult,
    response::ApiResponse,
    state::AppState,
    validation::parse_id,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-access-token", post(refresh_access_token))
        .route("/users", get(get_logged_in_user))
        .route("/users/", get(get_logged_in_user))
        .route("/users/user/:id", get(get_user))
        .route("/users/update-info", put(update_info))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let Json(creds) = payload?;
    let user = services::register(state.users.as_ref(), creds).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(creds) = payload?;
    let (user, tokens) = services::login(&state.keys, state.users.as_ref(), creds).await?;
    let headers = cookies::session_cookies(&state.keys, &tokens, state.config.cookie_secure);
    let body = SessionResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    };
    Ok((headers, ApiResponse::ok(body, "User logged in successfully")))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    services::logout(state.users.as_ref(), user.id).await?;
    let headers = cookies::cleared_cookies(state.config.cookie_secure);
    Ok((headers, ApiResponse::ok(Empty {}, "User logged Out")))
}

/// Takes the refresh token from the cookie, or from `{ "refreshToken": ... }` in the body.
#[instrument(skip_all)]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let presented = cookies::read_cookie(&headers, cookies::REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token));
    let (user, tokens) =
        services::refresh(&state.keys, state.users.as_ref(), presented.as_deref()).await?;
    let headers = cookies::session_cookies(&state.keys, &tokens, state.config.cookie_secure);
    let body = SessionResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    };
    Ok((headers, ApiResponse::ok(body, "Access token refreshed")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_logged_in_user(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user, "User retrieved successfully")
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let id = parse_id(&id, "user id")?;
    let user = services::find_user(state.users.as_ref(), id).await?;
    Ok(ApiResponse::ok(user, "User retrieved successfully"))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let Json(req) = payload?;
    let updated = services::update_profile(state.users.as_ref(), user.id, req).await?;
    Ok(ApiResponse::ok(updated, "User information updated successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::testing::client;

    #[tokio::test]
    async fn register_then_login_sets_both_cookies() {
        let (app, _) = client();
        let body = json!({ "email": "a@x.com", "password": "secret1" });

        let res = app
            .send(Method::POST, "/api/v1/users/register", None, Some(body.clone()))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["statusCode"], 201);
        assert_eq!(res.body["data"]["email"], "a@x.com");
        assert!(res.body["data"].get("passwordHash").is_none());
        assert!(res.body["data"].get("refreshToken").is_none());

        let res = app.send(Method::POST, "/api/v1/users/login", None, Some(body)).await;
        assert_eq!(res.status, StatusCode::OK);
        let cookies = res.set_cookies();
        assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
        assert!(res.body["data"]["accessToken"].is_string());

        let res = app
            .send(
                Method::POST,
                "/api/v1/users/login",
                None,
                Some(json!({ "email": "a@x.com", "password": "wrong1" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["success"], false);
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_envelope() {
        let (app, _) = client();
        let res = app
            .send(Method::POST, "/api/v1/users/register", None, Some(json!({ "email": 5 })))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["success"], false);
        assert!(res.body["errors"].is_array());

        let res = app
            .send(
                Method::POST,
                "/api/v1/users/register",
                None,
                Some(json!({ "email": "", "password": "" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Email & password fields are required");
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let (app, _) = client();
        let res = app.send(Method::GET, "/api/v1/users/", None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["message"], "Unauthorized request");

        let (id, access, _) = app.signup("a@x.com", "secret1").await;
        let res = app.send(Method::GET, "/api/v1/users", Some(&access), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["id"], id.to_string());
        assert_eq!(res.body["data"]["isAdmin"], false);
    }

    #[tokio::test]
    async fn access_cookie_authenticates() {
        let (app, _) = client();
        let (_, access, _) = app.signup("a@x.com", "secret1").await;
        let cookie = format!("accessToken={access}");
        let res = app
            .send_with(Method::GET, "/api/v1/users/", None, Some(&cookie), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_via_cookie_and_body() {
        let (app, users) = client();
        let (id, _, refresh) = app.signup("a@x.com", "secret1").await;

        let cookie = format!("refreshToken={refresh}");
        let res = app
            .send_with(Method::POST, "/api/v1/users/refresh-access-token", None, Some(&cookie), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
        let rotated = res.body["data"]["refreshToken"].as_str().unwrap().to_string();
        let access = res.body["data"]["accessToken"].as_str().unwrap().to_string();
        assert_eq!(users.stored_refresh_token(id), Some(rotated.clone()));
        assert_eq!(res.set_cookies().len(), 2);

        let res = app.send(Method::GET, "/api/v1/users/", Some(&access), None).await;
        assert_eq!(res.status, StatusCode::OK);

        // The old token has been burned.
        let res = app
            .send(
                Method::POST,
                "/api/v1/users/refresh-access-token",
                None,
                Some(json!({ "refreshToken": refresh })),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["message"], "Refresh token is expired or used");

        let res = app
            .send(
                Method::POST,
                "/api/v1/users/refresh-access-token",
                None,
                Some(json!({ "refreshToken": rotated })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let res = app
            .send(Method::POST, "/api/v1/users/refresh-access-token", None, None)
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookies_and_refresh_token() {
        let (app, users) = client();
        let (id, access, refresh) = app.signup("a@x.com", "secret1").await;

        let res = app.send(Method::POST, "/api/v1/users/logout", None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let res = app.send(Method::POST, "/api/v1/users/logout", Some(&access), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.set_cookies().iter().all(|c| c.contains("Max-Age=0")));
        assert_eq!(users.stored_refresh_token(id), None);

        let res = app
            .send(
                Method::POST,
                "/api/v1/users/refresh-access-token",
                None,
                Some(json!({ "refreshToken": refresh })),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_user_by_id() {
        let (app, _) = client();
        let (id, access, _) = app.signup("a@x.com", "secret1").await;

        let res = app
            .send(Method::GET, &format!("/api/v1/users/user/{id}"), Some(&access), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["email"], "a@x.com");

        let res = app
            .send(Method::GET, "/api/v1/users/user/not-a-uuid", Some(&access), None)
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = app
            .send(
                Method::GET,
                &format!("/api/v1/users/user/{}", uuid::Uuid::new_v4()),
                Some(&access),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_info_changes_only_given_fields() {
        let (app, _) = client();
        let (_, access, _) = app.signup("a@x.com", "secret1").await;
        app.signup("b@x.com", "secret1").await;

        let res = app
            .send(
                Method::PUT,
                "/api/v1/users/update-info",
                Some(&access),
                Some(json!({ "firstName": "Alice", "phoneNumber": "0123456789" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["firstName"], "Alice");
        assert_eq!(res.body["data"]["phone"], "0123456789");
        assert_eq!(res.body["data"]["email"], "a@x.com");

        let res = app
            .send(
                Method::PUT,
                "/api/v1/users/update-info",
                Some(&access),
                Some(json!({ "email": "b@x.com" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = app
            .send(Method::PUT, "/api/v1/users/update-info", Some(&access), Some(json!({})))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Content can not be empty");

        let res = app
            .send(
                Method::PUT,
                "/api/v1/users/update-info",
                Some(&access),
                Some(json!({ "password": "newpass1" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        let res = app
            .send(
                Method::POST,
                "/api/v1/users/login",
                None,
                Some(json!({ "email": "a@x.com", "password": "newpass1" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
}
