//! Handles `/create_test_user` and `/login_test_user` - password test users, debug builds only

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::context::AppState;
use super::utils_http::bearer_cookie;
use crate::errors::Result;

#[derive(Deserialize)]
pub struct CreateTestUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTestUserResponse {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct LoginTestUserRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginTestUserResponse {
    pub access_token: String,
}

pub async fn create_test_user_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateTestUserRequest>,
) -> Result<Json<CreateTestUserResponse>> {
    let user = state
        .password_logins
        .create_user(&request.username, &request.password)
        .await?;
    Ok(Json(CreateTestUserResponse { user_id: user.id }))
}

/// Log a test user in and set the `Authorization` cookie
pub async fn login_test_user_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginTestUserRequest>,
) -> Result<Response> {
    let access_token = state
        .password_logins
        .login(&request.user_id, &request.password)
        .await?;

    let cookie = bearer_cookie(&access_token);
    let mut response = Json(LoginTestUserResponse { access_token }).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}
