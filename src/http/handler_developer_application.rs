//! Handles `/developer_application` - registration and management of developer applications

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::context::AppState;
use super::handler_index::{ApplicationCredentials, ApplicationSummary, TokenBody, optional_json};
use super::middleware_auth::{AbandonAuthUser, Identified};
use super::utils_http::error_response;
use crate::auth::IssuedCredentials;
use crate::errors::{ApplicationError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// An application and its refresh token; the only response that ever carries the plaintext
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationCredentialsResponse {
    pub id: String,
    pub owner_id: String,
    pub token: String,
}

impl From<IssuedCredentials> for ApplicationCredentialsResponse {
    fn from(issued: IssuedCredentials) -> Self {
        Self {
            id: issued.application.id,
            owner_id: issued.application.owner_id,
            token: issued.refresh_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub callback_uris: Vec<String>,
}

pub async fn create_application_handler(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
    body: Bytes,
) -> Result<Json<ApplicationCredentialsResponse>> {
    let request = optional_json::<CreateApplicationRequest>(&body)?.unwrap_or_default();
    let issued = state
        .developer_applications
        .create(&claims.user_id, request.name)
        .await?;
    Ok(Json(issued.into()))
}

/// Trade application credentials for a short-lived token, 401 on bad credentials
pub async fn login_application_handler(
    State(state): State<AppState>,
    Json(credentials): Json<ApplicationCredentials>,
) -> std::result::Result<Json<TokenBody>, Response> {
    match state
        .developer_applications
        .login(&credentials.id, &credentials.refresh_token)
        .await
    {
        Ok(token) => Ok(Json(TokenBody { token })),
        Err(ApplicationError::Forbidden) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_client",
            "Invalid application id or refresh token",
        )),
        Err(e) => Err(e.into_response()),
    }
}

/// The application named by a developer application token
pub async fn current_application_handler(
    State(state): State<AppState>,
    Identified(claims): Identified,
) -> Result<Json<ApplicationSummary>> {
    let application = state.developer_applications.find(&claims.user_id).await?;
    Ok(Json(application.into()))
}

pub async fn get_application_handler(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationDetail>> {
    let found = state
        .developer_applications
        .get(&application_id, &claims.user_id)
        .await?;
    Ok(Json(ApplicationDetail {
        id: found.application.id,
        owner_id: found.application.owner_id,
        name: found.application.name,
        callback_uris: found.callback_uris,
    }))
}

pub async fn delete_application_handler(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationSummary>> {
    let deleted = state
        .developer_applications
        .delete(&application_id, &claims.user_id)
        .await?;
    Ok(Json(deleted.into()))
}

pub async fn reset_token_handler(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationCredentialsResponse>> {
    let rotated = state
        .developer_applications
        .rotate(&application_id, &claims.user_id)
        .await?;
    Ok(Json(rotated.into()))
}

/// Replace the application's callback URIs with the given list
pub async fn update_callback_uris_handler(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
    Path(application_id): Path<String>,
    Json(callback_uris): Json<Vec<String>>,
) -> Result<Json<ApplicationSummary>> {
    let application = state
        .developer_applications
        .update_callback_uris(&application_id, &claims.user_id, &callback_uris)
        .await?;
    Ok(Json(application.into()))
}
