//! Handles `/`, `/me`, `/login`, `/burn-token` and `/user/applications`

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};

use super::context::AppState;
use super::middleware_auth::{AbandonAuthUser, Identified};
use super::utils_http::EXCHANGE_TOKEN_HEADER;
use crate::auth::exchange_token;
use crate::errors::{HttpError, IdentityError, Result, TokenError};
use crate::storage::traits::DeveloperApplication;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserBody {
    pub id: String,
    pub username: String,
}

/// Developer application credentials
#[derive(Deserialize)]
pub struct ApplicationCredentials {
    pub id: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: String,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<DeveloperApplication> for ApplicationSummary {
    fn from(application: DeveloperApplication) -> Self {
        Self {
            id: application.id,
            owner_id: application.owner_id,
            name: application.name,
        }
    }
}

/// Parse a JSON body that may be left out entirely
pub(crate) fn optional_json<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| HttpError::InvalidBody(e.to_string()).into())
}

pub async fn handle_index() -> impl IntoResponse {
    Redirect::to("/ui")
}

/// The user identified by the token
pub async fn handle_me(
    State(state): State<AppState>,
    Identified(claims): Identified,
) -> Result<Json<UserBody>> {
    let user = state
        .storage
        .get_user(&claims.user_id)
        .await?
        .ok_or(IdentityError::UserNotFound)?;

    Ok(Json(UserBody {
        id: user.id,
        username: user.username,
    }))
}

/// Exchange a short-lived token for a long-lived one.
///
/// When developer application credentials are sent, the exchange token must have been
/// issued for that application.
pub async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TokenBody>> {
    let token = headers
        .get(EXCHANGE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(TokenError::MissingToken)?;

    let audience = match optional_json::<ApplicationCredentials>(&body)? {
        Some(credentials) => Some(
            state
                .developer_applications
                .authenticate(&credentials.id, &credentials.refresh_token)
                .await?
                .id,
        ),
        None => None,
    };

    let token = exchange_token(
        &state.token_validator,
        &state.token_issuer,
        token,
        audience.as_deref(),
    )?;
    Ok(Json(TokenBody { token }))
}

/// Burn an exchange token. Succeeds whether or not the token was live.
pub async fn handle_burn_token(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> StatusCode {
    state.token_validator.burn(&body.token);
    StatusCode::OK
}

pub async fn handle_user_applications(
    State(state): State<AppState>,
    AbandonAuthUser(claims): AbandonAuthUser,
) -> Result<Json<Vec<ApplicationSummary>>> {
    let applications = state
        .developer_applications
        .list_for_owner(&claims.user_id)
        .await?;
    Ok(Json(
        applications
            .into_iter()
            .map(ApplicationSummary::from)
            .collect(),
    ))
}
