//! Handles `/ui` - browser login flows through the OAuth providers

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use super::context::AppState;
use super::middleware_auth::MaybeIdentified;
use super::utils_http::{bearer_cookie, with_code};
use crate::auth::{CallbackState, ProviderKind, exchange_token};
use crate::errors::{HttpError, Result, TokenError};

#[derive(Debug, Deserialize)]
pub struct UiQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub application_id: Option<String>,
    pub callback_uri: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderLink {
    pub provider: ProviderKind,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginOptions {
    pub providers: Vec<ProviderLink>,
}

fn internal_login_url(state: &AppState) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("application_id", &state.config.internal_application_id)
        .append_pair("callback_uri", &state.config.ui_callback_uri())
        .finish();
    format!("/ui/login?{}", query)
}

/// Landing page for AbandonAuth's own login.
///
/// With `code`, the exchange token is traded for a long-lived token for AbandonAuth itself,
/// which is stored in the `Authorization` cookie.
pub async fn handle_ui(
    State(state): State<AppState>,
    Query(query): Query<UiQuery>,
    session: std::result::Result<MaybeIdentified, TokenError>,
) -> Response {
    if let Some(code) = query.code {
        return match exchange_token(
            &state.token_validator,
            &state.token_issuer,
            &code,
            Some(&state.config.internal_application_id),
        ) {
            Ok(token) => {
                let mut response = Redirect::to(&state.config.site_url).into_response();
                if let Some(cookie) = bearer_cookie(&token) {
                    response.headers_mut().insert(header::SET_COOKIE, cookie);
                }
                response
            }
            Err(e) => {
                tracing::info!(error = %e, "ui login code rejected");
                Redirect::to(&internal_login_url(&state)).into_response()
            }
        };
    }

    match session {
        Ok(MaybeIdentified(Some(_))) => Redirect::to(&state.config.site_url).into_response(),
        _ => Redirect::to(&internal_login_url(&state)).into_response(),
    }
}

/// Start a login for an application.
///
/// The callback is checked here so users get immediate feedback; the provider callback
/// checks it again. Without `provider` the available provider links are listed.
pub async fn handle_login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let (Some(application_id), Some(callback_uri)) = (query.application_id, query.callback_uri)
    else {
        return Err(HttpError::MissingParameter(
            "Both application_id and callback_uri are required".to_string(),
        )
        .into());
    };

    state
        .callback_guard
        .verify(&application_id, &callback_uri)
        .await?;
    let callback_state = CallbackState::new(application_id, callback_uri).to_string();

    if let Some(provider) = query.provider {
        let kind = provider.parse::<ProviderKind>().map_err(HttpError::from)?;
        let provider = state.provider(kind)?;
        return Ok(Redirect::to(&provider.authorize_url(&callback_state)).into_response());
    }

    let mut providers: Vec<ProviderLink> = state
        .providers
        .values()
        .map(|provider| ProviderLink {
            provider: provider.kind(),
            url: provider.authorize_url(&callback_state),
        })
        .collect();
    providers.sort_by_key(|link| link.provider);
    Ok(Json(LoginOptions { providers }).into_response())
}

/// Finish a provider login and send the user back to the application with an exchange token.
///
/// `state` comes back from the provider and could have been altered by the user, so the
/// callback URI is verified again before anything is issued.
async fn complete_provider_login(
    state: AppState,
    kind: ProviderKind,
    query: CallbackQuery,
) -> Result<Redirect> {
    let callback_state = CallbackState::parse(query.state.as_deref())?;
    state.callback_guard.verify_state(&callback_state).await?;

    let Some(code) = query.code else {
        return Ok(Redirect::to(&callback_state.callback_uri));
    };

    let provider = state.provider(kind)?;
    let login = state
        .identity_bridge
        .login(provider.as_ref(), &code, &callback_state.application_id)
        .await?;

    tracing::info!(
        provider = %kind,
        user_id = %login.user.id,
        application_id = %callback_state.application_id,
        "provider login completed"
    );
    Ok(Redirect::to(&with_code(
        &callback_state.callback_uri,
        &login.exchange_token,
    )))
}

pub async fn handle_discord_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    complete_provider_login(state, ProviderKind::Discord, query).await
}

pub async fn handle_github_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    complete_provider_login(state, ProviderKind::Github, query).await
}

pub async fn handle_google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    complete_provider_login(state, ProviderKind::Google, query).await
}
