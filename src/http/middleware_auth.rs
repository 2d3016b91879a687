//! Bearer token authentication.
//!
//! Tokens are read from `Authorization: Bearer <token>` or, failing that, from the
//! `Authorization` cookie set by the browser login flows. Every extractor goes through
//! [`authenticate_request`] with a different [`BearerRequirement`].

use axum::extract::{FromRef, FromRequestParts};
use http::header;
use http::request::Parts;

use crate::auth::{BearerRequirement, TokenClaims};
use crate::errors::TokenError;
use crate::http::context::AppState;
use crate::http::utils_http::{AUTHORIZATION_COOKIE, get_cookie};

/// Pull the raw bearer token out of a request, if one was sent
pub fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        // Split only on the first space; the scheme is case-insensitive
        return match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
                Some(token.trim().to_string())
            }
            _ => None,
        };
    }

    get_cookie(&parts.headers, AUTHORIZATION_COOKIE).map(|value| {
        value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or(value)
    })
}

/// Authenticate a request against a requirement
pub fn authenticate_request(
    state: &AppState,
    parts: &Parts,
    requirement: &BearerRequirement,
) -> Result<Option<TokenClaims>, TokenError> {
    let token = bearer_token(parts).filter(|token| !token.is_empty());
    state
        .token_validator
        .authenticate(token.as_deref(), requirement)
        .inspect_err(|e| {
            tracing::debug!(error = %e, path = %parts.uri.path(), "bearer authentication failed")
        })
}

fn required(
    state: &AppState,
    parts: &Parts,
    requirement: BearerRequirement,
) -> Result<TokenClaims, TokenError> {
    authenticate_request(state, parts, &requirement)?.ok_or(TokenError::MissingToken)
}

/// Any valid token carrying the `identify` scope, for any application
#[derive(Clone, Debug)]
pub struct Identified(pub TokenClaims);

/// A token issued to AbandonAuth itself carrying the `abandonauth` scope
#[derive(Clone, Debug)]
pub struct AbandonAuthUser(pub TokenClaims);

/// A valid token if one was sent
#[derive(Clone, Debug)]
pub struct MaybeIdentified(pub Option<TokenClaims>);

impl<S> FromRequestParts<S> for Identified
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        required(&app_state, parts, BearerRequirement::identify()).map(Identified)
    }
}

impl<S> FromRequestParts<S> for AbandonAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let requirement = BearerRequirement::abandonauth(&app_state.config.internal_application_id);
        required(&app_state, parts, requirement).map(AbandonAuthUser)
    }
}

impl<S> FromRequestParts<S> for MaybeIdentified
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        authenticate_request(&app_state, parts, &BearerRequirement::optional()).map(MaybeIdentified)
    }
}
