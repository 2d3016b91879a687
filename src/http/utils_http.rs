//! Error responses and small request helpers shared by the handlers.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde_json::json;

use crate::errors::{
    ApiError, ApplicationError, GuardError, HttpError, IdentityError, StorageError, TokenError,
};

/// Name of the cookie (and header) carrying a bearer token
pub const AUTHORIZATION_COOKIE: &str = "Authorization";

/// Header carrying a short-lived exchange token on `POST /login`
pub const EXCHANGE_TOKEN_HEADER: &str = "exchange-token";

/// Create a standard JSON error response
pub fn error_response(status: StatusCode, error: &str, error_description: &str) -> Response {
    let body = json!({
        "error": error,
        "error_description": error_description
    });

    (status, Json(body)).into_response()
}

fn internal_error(error: &dyn std::error::Error) -> Response {
    tracing::error!(error = %error, "internal server error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "server_error",
        "Internal server error",
    )
}

/// Look up a cookie value in the request headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value for a bearer token cookie
pub fn bearer_cookie(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax",
        AUTHORIZATION_COOKIE, token
    ))
    .ok()
}

/// Add `code=<token>` to the query of a redirect target, ahead of any fragment
pub fn with_code(callback_uri: &str, code: &str) -> String {
    let (base, fragment) = match callback_uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (callback_uri, None),
    };
    let separator = match base.find('?') {
        None => "?",
        Some(i) if i + 1 == base.len() || base.ends_with('&') => "",
        Some(_) => "&",
    };
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .finish();

    match fragment {
        Some(fragment) => format!("{base}{separator}{query}#{fragment}"),
        None => format!("{base}{separator}{query}"),
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HttpError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            HttpError::UnknownProvider(_) | HttpError::InvalidProvider(_) => {
                StatusCode::NOT_FOUND
            }
        };
        error_response(status, "invalid_request", &self.to_string())
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            TokenError::InvalidFormat(_) => (StatusCode::FORBIDDEN, "invalid_token"),
            TokenError::Expired => (StatusCode::BAD_REQUEST, "expired_token"),
            TokenError::InsufficientScope(_) => (StatusCode::FORBIDDEN, "insufficient_scope"),
            TokenError::Revoked => (StatusCode::FORBIDDEN, "revoked_token"),
            TokenError::MissingToken => (StatusCode::FORBIDDEN, "invalid_request"),
            TokenError::EncodingFailed(_) => return internal_error(&self),
        };
        error_response(status, error, &self.to_string())
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        match self {
            ApplicationError::NotFound => {
                error_response(StatusCode::NOT_FOUND, "not_found", &self.to_string())
            }
            ApplicationError::Forbidden => {
                error_response(StatusCode::FORBIDDEN, "access_denied", &self.to_string())
            }
            ApplicationError::Token(e) => e.into_response(),
            ApplicationError::Storage(_) | ApplicationError::Hash(_) => internal_error(&self),
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::NotFound(_) => error_response(
                StatusCode::NOT_FOUND,
                "not_found",
                "Invalid application ID",
            ),
            GuardError::Forbidden => {
                error_response(StatusCode::FORBIDDEN, "access_denied", &self.to_string())
            }
            GuardError::InvalidState(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_request", &self.to_string())
            }
            GuardError::Storage(_) => internal_error(&self),
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        match self {
            IdentityError::UpstreamFailure(_) => {
                tracing::warn!(error = %self, "provider login failed");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "upstream_failure",
                    &self.to_string(),
                )
            }
            IdentityError::InvalidCredentials => {
                error_response(StatusCode::FORBIDDEN, "access_denied", &self.to_string())
            }
            IdentityError::UserNotFound => {
                error_response(StatusCode::NOT_FOUND, "not_found", &self.to_string())
            }
            IdentityError::Token(e) => e.into_response(),
            IdentityError::Storage(_) | IdentityError::Hash(_) => internal_error(&self),
        }
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        internal_error(&self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Http(e) => e.into_response(),
            ApiError::Token(e) => e.into_response(),
            ApiError::Application(e) => e.into_response(),
            ApiError::Guard(e) => e.into_response(),
            ApiError::Identity(e) => e.into_response(),
            ApiError::Storage(e) => e.into_response(),
        }
    }
}
