//! Third-party OAuth providers used to establish a user's identity.
//!
//! Each provider runs a standard authorization code flow: the browser is sent to
//! [`OAuthProvider::authorize_url`], the provider redirects back with a code, the code is
//! exchanged for an access token, and the access token is used to fetch the profile.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{IdentityError, UnknownProviderError};

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Discord,
    Github,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Discord,
        ProviderKind::Github,
        ProviderKind::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "discord",
            ProviderKind::Github => "github",
            ProviderKind::Google => "google",
        }
    }

    /// Prefix of the `<PREFIX>_CLIENT_ID` / `<PREFIX>_CLIENT_SECRET` environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "DISCORD",
            ProviderKind::Github => "GITHUB",
            ProviderKind::Google => "GOOGLE",
        }
    }

    /// Path of the route the provider redirects back to
    pub fn callback_path(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "/ui/discord-callback",
            ProviderKind::Github => "/ui/github-callback",
            ProviderKind::Google => "/ui/google-callback",
        }
    }

    fn authorize_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "https://discord.com/oauth2/authorize",
            ProviderKind::Github => "https://github.com/login/oauth/authorize",
            ProviderKind::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    fn token_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "https://discord.com/api/v10/oauth2/token",
            ProviderKind::Github => "https://github.com/login/oauth/access_token",
            ProviderKind::Google => "https://oauth2.googleapis.com/token",
        }
    }

    fn profile_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Discord => "https://discord.com/api/v10/users/@me",
            ProviderKind::Github => "https://api.github.com/user",
            ProviderKind::Google => "https://openidconnect.googleapis.com/v1/userinfo",
        }
    }

    fn requested_scope(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Discord => Some("identify"),
            ProviderKind::Github => None,
            ProviderKind::Google => Some("openid profile"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discord" => Ok(ProviderKind::Discord),
            "github" => Ok(ProviderKind::Github),
            "google" => Ok(ProviderKind::Google),
            other => Err(UnknownProviderError(other.to_string())),
        }
    }
}

/// The parts of a provider profile AbandonAuth keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Stable account id at the provider
    pub external_id: String,
    pub display_name: String,
}

/// An OAuth identity provider
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// URL the browser is sent to, carrying `state` through the round trip
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a provider access token
    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError>;

    /// Fetch the profile of the account owning `access_token`
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError>;
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// reqwest-backed provider client
pub struct OAuthProviderClient {
    kind: ProviderKind,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http_client: reqwest::Client,
}

impl OAuthProviderClient {
    pub fn new(
        kind: ProviderKind,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            kind,
            client_id,
            client_secret,
            redirect_uri,
            http_client,
        }
    }
}

#[async_trait]
impl OAuthProvider for OAuthProviderClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn authorize_url(&self, state: &str) -> String {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("state", state),
        ];
        if let Some(scope) = self.kind.requested_scope() {
            params.push(("scope", scope));
        }

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        format!("{}?{}", self.kind.authorize_endpoint(), query)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(self.kind.token_endpoint())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                IdentityError::UpstreamFailure(format!("{} token request failed: {}", self.kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.kind, %status, %body, "token exchange rejected");
            return Err(IdentityError::UpstreamFailure(format!(
                "{} token endpoint returned {}",
                self.kind, status
            )));
        }

        let token: AccessTokenResponse = response.json().await.map_err(|e| {
            IdentityError::UpstreamFailure(format!("{} token response invalid: {}", self.kind, e))
        })?;

        match token {
            AccessTokenResponse {
                access_token: Some(access_token),
                ..
            } => Ok(access_token),
            AccessTokenResponse {
                error,
                error_description,
                ..
            } => Err(IdentityError::UpstreamFailure(format!(
                "{} did not return an access token: {}",
                self.kind,
                error_description
                    .or(error)
                    .unwrap_or_else(|| "no error given".to_string())
            ))),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError> {
        let response = self
            .http_client
            .get(self.kind.profile_endpoint())
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                IdentityError::UpstreamFailure(format!(
                    "{} profile request failed: {}",
                    self.kind, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::UpstreamFailure(format!(
                "{} profile endpoint returned {}",
                self.kind, status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            IdentityError::UpstreamFailure(format!("{} profile invalid: {}", self.kind, e))
        })?;
        parse_profile(self.kind, &body)
    }
}

/// Pull the account id and display name out of a provider's profile document
pub fn parse_profile(kind: ProviderKind, body: &Value) -> Result<ProviderProfile, IdentityError> {
    let (id_field, name_field) = match kind {
        ProviderKind::Discord => ("id", "username"),
        ProviderKind::Github => ("id", "login"),
        ProviderKind::Google => ("sub", "name"),
    };

    // GitHub ids are numbers, the others are strings
    let external_id = match body.get(id_field) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(IdentityError::UpstreamFailure(format!(
                "{} profile is missing '{}'",
                kind, id_field
            )));
        }
    };
    let display_name = body
        .get(name_field)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            IdentityError::UpstreamFailure(format!("{} profile is missing '{}'", kind, name_field))
        })?;

    Ok(ProviderProfile {
        external_id,
        display_name,
    })
}

/// Enabled providers, keyed by kind
pub type ProviderRegistry = HashMap<ProviderKind, Arc<dyn OAuthProvider>>;

/// Build a client for every provider that has credentials configured
pub fn build_provider_registry(config: &Config, http_client: &reqwest::Client) -> ProviderRegistry {
    let mut registry: ProviderRegistry = HashMap::new();
    for kind in ProviderKind::ALL {
        let Some(credentials) = config.provider_credentials(kind) else {
            tracing::info!(provider = %kind, "provider disabled, no credentials configured");
            continue;
        };
        registry.insert(
            kind,
            Arc::new(OAuthProviderClient::new(
                kind,
                credentials.client_id.clone(),
                credentials.client_secret.clone(),
                config.provider_callback_uri(kind),
                http_client.clone(),
            )),
        );
    }
    registry
}
