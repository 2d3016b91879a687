//! Environment-based configuration types for AbandonAuth server runtime settings.

use anyhow::Result;
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::providers::ProviderKind;
use crate::errors::ConfigError;

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// HTTP client timeout configuration
#[derive(Clone)]
pub struct HttpClientTimeout(Duration);

/// HMAC secret used to sign every issued token
#[derive(Clone)]
pub struct JwtSecret(String);

/// Refresh token of the internal developer application, seeded at startup
#[derive(Clone)]
pub struct InternalApplicationToken(String);

/// Signing algorithm for issued tokens
#[derive(Clone)]
pub struct JwtAlgorithm(Algorithm);

/// Lifetime of long-lived session tokens
#[derive(Clone)]
pub struct LongLivedTokenExpiration(chrono::Duration);

/// Lifetime of short-lived exchange tokens
#[derive(Clone)]
pub struct ShortLivedTokenExpiration(chrono::Duration);

/// bcrypt work factor for refresh tokens and passwords
#[derive(Clone)]
pub struct BcryptCost(u32);

/// Whether debug-only routes (password test users) are mounted
#[derive(Clone)]
pub struct DebugRoutes(bool);

/// Client credentials for one OAuth provider
#[derive(Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub external_base: String,
    pub site_url: String,
    pub user_agent: String,
    pub http_client_timeout: HttpClientTimeout,
    pub jwt_secret: JwtSecret,
    pub jwt_algorithm: JwtAlgorithm,
    pub long_lived_token_expiration: LongLivedTokenExpiration,
    pub short_lived_token_expiration: ShortLivedTokenExpiration,
    pub internal_application_id: String,
    pub internal_application_token: InternalApplicationToken,
    pub bcrypt_cost: BcryptCost,
    pub debug_routes: DebugRoutes,
    pub storage_backend: String,
    pub discord: Option<ProviderCredentials>,
    pub github: Option<ProviderCredentials>,
    pub google: Option<ProviderCredentials>,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            lookup(name).ok_or_else(|| ConfigError::EnvVarRequired(name.to_string()).into())
        };
        let default = |name: &str, default_value: &str| -> String {
            lookup(name).unwrap_or_else(|| default_value.to_string())
        };

        let version = version()?;
        let default_user_agent = format!("abandonauth/{}", version);

        let http_port: HttpPort = default("HTTP_PORT", "8080").try_into()?;
        let external_base = require("EXTERNAL_BASE")?.trim_end_matches('/').to_string();
        let site_url = lookup("ABANDON_AUTH_SITE_URL")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| external_base.clone());
        let user_agent = default("USER_AGENT", &default_user_agent);
        let http_client_timeout: HttpClientTimeout =
            default("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let jwt_secret: JwtSecret = require("JWT_SECRET")?.try_into()?;
        let jwt_algorithm: JwtAlgorithm = default("JWT_HASHING_ALGO", "HS256").try_into()?;
        let long_lived_token_expiration: LongLivedTokenExpiration =
            default("JWT_EXPIRES_IN", "7d").try_into()?;
        let short_lived_token_expiration: ShortLivedTokenExpiration =
            default("JWT_SHORT_EXPIRES_IN", "2m").try_into()?;
        let internal_application_id = require("ABANDON_AUTH_DEVELOPER_APP_ID")?;
        if internal_application_id.is_empty() {
            return Err(ConfigError::EmptyValue("ABANDON_AUTH_DEVELOPER_APP_ID".to_string()).into());
        }
        let internal_application_token: InternalApplicationToken =
            require("ABANDON_AUTH_DEVELOPER_APP_TOKEN")?.try_into()?;
        let bcrypt_cost: BcryptCost = default("BCRYPT_COST", "12").try_into()?;
        let debug_routes: DebugRoutes = default("DEBUG", "false").try_into()?;
        let storage_backend = default("STORAGE_BACKEND", "memory");

        let provider = |kind: ProviderKind| -> Option<ProviderCredentials> {
            let prefix = kind.env_prefix();
            let client_id = lookup(&format!("{prefix}_CLIENT_ID")).filter(|v| !v.is_empty())?;
            let client_secret =
                lookup(&format!("{prefix}_CLIENT_SECRET")).filter(|v| !v.is_empty())?;
            Some(ProviderCredentials {
                client_id,
                client_secret,
            })
        };

        Ok(Self {
            version,
            http_port,
            external_base,
            site_url,
            user_agent,
            http_client_timeout,
            jwt_secret,
            jwt_algorithm,
            long_lived_token_expiration,
            short_lived_token_expiration,
            internal_application_id,
            internal_application_token,
            bcrypt_cost,
            debug_routes,
            storage_backend,
            discord: provider(ProviderKind::Discord),
            github: provider(ProviderKind::Github),
            google: provider(ProviderKind::Google),
        })
    }

    /// Credentials for the given provider, if it is enabled
    pub fn provider_credentials(&self, kind: ProviderKind) -> Option<&ProviderCredentials> {
        match kind {
            ProviderKind::Discord => self.discord.as_ref(),
            ProviderKind::Github => self.github.as_ref(),
            ProviderKind::Google => self.google.as_ref(),
        }
    }

    /// The callback URI of the built-in management UI
    pub fn ui_callback_uri(&self) -> String {
        format!("{}/ui", self.external_base)
    }

    /// The redirect URI registered with a provider for its callback route
    pub fn provider_callback_uri(&self, kind: ProviderKind) -> String {
        format!("{}{}", self.external_base, kind.callback_path())
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn parse_duration(value: String) -> Result<chrono::Duration> {
    let duration = duration_str::parse(&value)
        .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
    Ok(chrono::Duration::from_std(duration)?)
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for JwtSecret {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ConfigError::EmptyValue("JWT_SECRET".to_string()).into());
        }
        Ok(Self(value))
    }
}

impl AsRef<[u8]> for JwtSecret {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for InternalApplicationToken {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(
                ConfigError::EmptyValue("ABANDON_AUTH_DEVELOPER_APP_TOKEN".to_string()).into(),
            );
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for InternalApplicationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JwtAlgorithm {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Algorithm::from_str(value.trim()) {
            Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => {
                Ok(Self(algorithm))
            }
            _ => Err(ConfigError::UnsupportedAlgorithm(value).into()),
        }
    }
}

impl AsRef<Algorithm> for JwtAlgorithm {
    fn as_ref(&self) -> &Algorithm {
        &self.0
    }
}

impl TryFrom<String> for LongLivedTokenExpiration {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_duration(value).map(Self)
    }
}

impl AsRef<chrono::Duration> for LongLivedTokenExpiration {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for ShortLivedTokenExpiration {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_duration(value).map(Self)
    }
}

impl AsRef<chrono::Duration> for ShortLivedTokenExpiration {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for BcryptCost {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().parse::<u32>() {
            Ok(cost) if (4..=31).contains(&cost) => Ok(Self(cost)),
            _ => Err(ConfigError::InvalidBcryptCost(value).into()),
        }
    }
}

impl AsRef<u32> for BcryptCost {
    fn as_ref(&self) -> &u32 {
        &self.0
    }
}

impl TryFrom<String> for DebugRoutes {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for DebugRoutes {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}
