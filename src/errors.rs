//! Standardized error types following the `error-abandonauth-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-abandonauth-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when HTTP_PORT cannot be parsed
    #[error("error-abandonauth-config-2 Parsing HTTP_PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-abandonauth-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-abandonauth-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-abandonauth-config-5 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when the token signing algorithm is unknown or not an HMAC algorithm
    #[error("error-abandonauth-config-6 Unsupported JWT hashing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Error when the bcrypt cost is out of range
    #[error("error-abandonauth-config-7 Invalid BCRYPT_COST '{0}': expected an integer between 4 and 31")]
    InvalidBcryptCost(String),

    /// Error when a value that must not be empty is empty
    #[error("error-abandonauth-config-8 {0} must not be empty")]
    EmptyValue(String),
}

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Error when a provider name does not parse
    #[error(transparent)]
    InvalidProvider(#[from] UnknownProviderError),

    /// Error when a request body cannot be parsed
    #[error("error-abandonauth-http-2 Invalid request body: {0}")]
    InvalidBody(String),

    /// Error when an OAuth provider is not configured
    #[error("error-abandonauth-http-4 Unknown or disabled provider: {0}")]
    UnknownProvider(String),

    /// Error when a required query parameter is absent
    #[error("error-abandonauth-http-5 Missing query parameter: {0}")]
    MissingParameter(String),
}

/// Bearer token errors raised by the codec, issuer, and validator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed token, bad signature, or audience mismatch
    #[error("error-abandonauth-token-1 Invalid token format: {0}")]
    InvalidFormat(String),

    /// The token's `exp` claim is in the past
    #[error("error-abandonauth-token-2 Token has expired")]
    Expired,

    /// The token does not carry the scope required by the operation
    #[error("error-abandonauth-token-3 Insufficient scope: {0} required")]
    InsufficientScope(String),

    /// A short-lived token that is no longer present in the exchange-token cache
    #[error("error-abandonauth-token-4 Token has been revoked")]
    Revoked,

    /// No bearer token was supplied where one is required
    #[error("error-abandonauth-token-5 Missing bearer token")]
    MissingToken,

    /// Signing the claim set failed
    #[error("error-abandonauth-token-6 Token encoding failed: {0}")]
    EncodingFailed(String),
}

/// Credential hashing errors
#[derive(Debug, Error)]
pub enum HashError {
    /// The hashing primitive rejected the input
    #[error("error-abandonauth-hash-1 Hashing failed: {0}")]
    HashFailed(String),

    /// The blocking hashing task could not be joined
    #[error("error-abandonauth-hash-2 Hashing task failed: {0}")]
    TaskFailed(String),
}

/// A provider name that is not one of the supported providers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("error-abandonauth-provider-1 Unknown provider: {0}")]
pub struct UnknownProviderError(pub String);

/// Developer application errors
///
/// `NotFound` covers both absent applications and applications owned by another user.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Application absent or not owned by the caller
    #[error("error-abandonauth-application-1 Developer application not found")]
    NotFound,

    /// Application credentials did not verify
    #[error("error-abandonauth-application-2 Invalid application id or refresh token")]
    Forbidden,

    /// Storage failure
    #[error("error-abandonauth-application-3 {0}")]
    Storage(#[from] StorageError),

    /// Hashing failure
    #[error("error-abandonauth-application-4 {0}")]
    Hash(#[from] HashError),

    /// Token issuance failure
    #[error("error-abandonauth-application-5 {0}")]
    Token(#[from] TokenError),
}

/// Callback URI guard errors
#[derive(Debug, Error)]
pub enum GuardError {
    /// No application registered under the claimed id
    #[error("error-abandonauth-guard-1 Developer application not found: {0}")]
    NotFound(String),

    /// The proposed callback URI is not on the application's allow-list
    #[error("error-abandonauth-guard-2 Invalid application ID or callback_uri")]
    Forbidden,

    /// The OAuth state parameter is missing or malformed
    #[error("error-abandonauth-guard-3 Invalid OAuth state: {0}")]
    InvalidState(String),

    /// Storage failure
    #[error("error-abandonauth-guard-4 {0}")]
    Storage(#[from] StorageError),
}

/// Identity federation and password login errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The OAuth provider call failed or returned an unusable response
    #[error("error-abandonauth-identity-1 Upstream provider failure: {0}")]
    UpstreamFailure(String),

    /// Password login failed
    #[error("error-abandonauth-identity-2 Invalid username or password")]
    InvalidCredentials,

    /// The requested user does not exist
    #[error("error-abandonauth-identity-3 User not found")]
    UserNotFound,

    /// Storage failure
    #[error("error-abandonauth-identity-4 {0}")]
    Storage(#[from] StorageError),

    /// Hashing failure
    #[error("error-abandonauth-identity-5 {0}")]
    Hash(#[from] HashError),

    /// Token issuance failure
    #[error("error-abandonauth-identity-6 {0}")]
    Token(#[from] TokenError),
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when a storage lock cannot be acquired
    #[error("error-abandonauth-storage-1 Lock acquisition failed: {0}")]
    LockFailed(String),

    /// Error when data validation fails
    #[error("error-abandonauth-storage-3 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-abandonauth-storage-4 Not found: {0}")]
    NotFound(String),

    /// Error when a uniqueness constraint would be violated
    #[error("error-abandonauth-storage-5 Conflict: {0}")]
    Conflict(String),
}

/// Any error a request handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ApiError>;
