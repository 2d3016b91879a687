//! Token lifecycle, developer application credentials and identity federation.
//!
//! - [`codec`] signs and verifies claim sets
//! - [`issuer`] mints long-lived and short-lived tokens
//! - [`validator`] checks bearer tokens and exchanges short-lived ones
//! - [`developer_application`] manages application refresh tokens and callback URIs
//! - [`callback_guard`] restricts redirects to registered callback URIs
//! - [`identity_bridge`] links provider accounts to local users

pub mod callback_guard;
pub mod claims;
pub mod codec;
pub mod developer_application;
pub mod hash;
pub mod identity_bridge;
pub mod issuer;
pub mod password;
pub mod providers;
pub mod scope;
pub mod validator;

pub use callback_guard::{CallbackState, CallbackUriGuard};
pub use claims::{Lifespan, TokenClaims};
pub use codec::TokenCodec;
pub use developer_application::{
    ApplicationWithCallbacks, DeveloperApplicationService, IssuedCredentials,
};
pub use hash::{BcryptHasher, CredentialHasher, generate_refresh_token};
pub use identity_bridge::{FederatedLogin, IdentityBridge};
pub use issuer::TokenIssuer;
pub use password::PasswordLoginService;
pub use providers::{
    OAuthProvider, OAuthProviderClient, ProviderKind, ProviderProfile, ProviderRegistry,
    build_provider_registry,
};
pub use scope::{Scope, ScopeSet};
pub use validator::{BearerRequirement, TokenValidator, exchange_token};
