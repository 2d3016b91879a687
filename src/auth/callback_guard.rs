//! Allow-list check for redirect targets, and the OAuth `state` that carries them.

use std::fmt;
use std::sync::Arc;

use crate::errors::GuardError;
use crate::storage::traits::IdentityStorage;

/// The application and redirect target carried through a provider round trip as
/// `"<application_id>,<callback_uri>"`.
///
/// The provider hands `state` back untouched, so a parsed value is only a claim and must be
/// re-checked with [`CallbackUriGuard::verify`] before it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackState {
    pub application_id: String,
    pub callback_uri: String,
}

impl CallbackState {
    pub fn new(application_id: impl Into<String>, callback_uri: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            callback_uri: callback_uri.into(),
        }
    }

    pub fn parse(state: Option<&str>) -> Result<Self, GuardError> {
        let state = state.filter(|s| !s.is_empty()).ok_or_else(|| {
            GuardError::InvalidState(
                "application_id and callback_uri are required in query param 'state'".to_string(),
            )
        })?;

        // Application ids never contain a comma; callback URIs may
        match state.split_once(',') {
            Some((application_id, callback_uri))
                if !application_id.is_empty() && !callback_uri.is_empty() =>
            {
                Ok(Self::new(application_id, callback_uri))
            }
            _ => Err(GuardError::InvalidState(
                "expected '<application_id>,<callback_uri>'".to_string(),
            )),
        }
    }
}

impl fmt::Display for CallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.application_id, self.callback_uri)
    }
}

pub struct CallbackUriGuard {
    storage: Arc<dyn IdentityStorage>,
}

impl CallbackUriGuard {
    pub fn new(storage: Arc<dyn IdentityStorage>) -> Self {
        Self { storage }
    }

    /// Accept `callback_uri` only if it is registered, byte for byte, on the application
    pub async fn verify(&self, application_id: &str, callback_uri: &str) -> Result<(), GuardError> {
        if self.storage.get_application(application_id).await?.is_none() {
            tracing::warn!(%application_id, "callback check for unknown application");
            return Err(GuardError::NotFound(application_id.to_string()));
        }

        let registered = self.storage.list_callback_uris(application_id).await?;
        if registered.iter().any(|callback| callback.uri == callback_uri) {
            Ok(())
        } else {
            tracing::warn!(%application_id, %callback_uri, "rejected unregistered callback uri");
            Err(GuardError::Forbidden)
        }
    }

    /// Verify both halves of a parsed state
    pub async fn verify_state(&self, state: &CallbackState) -> Result<(), GuardError> {
        self.verify(&state.application_id, &state.callback_uri).await
    }
}
