//! Bearer-token access gate
//!
//! Whether the gate verifies tokens is decided once at startup. A disabled
//! gate admits every request under the placeholder identity.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AuthSection;

pub mod firebase;

pub use firebase::FirebaseVerifier;

/// Identity reported when the gate is disabled
pub const PLACEHOLDER_USER: &str = "DEV_USER";

/// Caller identity for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Gate disabled; no credential was checked
    Placeholder,
    /// Subject of a verified token
    Subject(String),
}

impl Identity {
    pub fn as_str(&self) -> &str {
        match self {
            Identity::Placeholder => PLACEHOLDER_USER,
            Identity::Subject(subject) => subject,
        }
    }
}

/// Why the gate refused a request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization header.")]
    MissingCredential,

    #[error("Invalid authentication scheme.")]
    InvalidScheme,

    #[error("Invalid or expired authentication token.")]
    InvalidCredential,
}

/// Failure reported by an identity provider. Never shown to callers.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

/// External identity provider
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a raw token and return the subject it was issued to
    async fn verify(&self, token: &str) -> Result<String, VerificationError>;
}

/// Gate mode, fixed for the process lifetime
#[derive(Clone)]
pub enum GateMode {
    Enabled(Arc<dyn IdentityVerifier>),
    Disabled,
}

pub struct AccessGate {
    mode: GateMode,
}

impl AccessGate {
    pub fn new(mode: GateMode) -> Self {
        Self { mode }
    }

    /// Resolve the gate mode from configuration.
    ///
    /// A provider that fails to initialise forces the gate off.
    pub fn from_config(config: &AuthSection) -> Self {
        if !config.enabled {
            tracing::warn!("Backend authentication is DISABLED via AUTH_ENABLED=false");
            return Self::new(GateMode::Disabled);
        }

        match FirebaseVerifier::from_config(config) {
            Ok(verifier) => {
                tracing::info!(
                    project_id = verifier.project_id(),
                    "Firebase token verification initialised"
                );
                Self::new(GateMode::Enabled(Arc::new(verifier)))
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "Firebase initialisation error; authentication disabled"
                );
                Self::new(GateMode::Disabled)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, GateMode::Enabled(_))
    }

    /// Authenticate the raw `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let verifier = match &self.mode {
            GateMode::Disabled => return Ok(Identity::Placeholder),
            GateMode::Enabled(verifier) => verifier,
        };

        let header = header.ok_or(AuthError::MissingCredential)?;
        let token = bearer_token(header)?;

        match verifier.verify(token).await {
            Ok(subject) => Ok(Identity::Subject(subject)),
            Err(err) => {
                tracing::debug!(error = %err, "Token verification failed");
                Err(AuthError::InvalidCredential)
            }
        }
    }

    /// Precondition for protected routes.
    ///
    /// Admits any identity `authenticate` produced, the placeholder included.
    pub fn require_auth(&self, _identity: &Identity) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Split `<scheme> <token>`; the scheme must be `bearer` in any case.
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidScheme),
    }
}
