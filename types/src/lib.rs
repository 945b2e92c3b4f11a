//! Core domain types for the staff directory.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the HTTP
//! collaborators produce these values, the engine folds them into snapshots, and
//! the CLI renders them.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod credentials;
mod directory;
mod ids;
mod login;

pub use credentials::{CredentialError, Credentials, check_email, check_password};
pub use directory::{AssetHandle, AssetState, DirectoryState, EnrichedRecord, Record};
pub use ids::RecordId;
pub use login::LoginState;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Auth Token
// ============================================================================

#[derive(Debug, Error)]
#[error("token must not be empty")]
pub struct EmptyTokenError;

/// Session token returned by a successful login. Never blank.
///
/// Note: `Debug` is manually implemented to redact the token value, preventing
/// accidental credential disclosure in logs or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyTokenError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyTokenError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken(<redacted>)")
    }
}

// ============================================================================
// Fetch Errors
// ============================================================================

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Server answered with a non-success status.
    Http { status: u16 },
    /// Connection, DNS, TLS or timeout failure.
    Transport,
    /// Response body was not in the expected shape.
    Parse,
    /// Image bytes could not be decoded.
    Decode,
    /// Response body exceeded the configured limit.
    TooLarge,
}

/// A remote call failure, already converted to a human-readable message.
///
/// Collaborators produce these at their boundary so that callers only ever
/// branch on `Ok`/`Err` and never see transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Http { status }, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transport, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Parse, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Decode, message)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, when the failure came from a non-success response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FetchErrorKind::Http { status } => Some(status),
            _ => None,
        }
    }
}
