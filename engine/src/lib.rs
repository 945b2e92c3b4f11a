//! Core engine for the staff directory: state containers and view-models.
//!
//! This crate contains the presentation state machines without any rendering
//! dependencies. Views subscribe to immutable snapshots and call operations;
//! all network access goes through the capability traits in
//! `staffdir-providers`.

mod directory;
mod login;
mod state;

pub use directory::{DirectoryViewModel, LoadRequest};
pub use login::{LoginAttempt, LoginViewModel};
pub use state::{StateContainer, Subscription};

// Re-export from crates for public API
pub use staffdir_providers::{AssetSource, LoginService, RecordSource};
pub use staffdir_types::{
    AssetHandle, AssetState, AuthToken, DirectoryState, EnrichedRecord, FetchError,
    FetchErrorKind, LoginState, Record, RecordId,
};
