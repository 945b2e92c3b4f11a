//! Directory snapshot types and their pure transitions.
//!
//! [`DirectoryState`] is never mutated in place by callers: every transition
//! takes `&self` and returns the next snapshot. The engine publishes those
//! snapshots whole, so a reader can never observe a half-applied update.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FetchError, RecordId};

/// One directory entry as returned by the record listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// URL of the avatar image.
    pub asset_ref: String,
}

impl Record {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A decoded image, RGBA8 row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetHandle {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl AssetHandle {
    /// Returns `None` when `pixels` does not hold exactly `width * height` RGBA8 pixels.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

// Pixel buffers are large; keep them out of logs.
impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Enrichment slot of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetState {
    /// The asset fetch has not completed.
    #[default]
    Pending,
    Loaded(AssetHandle),
    /// The asset fetch failed; the message is shown in place of the image.
    Failed(String),
}

impl AssetState {
    #[must_use]
    pub fn from_result(result: Result<AssetHandle, FetchError>) -> Self {
        match result {
            Ok(handle) => Self::Loaded(handle),
            Err(err) => Self::Failed(err.message),
        }
    }

    #[must_use]
    pub fn asset(&self) -> Option<&AssetHandle> {
        match self {
            Self::Loaded(handle) => Some(handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn asset_error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A record plus its (possibly pending or failed) avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub record: Record,
    pub asset: AssetState,
}

impl EnrichedRecord {
    #[must_use]
    pub fn pending(record: Record) -> Self {
        Self {
            record,
            asset: AssetState::Pending,
        }
    }

    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.record.id
    }
}

/// The directory view state.
///
/// Invariants maintained by the transitions below:
/// - `entries` keeps the listing order once published.
/// - `error_message` is non-empty only after a failed listing.
/// - `is_loading` is only set between a load request and the listing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryState {
    pub entries: Vec<EnrichedRecord>,
    pub is_loading: bool,
    pub error_message: String,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self::initial()
    }
}

impl DirectoryState {
    /// State at construction: nothing listed yet, loading.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            entries: Vec::new(),
            is_loading: true,
            error_message: String::new(),
        }
    }

    /// A load was requested. Entries from a previous cycle stay visible.
    #[must_use]
    pub fn loading(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            is_loading: true,
            error_message: String::new(),
        }
    }

    /// The listing failed. No partial directory is shown.
    #[must_use]
    pub fn list_failed(message: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            is_loading: false,
            error_message: message.into(),
        }
    }

    /// The listing succeeded; every entry starts with a pending asset.
    ///
    /// Ids are unique within a snapshot: a repeated id keeps its first record.
    #[must_use]
    pub fn list_loaded(records: Vec<Record>) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        Self {
            entries: records
                .into_iter()
                .filter(|record| seen.insert(record.id))
                .map(EnrichedRecord::pending)
                .collect(),
            is_loading: false,
            error_message: String::new(),
        }
    }

    /// Merge-by-identity: replace the asset of the entry whose id is `id`.
    ///
    /// Every other entry and every top-level field is carried over unchanged.
    /// Returns `None` when no entry has that id, which is how results from a
    /// superseded listing get dropped. Applying twice for the same id keeps
    /// the last value.
    #[must_use]
    pub fn with_asset(&self, id: RecordId, asset: AssetState) -> Option<Self> {
        let index = self.entries.iter().position(|entry| entry.id() == id)?;
        let mut entries = self.entries.clone();
        entries[index].asset = asset;
        Some(Self {
            entries,
            is_loading: self.is_loading,
            error_message: self.error_message.clone(),
        })
    }

    #[must_use]
    pub fn entry(&self, id: RecordId) -> Option<&EnrichedRecord> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Terminal "listing succeeded with zero records" state.
    ///
    /// Distinct from [`DirectoryState::initial`], which is also empty but loading.
    #[must_use]
    pub fn is_empty_directory(&self) -> bool {
        self.entries.is_empty() && !self.is_loading && !self.has_error()
    }

    #[must_use]
    pub fn pending_assets(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.asset.is_pending())
            .count()
    }

    /// No listing in flight and no asset left to arrive.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_loading && self.pending_assets() == 0
    }
}
