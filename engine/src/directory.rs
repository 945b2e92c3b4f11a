//! Directory view-model: list loading and per-record asset enrichment.
//!
//! A load cycle fetches the base listing once, publishes it with every asset
//! pending, then runs one enrichment task per record. Each task merges its
//! result into whatever snapshot is current when it completes, so completion
//! order never matters.
//!
//! Cycles are identified by a generation number and own a cancellation token.
//! Every publication checks the generation under the cycle lock, which makes
//! results from a superseded or torn-down cycle unobservable.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use staffdir_providers::{AssetSource, RecordSource};
use staffdir_types::{AssetHandle, AssetState, DirectoryState, FetchError, Record, RecordId};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::state::{StateContainer, Subscription};

/// What a call to [`DirectoryViewModel::load_directory`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    /// A new cycle was started.
    Started { generation: u64 },
    /// A cycle is still waiting on its listing; that cycle stands.
    Coalesced,
    /// The view-model was torn down; nothing happens.
    ShutDown,
}

/// Result of applying one enrichment completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    Applied,
    /// The cycle was superseded or no entry carried the id.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    FetchingList,
    Enriching,
}

#[derive(Debug)]
struct Cycle {
    generation: u64,
    phase: Phase,
    cancel: CancellationToken,
    shut_down: bool,
}

impl Cycle {
    fn is_current(&self, generation: u64) -> bool {
        !self.shut_down && self.generation == generation
    }
}

struct Shared<R, A> {
    records: R,
    assets: A,
    state: StateContainer<DirectoryState>,
    cycle: Mutex<Cycle>,
    asset_permits: Option<Arc<Semaphore>>,
}

impl<R, A> Shared<R, A> {
    fn lock_cycle(&self) -> MutexGuard<'_, Cycle> {
        // Cycle bookkeeping stays consistent across a panicking holder.
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the listing outcome. Returns the records to enrich, or `None`
    /// when the cycle is over.
    fn apply_listing(
        &self,
        generation: u64,
        outcome: Result<Vec<Record>, FetchError>,
    ) -> Option<Vec<(RecordId, String)>> {
        let mut cycle = self.lock_cycle();
        if !cycle.is_current(generation) {
            tracing::debug!(generation, "Discarding listing from superseded cycle");
            return None;
        }

        match outcome {
            Err(err) => {
                tracing::warn!(generation, error = %err, "Directory listing failed");
                cycle.phase = Phase::Idle;
                self.state.replace(DirectoryState::list_failed(err.message));
                None
            }
            Ok(records) => {
                let listed = DirectoryState::list_loaded(records);
                tracing::info!(
                    generation,
                    count = listed.entries.len(),
                    "Directory listing loaded"
                );
                let work: Vec<(RecordId, String)> = listed
                    .entries
                    .iter()
                    .map(|entry| (entry.id(), entry.record.asset_ref.clone()))
                    .collect();
                cycle.phase = if work.is_empty() {
                    Phase::Idle
                } else {
                    Phase::Enriching
                };
                self.state.replace(listed);
                Some(work)
            }
        }
    }

    /// Merge one asset outcome into the current snapshot.
    fn apply_asset(
        &self,
        generation: u64,
        id: RecordId,
        result: Result<AssetHandle, FetchError>,
    ) -> MergeOutcome {
        let cycle = self.lock_cycle();
        if !cycle.is_current(generation) {
            tracing::debug!(generation, %id, "Discarding asset from superseded cycle");
            return MergeOutcome::Stale;
        }

        match &result {
            Ok(handle) => tracing::debug!(
                %id,
                width = handle.width(),
                height = handle.height(),
                "Asset loaded"
            ),
            Err(err) => tracing::debug!(%id, error = %err, "Asset failed"),
        }
        let asset = AssetState::from_result(result);
        if self.state.update(|current| current.with_asset(id, asset)) {
            MergeOutcome::Applied
        } else {
            tracing::debug!(generation, %id, "No entry for asset result");
            MergeOutcome::Stale
        }
    }

    fn finish_enrichment(&self, generation: u64, applied: usize) {
        let mut cycle = self.lock_cycle();
        if cycle.is_current(generation) && cycle.phase == Phase::Enriching {
            cycle.phase = Phase::Idle;
            tracing::info!(generation, applied, "Directory enrichment finished");
        }
    }
}

/// Owns the directory state and the load cycles that feed it.
///
/// Dropping the view-model tears it down: in-flight work is cancelled and no
/// further snapshot is published.
pub struct DirectoryViewModel<R, A> {
    shared: Arc<Shared<R, A>>,
}

impl<R, A> std::fmt::Debug for DirectoryViewModel<R, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryViewModel")
            .field("bounded_assets", &self.shared.asset_permits.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: RecordSource, A: AssetSource> DirectoryViewModel<R, A> {
    /// Asset fetches run unbounded.
    pub fn new(records: R, assets: A) -> Self {
        Self::with_asset_limit(records, assets, None)
    }

    /// At most `limit` asset fetches in flight at once when set.
    pub fn with_asset_limit(records: R, assets: A, limit: Option<NonZeroUsize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                records,
                assets,
                state: StateContainer::new(DirectoryState::initial()),
                cycle: Mutex::new(Cycle {
                    generation: 0,
                    phase: Phase::Idle,
                    cancel: CancellationToken::new(),
                    shut_down: false,
                }),
                asset_permits: limit.map(|n| Arc::new(Semaphore::new(n.get()))),
            }),
        }
    }

    /// Start a load cycle.
    ///
    /// While a cycle is still waiting on its listing the call is coalesced
    /// into it. Otherwise any running enrichment is cancelled and a new cycle
    /// begins; entries from the previous cycle stay visible until the new
    /// listing lands.
    ///
    /// Must be called within a tokio runtime.
    pub fn load_directory(&self) -> LoadRequest {
        let (generation, cancel) = {
            let mut cycle = self.shared.lock_cycle();
            if cycle.shut_down {
                return LoadRequest::ShutDown;
            }
            if cycle.phase == Phase::FetchingList {
                tracing::debug!(generation = cycle.generation, "Coalescing load request");
                return LoadRequest::Coalesced;
            }

            cycle.cancel.cancel();
            cycle.cancel = CancellationToken::new();
            cycle.generation += 1;
            cycle.phase = Phase::FetchingList;
            self.shared.state.update(|current| {
                let next = current.loading();
                (next != *current).then_some(next)
            });
            (cycle.generation, cycle.cancel.clone())
        };

        tracing::info!(generation, "Directory load started");
        tokio::spawn(run_cycle(Arc::clone(&self.shared), generation, cancel));
        LoadRequest::Started { generation }
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription<DirectoryState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<DirectoryState> {
        self.shared.state.snapshot()
    }

    /// Cancel in-flight work and refuse further loads. Idempotent.
    pub fn shutdown(&self) {
        let mut cycle = self.shared.lock_cycle();
        if cycle.shut_down {
            return;
        }
        cycle.shut_down = true;
        cycle.phase = Phase::Idle;
        cycle.cancel.cancel();
        tracing::debug!(generation = cycle.generation, "Directory view-model shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_cycle().shut_down
    }

    #[cfg(test)]
    pub(crate) fn merge_asset(
        &self,
        generation: u64,
        id: RecordId,
        result: Result<AssetHandle, FetchError>,
    ) -> MergeOutcome {
        self.shared.apply_asset(generation, id, result)
    }
}

impl<R, A> Drop for DirectoryViewModel<R, A> {
    fn drop(&mut self) {
        let mut cycle = self.shared.lock_cycle();
        cycle.shut_down = true;
        cycle.cancel.cancel();
    }
}

async fn run_cycle<R: RecordSource, A: AssetSource>(
    shared: Arc<Shared<R, A>>,
    generation: u64,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        () = cancel.cancelled() => {
            tracing::debug!(generation, "Cycle cancelled before listing resolved");
            return;
        }
        outcome = shared.records.fetch_records() => outcome,
    };

    let Some(work) = shared.apply_listing(generation, outcome) else {
        return;
    };
    if work.is_empty() {
        return;
    }

    // Spawned only after the base listing is published.
    let mut tasks = JoinSet::new();
    for (id, asset_ref) in work {
        tasks.spawn(enrich(
            Arc::clone(&shared),
            generation,
            cancel.clone(),
            id,
            asset_ref,
        ));
    }

    let mut applied = 0;
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(
                    generation,
                    pending = tasks.len(),
                    "Cycle cancelled during enrichment"
                );
                tasks.abort_all();
                return;
            }
            joined = tasks.join_next() => match joined {
                Some(Ok(MergeOutcome::Applied)) => applied += 1,
                Some(Ok(MergeOutcome::Stale)) => {}
                Some(Err(err)) => {
                    tracing::error!(generation, error = %err, "Enrichment task failed");
                }
                None => break,
            },
        }
    }
    shared.finish_enrichment(generation, applied);
}

async fn enrich<R: RecordSource, A: AssetSource>(
    shared: Arc<Shared<R, A>>,
    generation: u64,
    cancel: CancellationToken,
    id: RecordId,
    asset_ref: String,
) -> MergeOutcome {
    let _permit = match &shared.asset_permits {
        Some(permits) => tokio::select! {
            () = cancel.cancelled() => return MergeOutcome::Stale,
            permit = Arc::clone(permits).acquire_owned() => permit.ok(),
        },
        None => None,
    };

    let result = tokio::select! {
        () = cancel.cancelled() => return MergeOutcome::Stale,
        result = shared.assets.fetch_asset(&asset_ref) => result,
    };
    shared.apply_asset(generation, id, result)
}
