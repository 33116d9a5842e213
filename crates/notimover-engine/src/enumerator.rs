//! Window list snapshots and id diffing.

use std::{collections::HashSet, sync::Arc};

use tracing::{trace, warn};

use crate::{
    error::ListError,
    ids::WindowKey,
    model::{FilterCriteria, WindowDescriptor},
    platform::WindowSource,
};

/// Result of one read of the window list.
#[derive(Clone, Debug, Default)]
pub struct Enumerated {
    /// Owner-matched windows passing the coarse size filter, plus raised
    /// overlays of other owners.
    pub candidates: Vec<WindowDescriptor>,
    /// Candidate keys that belong to a non-notification owner.
    pub foreign: HashSet<WindowKey>,
    /// Every window of a notification owner, before size filtering.
    pub surface: Vec<WindowDescriptor>,
}

/// Id-set difference between two consecutive snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    /// Keys present now but not before.
    pub detected: Vec<WindowKey>,
    /// Keys present before but not now.
    pub dismissed: Vec<WindowKey>,
}

impl Diff {
    /// True when nothing appeared or disappeared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detected.is_empty() && self.dismissed.is_empty()
    }
}

/// Snapshots on-screen windows and tracks the set of known keys.
pub struct WindowEnumerator {
    /// Window list collaborator.
    source: Arc<dyn WindowSource>,
    /// Keys seen on the previous diff.
    known: HashSet<WindowKey>,
}

impl WindowEnumerator {
    /// Create an enumerator with an empty known-id set.
    pub fn new(source: Arc<dyn WindowSource>) -> Self {
        Self {
            source,
            known: HashSet::new(),
        }
    }

    /// Read the window list once and apply owner and coarse size filtering.
    /// Only owner-matched windows make up the surface.
    pub fn enumerate(&self, filter: &FilterCriteria) -> Result<Enumerated, ListError> {
        let all = self.source.list_windows().map_err(|e| {
            warn!("enumerate: window list failed: {}", e);
            e
        })?;
        let mut out = Enumerated::default();
        for w in all {
            if !filter.owner_matches(&w.owner) {
                if filter.overlay_passes(&w) {
                    trace!(key = %w.key(), owner = %w.owner, layer = w.layer, "enumerate: foreign overlay");
                    out.foreign.insert(w.key());
                    out.candidates.push(w);
                }
                continue;
            }
            if filter.window_passes(&w.bounds) {
                out.candidates.push(w.clone());
            } else {
                trace!(key = %w.key(), bounds = %w.bounds, "enumerate: below size floor");
            }
            out.surface.push(w);
        }
        trace!(
            candidates = out.candidates.len(),
            foreign = out.foreign.len(),
            surface = out.surface.len(),
            "enumerate"
        );
        Ok(out)
    }

    /// Diff `current` against the known set and replace the known set.
    pub fn diff(&mut self, current: &[WindowDescriptor]) -> Diff {
        let current_ids: HashSet<WindowKey> = current.iter().map(WindowDescriptor::key).collect();
        let diff = diff_ids(&self.known, &current_ids);
        self.known = current_ids;
        diff
    }

    /// Drop `key` from the known set so it is reported as detected again.
    pub fn forget(&mut self, key: WindowKey) -> bool {
        self.known.remove(&key)
    }

    /// Clear the known set; every window is reported as new on the next diff.
    pub fn reset(&mut self) {
        self.known.clear();
    }

    /// Keys currently considered known.
    #[must_use]
    pub fn known(&self) -> &HashSet<WindowKey> {
        &self.known
    }
}

/// Pure set difference: `detected = current − known`, `dismissed = known − current`.
/// Output vectors are sorted for stable logging and tests.
#[must_use]
pub fn diff_ids(known: &HashSet<WindowKey>, current: &HashSet<WindowKey>) -> Diff {
    let mut detected: Vec<WindowKey> = current.difference(known).copied().collect();
    let mut dismissed: Vec<WindowKey> = known.difference(current).copied().collect();
    detected.sort();
    dismissed.sort();
    Diff {
        detected,
        dismissed,
    }
}
