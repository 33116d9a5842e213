//! Watches the notification center / widget tray.
//!
//! The tray is a large overlay owned by the notification process. It is
//! never repositioned, and while it is open the usable layout shifts, so any
//! change in its presence is reported to the monitor as a [`PanelEvent`].
//!
//! A window counts as a panel only when its tree carries a widget
//! identifier. Root bounds alone decide nothing: banners are sometimes
//! hosted in windows larger than the panel threshold, and those must still
//! reach the locator.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use regex::Regex;
use tracing::{debug, trace};

use crate::{
    ids::WindowKey,
    locator::tree,
    model::WindowDescriptor,
    platform::AxQuery,
};

/// Default identifier pattern for widget/tray content.
pub const DEFAULT_WIDGET_PATTERN: &str = "^widget-local:";
/// Depth searched below each window root for a matching identifier.
pub const WIDGET_SEARCH_DEPTH: usize = 6;
/// Elements visited per window when searching for widgets.
const WIDGET_SEARCH_NODES: usize = 128;

/// Presence transition of the tray.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelEvent {
    /// Panels appeared where there were none.
    Opened {
        /// Panel windows now present.
        count: usize,
    },
    /// All panels disappeared.
    Closed,
    /// The number of panel windows changed while open.
    CountChanged {
        /// Previous count.
        from: usize,
        /// New count.
        to: usize,
    },
}

impl fmt::Display for PanelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened { count } => write!(f, "opened({count})"),
            Self::Closed => f.write_str("closed"),
            Self::CountChanged { from, to } => write!(f, "count {from}->{to}"),
        }
    }
}

/// Result of one observation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PanelScan {
    /// Keys of surface windows that are panels.
    pub panels: HashSet<WindowKey>,
    /// Transition since the previous observation, if any.
    pub event: Option<PanelEvent>,
}

/// Tracks tray presence across passes.
pub struct WidgetPanelWatcher {
    /// Attribute reads for the identifier search.
    query: Arc<dyn AxQuery>,
    /// Identifier pattern marking widget content.
    pattern: Regex,
    /// Cached verdict per window.
    verdicts: HashMap<WindowKey, bool>,
    /// Panel count at the previous observation.
    last_count: usize,
}

impl fmt::Debug for WidgetPanelWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetPanelWatcher")
            .field("pattern", &self.pattern.as_str())
            .field("last_count", &self.last_count)
            .finish_non_exhaustive()
    }
}

impl WidgetPanelWatcher {
    /// Create a watcher using `pattern` to recognise widget identifiers.
    pub fn new(query: Arc<dyn AxQuery>, pattern: Regex) -> Self {
        Self {
            query,
            pattern,
            verdicts: HashMap::new(),
            last_count: 0,
        }
    }

    /// Panel windows seen at the last observation.
    pub fn count(&self) -> usize {
        self.last_count
    }

    /// True when at least one panel was present at the last observation.
    pub fn is_open(&self) -> bool {
        self.last_count > 0
    }

    /// Forget all cached verdicts and presence.
    pub fn reset(&mut self) {
        self.verdicts.clear();
        self.last_count = 0;
    }

    /// Classify `surface` windows and report any presence transition.
    pub fn observe(&mut self, surface: &[WindowDescriptor]) -> PanelScan {
        let live: HashSet<WindowKey> = surface.iter().map(WindowDescriptor::key).collect();
        self.verdicts.retain(|k, _| live.contains(k));

        let mut panels = HashSet::new();
        for w in surface {
            let key = w.key();
            let is_panel = match self.verdicts.get(&key) {
                Some(v) => *v,
                None => {
                    let v = self.has_widget(w);
                    self.verdicts.insert(key, v);
                    v
                }
            };
            if is_panel {
                panels.insert(key);
            }
        }

        let count = panels.len();
        let event = transition(self.last_count, count);
        if let Some(ev) = event {
            debug!(event = %ev, "widget panel transition");
        }
        self.last_count = count;
        PanelScan { panels, event }
    }

    /// True when a widget identifier appears within the search depth.
    fn has_widget(&self, w: &WindowDescriptor) -> bool {
        let root = match self.query.window_element(w) {
            Ok(Some(r)) => r,
            Ok(None) | Err(_) => return false,
        };
        let Ok(nodes) = tree::collect(
            self.query.as_ref(),
            root,
            WIDGET_SEARCH_DEPTH,
            WIDGET_SEARCH_NODES,
        ) else {
            return false;
        };
        let hit = nodes.iter().any(|n| {
            n.identifier
                .as_deref()
                .is_some_and(|id| self.pattern.is_match(id))
        });
        if hit {
            trace!(key = %w.key(), "panel: widget identifier");
        }
        hit
    }
}

/// Presence transition between two counts.
fn transition(from: usize, to: usize) -> Option<PanelEvent> {
    match (from, to) {
        (a, b) if a == b => None,
        (0, n) => Some(PanelEvent::Opened { count: n }),
        (_, 0) => Some(PanelEvent::Closed),
        (a, b) => Some(PanelEvent::CountChanged { from: a, to: b }),
    }
}
