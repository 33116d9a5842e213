//! Detection passes over the active-window registry.
//!
//! A [`Monitor`] owns every piece of mutable engine state: the registry of
//! tracked windows, the enumerator's known keys, the geometry cache, the
//! widget watcher and the lifecycle state. It has no scheduling of its own;
//! the coordinator calls [`Monitor::run_pass`] from a single task, and tests
//! call it directly.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt, mem,
    sync::Arc,
    time::Instant as StdInstant,
};

use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::{
    applier::PositionApplier,
    calculator::{PositionCalculator, is_valid},
    config::MonitorCfg,
    delegate::MonitorDelegate,
    enumerator::WindowEnumerator,
    error::{AxError, DetectionError, ListError, Result},
    geom::{Point, Size, size_approx_eq, to_ax_origin},
    ids::WindowKey,
    locator::ElementLocator,
    model::{Anchor, FilterCriteria, NotificationKind, ScreenGeometry, TrackedWindow, WindowDescriptor},
    platform::Platform,
    state::{MonitoringState, StateCell},
    widget::{PanelEvent, WidgetPanelWatcher},
};

/// Size difference treated as "same size" for cache reuse.
const CACHE_SIZE_EPS: f64 = 0.5;

/// What caused a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// First pass after start.
    Start,
    /// Poll tick.
    Poll,
    /// Leading edge of an accessibility event burst.
    AxEvent,
    /// Trailing pass after an event burst.
    Debounced,
    /// The anchor changed.
    AnchorChanged,
    /// Monitoring resumed from pause.
    Resume,
    /// Explicit request.
    Manual,
}

impl Trigger {
    /// True for triggers subject to the poll throttle.
    #[must_use]
    pub const fn is_throttled(self) -> bool {
        matches!(self, Self::Poll)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Poll => "poll",
            Self::AxEvent => "ax-event",
            Self::Debounced => "debounced",
            Self::AnchorChanged => "anchor-changed",
            Self::Resume => "resume",
            Self::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Why a window was left alone during a pass.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Classified as a kind that is never moved.
    Excluded(NotificationKind),
    /// Element not resolvable yet; it will be re-detected.
    Unresolved {
        /// Failed attempts so far.
        attempt: u32,
    },
    /// A window of another owner without recognisable notification content.
    Unrecognized,
    /// A non-fatal error absorbed by the pass.
    Failed(DetectionError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded(kind) => write!(f, "excluded ({kind})"),
            Self::Unresolved { attempt } => write!(f, "unresolved (attempt {attempt})"),
            Self::Unrecognized => f.write_str("unrecognized"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// A window skipped during a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Skipped {
    /// Window key.
    pub key: WindowKey,
    /// Reason.
    pub reason: SkipReason,
}

/// Summary of one detection pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    /// What caused the pass.
    pub trigger: Trigger,
    /// Keys that entered the registry.
    pub detected: Vec<WindowKey>,
    /// Keys that left the registry.
    pub dismissed: Vec<WindowKey>,
    /// Keys whose position was written and verified.
    pub repositioned: Vec<WindowKey>,
    /// Tracked keys re-evaluated after an invalidation.
    pub reevaluated: Vec<WindowKey>,
    /// Windows left alone, with reasons.
    pub skipped: Vec<Skipped>,
    /// Widget panel transition seen in this pass.
    pub panel_event: Option<PanelEvent>,
    /// The geometry cache was dropped during this pass.
    pub cache_invalidated: bool,
    /// Pass-level failure that cut the pass short.
    pub error: Option<DetectionError>,
}

impl PassReport {
    /// Empty report for `trigger`.
    #[must_use]
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            detected: Vec::new(),
            dismissed: Vec::new(),
            repositioned: Vec::new(),
            reevaluated: Vec::new(),
            skipped: Vec::new(),
            panel_event: None,
            cache_invalidated: false,
            error: None,
        }
    }

    /// True when the pass changed nothing and hit nothing.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.detected.is_empty()
            && self.dismissed.is_empty()
            && self.repositioned.is_empty()
            && self.reevaluated.is_empty()
            && self.panel_event.is_none()
            && self.error.is_none()
    }
}

/// Cached content size and its computed AX target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryCache {
    /// First content size observed since the last invalidation.
    pub size: Size,
    /// Target for that size, in AX coordinates.
    pub target: Point,
}

/// Read-only view of the monitor for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorStatus {
    /// Lifecycle state.
    pub state: MonitoringState,
    /// Active anchor.
    pub anchor: Anchor,
    /// Number of tracked windows.
    pub tracked: usize,
    /// Number of windows tracked for exclusion only.
    pub excluded: usize,
    /// Current run of failed enumerations.
    pub consecutive_failures: u32,
    /// Whether the widget panel is open.
    pub panel_open: bool,
    /// Passes completed.
    pub passes: u64,
    /// Current geometry cache.
    pub cache: Option<GeometryCache>,
    /// Report of the most recent pass.
    pub last_pass: Option<PassReport>,
}

/// Current time as a std instant, following tokio's (possibly paused) clock.
fn now() -> StdInstant {
    Instant::now().into_std()
}

/// The detection engine.
pub struct Monitor {
    /// Injected collaborators.
    platform: Platform,
    /// Tunables.
    cfg: MonitorCfg,
    /// Placement target.
    anchor: Anchor,
    /// Candidate filter.
    filter: FilterCriteria,
    /// Window list reader and known-key set.
    enumerator: WindowEnumerator,
    /// Content element search.
    locator: ElementLocator,
    /// Target computation.
    calculator: PositionCalculator,
    /// Mutation and verification.
    applier: PositionApplier,
    /// Tray presence.
    watcher: WidgetPanelWatcher,
    /// Tracked, repositionable windows.
    registry: HashMap<WindowKey, TrackedWindow>,
    /// Windows known but never moved, with their kind.
    excluded: HashMap<WindowKey, NotificationKind>,
    /// Failed resolution attempts per key.
    unresolved: HashMap<WindowKey, u32>,
    /// First-size cache.
    cache: Option<GeometryCache>,
    /// Last screen geometry seen.
    screen: Option<ScreenGeometry>,
    /// Lifecycle state.
    state: StateCell,
    /// Callback sink.
    delegate: Arc<dyn MonitorDelegate>,
    /// Consecutive failed enumerations.
    failures: u32,
    /// Re-evaluate every tracked window on the next pass.
    reevaluate: bool,
    /// Pids owning notification surfaces at the last pass.
    surface_pids: BTreeSet<i32>,
    /// Completed passes.
    passes: u64,
    /// Most recent report.
    last_report: Option<PassReport>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("state", self.state.get())
            .field("anchor", &self.anchor)
            .field("tracked", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Build a monitor over `platform`.
    pub fn new(
        platform: Platform,
        cfg: MonitorCfg,
        delegate: Arc<dyn MonitorDelegate>,
    ) -> Result<Self> {
        if cfg.poll_interval.is_zero() {
            return Err(DetectionError::InvalidConfig("poll interval must be non-zero".into()));
        }
        if cfg.debounce.is_zero() {
            return Err(DetectionError::InvalidConfig("debounce must be non-zero".into()));
        }
        let pattern = Regex::new(&cfg.widget_pattern)
            .map_err(|e| DetectionError::InvalidConfig(format!("widget pattern: {e}")))?;
        let calculator = PositionCalculator {
            padding: cfg.padding,
            extra_bottom: cfg.extra_bottom,
        };
        Ok(Self {
            enumerator: WindowEnumerator::new(platform.windows.clone()),
            locator: ElementLocator::new(platform.query.clone(), cfg.locator.clone()),
            applier: PositionApplier::new(platform.query.clone(), platform.mutate.clone()),
            watcher: WidgetPanelWatcher::new(platform.query.clone(), pattern),
            calculator,
            platform,
            cfg,
            anchor: Anchor::default(),
            filter: FilterCriteria::default(),
            registry: HashMap::new(),
            excluded: HashMap::new(),
            unresolved: HashMap::new(),
            cache: None,
            screen: None,
            state: StateCell::new(),
            delegate,
            failures: 0,
            reevaluate: false,
            surface_pids: BTreeSet::new(),
            passes: 0,
            last_report: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &MonitoringState {
        self.state.get()
    }

    /// Active anchor.
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Injected collaborators.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Active tunables.
    pub fn cfg(&self) -> &MonitorCfg {
        &self.cfg
    }

    /// Pids owning notification surfaces at the last pass.
    pub fn surface_pids(&self) -> &BTreeSet<i32> {
        &self.surface_pids
    }

    /// Tracked windows, ordered by key.
    pub fn snapshot(&self) -> Vec<TrackedWindow> {
        let mut v: Vec<TrackedWindow> = self.registry.values().cloned().collect();
        v.sort_by_key(|w| w.key);
        v
    }

    /// Diagnostic summary.
    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            state: self.state.get().clone(),
            anchor: self.anchor,
            tracked: self.registry.len(),
            excluded: self.excluded.len(),
            consecutive_failures: self.failures,
            panel_open: self.watcher.is_open(),
            passes: self.passes,
            cache: self.cache,
            last_pass: self.last_report.clone(),
        }
    }

    /// Begin monitoring with `anchor` and `filter`.
    ///
    /// Fails with [`DetectionError::PermissionDenied`] (and enters the error
    /// state) when the process is not trusted. Restarting from `Stopped` or
    /// `Error` clears all per-session state.
    pub fn start(&mut self, anchor: Anchor, filter: FilterCriteria) -> Result<()> {
        if !self.state.get().can_transition(&MonitoringState::Monitoring) {
            return Err(DetectionError::InvalidTransition {
                from: self.state.get().clone(),
                to: MonitoringState::Monitoring,
            });
        }
        if !self.platform.permissions.accessibility_trusted() {
            let err = DetectionError::PermissionDenied;
            self.fail(&err);
            return Err(err);
        }
        self.anchor = anchor;
        self.filter = filter;
        self.reset_session();
        self.set_state(MonitoringState::Monitoring)?;
        info!(anchor = %anchor, "monitoring started");
        Ok(())
    }

    /// Stop monitoring. The registry is kept for inspection.
    pub fn stop(&mut self) -> Result<()> {
        self.set_state(MonitoringState::Stopped)
    }

    /// Suspend passes.
    pub fn pause(&mut self) -> Result<()> {
        self.set_state(MonitoringState::Paused)
    }

    /// Resume passes after [`pause`](Self::pause). The next pass re-evaluates
    /// every tracked window.
    pub fn resume(&mut self) -> Result<()> {
        if *self.state.get() != MonitoringState::Paused {
            return Err(DetectionError::InvalidTransition {
                from: self.state.get().clone(),
                to: MonitoringState::Monitoring,
            });
        }
        self.set_state(MonitoringState::Monitoring)?;
        self.reevaluate = true;
        Ok(())
    }

    /// Change the anchor. Drops the geometry cache and marks every tracked
    /// window for re-evaluation on the next pass.
    pub fn update_anchor(&mut self, anchor: Anchor) {
        if anchor == self.anchor {
            return;
        }
        info!(from = %self.anchor, to = %anchor, "anchor changed");
        self.anchor = anchor;
        self.cache = None;
        self.reevaluate = true;
    }

    /// Run one detection pass.
    ///
    /// Returns `Ok(None)` when the monitor is not in the monitoring state.
    /// Returns `Err` only for failures that moved the monitor into its error
    /// state; everything else is recorded in the report.
    pub async fn run_pass(&mut self, trigger: Trigger) -> Result<Option<PassReport>> {
        if *self.state.get() != MonitoringState::Monitoring {
            trace!(state = %self.state.get(), trigger = %trigger, "pass skipped: inactive");
            return Ok(None);
        }
        let mut report = PassReport::new(trigger);

        if !self.platform.permissions.accessibility_trusted() {
            let err = DetectionError::PermissionDenied;
            self.fail(&err);
            return Err(err);
        }

        self.refresh_screen(&mut report);

        let listing = match self.enumerator.enumerate(&self.filter) {
            Ok(l) => {
                self.failures = 0;
                l
            }
            Err(e) => return self.enumeration_failed(e, report),
        };

        let scan = self.watcher.observe(&listing.surface);
        self.surface_pids = listing.surface.iter().map(|w| w.pid).collect();
        if let Some(ev) = scan.event {
            report.panel_event = Some(ev);
            self.invalidate_cache(&mut report);
            self.reevaluate = true;
        }
        let surface_keys: HashSet<WindowKey> =
            listing.surface.iter().map(WindowDescriptor::key).collect();
        self.excluded.retain(|k, _| surface_keys.contains(k));
        for key in &scan.panels {
            self.excluded.insert(*key, NotificationKind::CenterPanel);
        }

        let candidates: Vec<WindowDescriptor> = listing
            .candidates
            .into_iter()
            .filter(|w| !scan.panels.contains(&w.key()))
            .collect();
        let diff = self.enumerator.diff(&candidates);
        for key in &diff.dismissed {
            self.dismiss(*key, &mut report);
        }
        self.prune_stale(&mut report);

        let mut touched: HashSet<WindowKey> = HashSet::new();
        self.process(
            &candidates,
            &listing.foreign,
            &diff.detected,
            &mut report,
            &mut touched,
        )
        .await?;
        self.finish(report)
    }

    /// Handle new windows, then re-evaluate or drift-check tracked ones.
    async fn process(
        &mut self,
        candidates: &[WindowDescriptor],
        foreign: &HashSet<WindowKey>,
        detected: &[WindowKey],
        report: &mut PassReport,
        touched: &mut HashSet<WindowKey>,
    ) -> Result<()> {
        for key in detected {
            if let Some(desc) = candidates.iter().find(|w| w.key() == *key) {
                let foreign = foreign.contains(key);
                self.handle_detected(desc, foreign, report, touched).await?;
            }
        }

        let mut existing: Vec<WindowKey> = self
            .registry
            .keys()
            .filter(|k| !touched.contains(k))
            .copied()
            .collect();
        existing.sort();
        if mem::take(&mut self.reevaluate) {
            for key in existing {
                report.reevaluated.push(key);
                self.reposition(key, report, touched).await?;
            }
        } else {
            for key in existing {
                self.check_drift(key, report, touched).await?;
            }
        }
        Ok(())
    }

    /// Resolve, classify and position a newly listed window. A `foreign`
    /// window gets one attempt and must match by subrole or identifier.
    async fn handle_detected(
        &mut self,
        desc: &WindowDescriptor,
        foreign: bool,
        report: &mut PassReport,
        touched: &mut HashSet<WindowKey>,
    ) -> Result<()> {
        let key = desc.key();
        let root = match self.platform.query.window_element(desc) {
            Ok(Some(r)) => r,
            Ok(None) | Err(AxError::NotReady | AxError::Code(_)) if foreign => {
                self.skip(report, key, SkipReason::Unrecognized);
                return Ok(());
            }
            Ok(None) | Err(AxError::NotReady | AxError::Code(_)) => {
                self.unresolved(key, report);
                return Ok(());
            }
            Err(AxError::Gone) => {
                self.skip(report, key, SkipReason::Failed(DetectionError::WindowGone));
                return Ok(());
            }
            Err(AxError::Permission) => return Err(self.fatal(DetectionError::PermissionDenied)),
        };

        let located = match self.locator.locate(root, &self.filter, self.screen.as_ref()) {
            Ok(Some(l)) if foreign && !l.strategy.is_content_match() => {
                trace!(key = %key, owner = %desc.owner, strategy = %l.strategy, "foreign window ignored");
                self.skip(report, key, SkipReason::Unrecognized);
                return Ok(());
            }
            Ok(Some(l)) => l,
            Ok(None) if foreign => {
                self.skip(report, key, SkipReason::Unrecognized);
                return Ok(());
            }
            Ok(None) => {
                self.unresolved(key, report);
                return Ok(());
            }
            Err(AxError::Permission) => return Err(self.fatal(DetectionError::PermissionDenied)),
            Err(e) => {
                self.skip(report, key, SkipReason::Failed(e.into()));
                return Ok(());
            }
        };
        self.unresolved.remove(&key);

        if !self.filter.kind_allowed(located.kind) {
            debug!(key = %key, kind = %located.kind, "window excluded");
            self.excluded.insert(key, located.kind);
            self.skip(report, key, SkipReason::Excluded(located.kind));
            return Ok(());
        }

        let tw = TrackedWindow::new(
            key,
            located.element,
            located.frame,
            located.kind,
            located.strategy,
            now(),
        );
        info!(
            key = %key,
            kind = %tw.kind,
            strategy = %tw.strategy,
            frame = %located.frame,
            "window detected"
        );
        self.registry.insert(key, tw);
        report.detected.push(key);
        self.reposition(key, report, touched).await?;
        if let Some(tw) = self.registry.get(&key) {
            self.delegate.on_window_detected(tw);
        }
        Ok(())
    }

    /// Re-read a tracked window and reposition it if it is not where it
    /// should be.
    async fn check_drift(
        &mut self,
        key: WindowKey,
        report: &mut PassReport,
        touched: &mut HashSet<WindowKey>,
    ) -> Result<()> {
        let Some(tw) = self.registry.get(&key).cloned() else {
            return Ok(());
        };
        let pos = match self.platform.query.position(tw.element) {
            Ok(Some(p)) => p,
            Ok(None) | Err(AxError::NotReady | AxError::Code(_)) => return Ok(()),
            Err(AxError::Gone) => {
                self.dismiss_gone(key, report);
                return Ok(());
            }
            Err(AxError::Permission) => return Err(self.fatal(DetectionError::PermissionDenied)),
        };
        let size = self
            .platform
            .query
            .size(tw.element)
            .ok()
            .flatten()
            .unwrap_or(tw.size);
        let moved = pos != tw.position || size != tw.size;
        if let Some(entry) = self.registry.get_mut(&key) {
            if moved {
                debug!(key = %key, from = %entry.frame(), pos = %pos, size = %size, "geometry changed");
            }
            entry.position = pos;
            entry.size = size;
            entry.updated_at = now();
        }
        let off_target = tw.target != Some(pos);
        if !tw.has_been_repositioned || off_target || size != tw.size {
            self.reposition(key, report, touched).await?;
        }
        Ok(())
    }

    /// Compute the target for a tracked window and move it there. At most
    /// one write per window per pass.
    async fn reposition(
        &mut self,
        key: WindowKey,
        report: &mut PassReport,
        touched: &mut HashSet<WindowKey>,
    ) -> Result<()> {
        let Some(tw) = self.registry.get(&key).cloned() else {
            return Ok(());
        };
        if !touched.insert(key) {
            return Ok(());
        }
        let frame = match self.applier.read_frame(tw.element).await {
            Ok(f) => Some(f),
            Err(DetectionError::WindowGone) => {
                self.dismiss_gone(key, report);
                return Ok(());
            }
            Err(DetectionError::PermissionDenied) => {
                return Err(self.fatal(DetectionError::PermissionDenied));
            }
            Err(e) => {
                trace!(key = %key, error = %e, "frame unreadable; using cached size");
                None
            }
        };
        let size = match (frame, self.cache) {
            (Some(f), _) => f.size(),
            (None, Some(c)) => c.size,
            (None, None) => tw.size,
        };
        let Some(target) = self.target_for(size) else {
            self.skip(report, key, SkipReason::Failed(DetectionError::NotReady));
            return Ok(());
        };
        if tw.has_been_repositioned && frame.is_some_and(|f| f.origin() == target) {
            if let Some(entry) = self.registry.get_mut(&key) {
                entry.position = target;
                entry.size = size;
                entry.target = Some(target);
                entry.updated_at = now();
            }
            return Ok(());
        }

        self.enter_positioning()?;
        match self.applier.reposition(tw.element, target).await {
            Ok(p) => {
                if let Some(entry) = self.registry.get_mut(&key) {
                    entry.position = p;
                    entry.size = size;
                    entry.target = Some(p);
                    entry.has_been_repositioned = true;
                    entry.updated_at = now();
                }
                info!(key = %key, anchor = %self.anchor, target = %p, "window repositioned");
                report.repositioned.push(key);
            }
            Err(DetectionError::PermissionDenied) => {
                return Err(self.fatal(DetectionError::PermissionDenied));
            }
            Err(DetectionError::WindowGone) => self.dismiss_gone(key, report),
            Err(e) => {
                debug!(key = %key, target = %target, error = %e, "reposition skipped");
                if let Some(entry) = self.registry.get_mut(&key) {
                    entry.target = Some(target);
                    if let Some(f) = frame {
                        entry.position = f.origin();
                        entry.size = f.size();
                    }
                }
                self.skip(report, key, SkipReason::Failed(e));
            }
        }
        Ok(())
    }

    /// AX-space target for content of `size`, reusing the cache when the
    /// size matches.
    fn target_for(&mut self, size: Size) -> Option<Point> {
        if let Some(c) = self.cache
            && size_approx_eq(c.size, size, CACHE_SIZE_EPS)
        {
            return Some(c.target);
        }
        let screen = self.screen?;
        let p = self.calculator.target(size, self.anchor, &screen);
        if !is_valid(p, size, screen.frame) {
            warn!(target = %p, size = %size, "computed target off screen");
            return None;
        }
        let target = to_ax_origin(p, size, screen.primary_height);
        if self.cache.is_none() {
            trace!(size = %size, target = %target, "geometry cached");
            self.cache = Some(GeometryCache { size, target });
        }
        Some(target)
    }

    /// Pick up screen changes; a change invalidates the cache.
    fn refresh_screen(&mut self, report: &mut PassReport) {
        let current = self.platform.screen.notification_screen();
        if current == self.screen {
            return;
        }
        if self.screen.is_some() {
            info!(screen = ?current.map(|s| s.frame), "screen configuration changed");
            self.invalidate_cache(report);
            self.reevaluate = true;
        }
        self.screen = current;
    }

    /// Record a failed listing; escalate at the threshold.
    fn enumeration_failed(
        &mut self,
        e: ListError,
        mut report: PassReport,
    ) -> Result<Option<PassReport>> {
        self.failures += 1;
        let err = DetectionError::EnumerationFailure {
            consecutive: self.failures,
            reason: e.to_string(),
        };
        if self.failures >= self.cfg.failure_threshold {
            return Err(self.fatal(err));
        }
        warn!(consecutive = self.failures, error = %e, "enumeration failed; pass skipped");
        report.error = Some(err);
        self.finish(report)
    }

    /// Count a failed resolution; below the limit the key is forgotten so
    /// the next pass detects it again.
    fn unresolved(&mut self, key: WindowKey, report: &mut PassReport) {
        let attempt = {
            let n = self.unresolved.entry(key).or_default();
            *n += 1;
            *n
        };
        if attempt < self.cfg.locate_attempts {
            self.enumerator.forget(key);
        } else {
            debug!(key = %key, attempts = attempt, "window not repositionable");
        }
        self.skip(report, key, SkipReason::Unresolved { attempt });
    }

    /// Revalidate entries not refreshed within `stale_after`.
    fn prune_stale(&mut self, report: &mut PassReport) {
        let t = now();
        let stale: Vec<WindowKey> = self
            .registry
            .values()
            .filter(|w| t.duration_since(w.updated_at) >= self.cfg.stale_after)
            .map(|w| w.key)
            .collect();
        for key in stale {
            let alive = self
                .registry
                .get(&key)
                .is_some_and(|w| self.platform.query.is_alive(w.element));
            if alive {
                if let Some(w) = self.registry.get_mut(&key) {
                    w.updated_at = t;
                }
            } else {
                debug!(key = %key, "stale entry has a dead element");
                self.dismiss_gone(key, report);
            }
        }
    }

    /// Remove a key from every table and notify if it was tracked.
    fn dismiss(&mut self, key: WindowKey, report: &mut PassReport) {
        self.unresolved.remove(&key);
        self.excluded.remove(&key);
        if let Some(tw) = self.registry.remove(&key) {
            info!(key = %key, "window dismissed");
            report.dismissed.push(key);
            self.delegate.on_window_dismissed(&tw);
        }
    }

    /// Dismiss a window whose element died while its key may still be
    /// listed, so a reused key is detected fresh.
    fn dismiss_gone(&mut self, key: WindowKey, report: &mut PassReport) {
        self.dismiss(key, report);
        self.enumerator.forget(key);
    }

    /// Record a skipped window.
    fn skip(&self, report: &mut PassReport, key: WindowKey, reason: SkipReason) {
        trace!(key = %key, reason = %reason, "window skipped");
        report.skipped.push(Skipped { key, reason });
    }

    /// Drop the geometry cache.
    fn invalidate_cache(&mut self, report: &mut PassReport) {
        self.cache = None;
        report.cache_invalidated = true;
    }

    /// Enter `Positioning` if not already there.
    fn enter_positioning(&mut self) -> Result<()> {
        if *self.state.get() == MonitoringState::Monitoring {
            self.set_state(MonitoringState::Positioning)?;
        }
        Ok(())
    }

    /// Close out a pass: leave `Positioning` and store the report.
    fn finish(&mut self, report: PassReport) -> Result<Option<PassReport>> {
        if *self.state.get() == MonitoringState::Positioning {
            self.set_state(MonitoringState::Monitoring)?;
        }
        self.passes += 1;
        if !report.is_quiet() {
            debug!(
                trigger = %report.trigger,
                detected = report.detected.len(),
                dismissed = report.dismissed.len(),
                repositioned = report.repositioned.len(),
                reevaluated = report.reevaluated.len(),
                skipped = report.skipped.len(),
                "pass complete"
            );
        }
        self.last_report = Some(report.clone());
        Ok(Some(report))
    }

    /// Clear per-session tables.
    fn reset_session(&mut self) {
        self.registry.clear();
        self.excluded.clear();
        self.unresolved.clear();
        self.enumerator.reset();
        self.watcher.reset();
        self.cache = None;
        self.screen = None;
        self.failures = 0;
        self.reevaluate = false;
        self.surface_pids.clear();
    }

    /// Apply a transition and notify the delegate.
    fn set_state(&mut self, to: MonitoringState) -> Result<()> {
        let from = self.state.transition(to.clone())?;
        if from != to {
            debug!(from = %from, to = %to, "state");
            self.delegate.on_state_changed(&from, &to);
        }
        Ok(())
    }

    /// Enter the error state and surface `err`.
    fn fail(&mut self, err: &DetectionError) {
        warn!(error = %err, "monitoring halted");
        if let Err(e) = self.set_state(MonitoringState::Error(err.to_string())) {
            warn!(error = %e, "error transition rejected");
        }
        self.delegate.on_error(err);
    }

    /// [`fail`](Self::fail) and hand the error back for propagation.
    fn fatal(&mut self, err: DetectionError) -> DetectionError {
        self.fail(&err);
        err
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        delegate::NoopDelegate,
        geom::Rect,
        test_support::{FakePlatform, RecordingDelegate},
    };

    fn monitor(fake: &FakePlatform) -> (Monitor, Arc<RecordingDelegate>) {
        let delegate = Arc::new(RecordingDelegate::new());
        let m = Monitor::new(fake.platform(), MonitorCfg::default(), delegate.clone()).unwrap();
        (m, delegate)
    }

    #[test]
    fn bad_widget_pattern_is_rejected() {
        let fake = FakePlatform::new();
        let cfg = MonitorCfg {
            widget_pattern: "(".into(),
            ..MonitorCfg::default()
        };
        let err = Monitor::new(fake.platform(), cfg, Arc::new(NoopDelegate)).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidConfig(_)));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let fake = FakePlatform::new();
        for cfg in [
            MonitorCfg {
                poll_interval: Duration::ZERO,
                ..MonitorCfg::default()
            },
            MonitorCfg {
                debounce: Duration::ZERO,
                ..MonitorCfg::default()
            },
        ] {
            let err = Monitor::new(fake.platform(), cfg, Arc::new(NoopDelegate)).unwrap_err();
            assert!(matches!(err, DetectionError::InvalidConfig(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_monitor_does_not_pass() {
        let fake = FakePlatform::new();
        let (mut m, _) = monitor(&fake);
        assert_eq!(m.run_pass(Trigger::Poll).await, Ok(None));
        assert_eq!(fake.windows.list_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_banner_is_moved_to_anchor() {
        let fake = FakePlatform::new();
        let (key, el) = fake.add_banner(1, Rect::new(1560.0, 40.0, 300.0, 80.0));
        let (mut m, delegate) = monitor(&fake);
        m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
        let report = m.run_pass(Trigger::Start).await.unwrap().unwrap();
        assert_eq!(report.detected, vec![key]);
        assert_eq!(report.repositioned, vec![key]);
        // (1600, 50) bottom-left on a 1080-high screen is y = 950 in AX space.
        assert_eq!(fake.tree.position_of(el), Some(Point::new(1600.0, 950.0)));
        let snap = m.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].has_been_repositioned);
        assert_eq!(snap[0].initial_position(), Point::new(1560.0, 40.0));
        assert_eq!(delegate.detected().len(), 1);
        assert!(delegate.detected()[0].has_been_repositioned);
        assert_eq!(m.state(), &MonitoringState::Monitoring);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_pass_does_not_rewrite() {
        let fake = FakePlatform::new();
        let (_, el) = fake.add_banner(1, Rect::new(1560.0, 40.0, 300.0, 80.0));
        let (mut m, _) = monitor(&fake);
        m.start(Anchor::TopLeft, FilterCriteria::default()).unwrap();
        m.run_pass(Trigger::Start).await.unwrap();
        m.run_pass(Trigger::Poll).await.unwrap();
        m.run_pass(Trigger::Poll).await.unwrap();
        assert_eq!(fake.tree.writes_to(el).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_window_leaves_registry() {
        let fake = FakePlatform::new();
        let (key, _) = fake.add_banner(1, Rect::new(1560.0, 40.0, 300.0, 80.0));
        let (mut m, delegate) = monitor(&fake);
        m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
        m.run_pass(Trigger::Start).await.unwrap();
        fake.dismiss(key);
        let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
        assert_eq!(report.dismissed, vec![key]);
        assert!(m.snapshot().is_empty());
        assert_eq!(delegate.dismissed(), vec![key]);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_change_reevaluates_tracked_windows() {
        let fake = FakePlatform::new();
        let (key, el) = fake.add_banner(1, Rect::new(1560.0, 40.0, 300.0, 80.0));
        let (mut m, _) = monitor(&fake);
        m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
        m.run_pass(Trigger::Start).await.unwrap();
        m.update_anchor(Anchor::TopLeft);
        assert_eq!(m.status().cache, None);
        let report = m.run_pass(Trigger::AnchorChanged).await.unwrap().unwrap();
        assert_eq!(report.reevaluated, vec![key]);
        assert_eq!(report.repositioned, vec![key]);
        // Top-left: (20, 1080 - 80 - 20) bottom-left → (20, 20) in AX space.
        assert_eq!(fake.tree.position_of(el), Some(Point::new(20.0, 20.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn disallowed_kind_is_excluded_not_tracked() {
        let fake = FakePlatform::new();
        let (key, el) = fake.add_notification(
            3,
            Rect::new(1560.0, 40.0, 300.0, 120.0),
            "AXNotificationCenterAlert",
        );
        let (mut m, delegate) = monitor(&fake);
        let filter = FilterCriteria {
            allowed_kinds: [NotificationKind::Banner].into_iter().collect(),
            ..FilterCriteria::default()
        };
        m.start(Anchor::BottomRight, filter).unwrap();
        let report = m.run_pass(Trigger::Start).await.unwrap().unwrap();
        assert!(report.detected.is_empty());
        assert_eq!(
            report.skipped,
            vec![Skipped {
                key,
                reason: SkipReason::Excluded(NotificationKind::Alert)
            }]
        );
        assert!(fake.tree.writes_to(el).is_empty());
        assert!(delegate.detected().is_empty());
        assert_eq!(m.status().excluded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_permission_enters_error() {
        let fake = FakePlatform::new();
        fake.permissions.set(false);
        let (mut m, delegate) = monitor(&fake);
        assert_eq!(
            m.start(Anchor::BottomRight, FilterCriteria::default()),
            Err(DetectionError::PermissionDenied)
        );
        assert!(matches!(m.state(), MonitoringState::Error(_)));
        assert_eq!(delegate.errors(), vec![DetectionError::PermissionDenied]);
        assert_eq!(fake.windows.list_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_blocks_passes_until_resume() {
        let fake = FakePlatform::new();
        let (mut m, _) = monitor(&fake);
        m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
        m.pause().unwrap();
        assert_eq!(m.run_pass(Trigger::Poll).await, Ok(None));
        m.resume().unwrap();
        assert!(m.run_pass(Trigger::Resume).await.unwrap().is_some());
        assert!(m.resume().is_err());
    }
}
