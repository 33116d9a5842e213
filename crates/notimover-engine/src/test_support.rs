//! In-memory collaborators for exercising the engine without a window server.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    delegate::MonitorDelegate,
    error::{AxError, AxResult, DetectionError, ListError},
    geom::{Point, Rect, Size},
    ids::{ElementRef, WindowKey},
    model::{ScreenGeometry, TrackedWindow, WindowDescriptor},
    platform::{
        AxEvents, AxMutate, AxQuery, AxSignal, PermissionCheck, Platform, ScreenSource,
        Subscription, WindowSource,
    },
    state::MonitoringState,
};

/// kAXErrorAttributeUnsupported.
const AX_ATTRIBUTE_UNSUPPORTED: i32 = -25205;
/// kAXErrorCannotComplete.
const AX_CANNOT_COMPLETE: i32 = -25204;

/// Scripted window list.
#[derive(Default)]
pub struct FakeWindows {
    windows: Mutex<Vec<WindowDescriptor>>,
    fail: Mutex<Option<ListError>>,
    calls: AtomicUsize,
}

impl FakeWindows {
    /// Empty window list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the window list.
    pub fn set_windows(&self, windows: Vec<WindowDescriptor>) {
        *self.windows.lock() = windows;
    }

    /// Append one window.
    pub fn push(&self, w: WindowDescriptor) {
        self.windows.lock().push(w);
    }

    /// Remove a window by key.
    pub fn remove(&self, key: WindowKey) {
        self.windows.lock().retain(|w| w.key() != key);
    }

    /// Make every listing fail with `err`, or succeed again with `None`.
    pub fn set_fail(&self, err: Option<ListError>) {
        *self.fail.lock() = err;
    }

    /// Number of listing calls so far.
    pub fn list_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WindowSource for FakeWindows {
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.fail.lock().clone() {
            return Err(e);
        }
        Ok(self.windows.lock().clone())
    }
}

/// Attributes of one fake element.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    role: Option<String>,
    subrole: Option<String>,
    identifier: Option<String>,
    position: Option<Point>,
    size: Option<Size>,
    settable: bool,
    failing: bool,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            role: None,
            subrole: None,
            identifier: None,
            position: None,
            size: None,
            settable: true,
            failing: false,
        }
    }
}

impl NodeSpec {
    /// Element with no attributes, settable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `AXRole`.
    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Set `AXSubrole`.
    pub fn subrole(mut self, subrole: &str) -> Self {
        self.subrole = Some(subrole.to_string());
        self
    }

    /// Set `AXIdentifier`.
    pub fn identifier(mut self, id: &str) -> Self {
        self.identifier = Some(id.to_string());
        self
    }

    /// Set position and size.
    pub fn frame(mut self, pos: Point, size: Size) -> Self {
        self.position = Some(pos);
        self.size = Some(size);
        self
    }

    /// Whether `AXPosition` accepts writes.
    pub fn settable(mut self, settable: bool) -> Self {
        self.settable = settable;
        self
    }

    /// Every attribute read fails; children stay readable.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

/// One element in the fake tree.
#[derive(Debug)]
struct FakeNode {
    spec: NodeSpec,
    children: Vec<ElementRef>,
    alive: bool,
}

#[derive(Default)]
struct TreeInner {
    nodes: Vec<FakeNode>,
    roots: Vec<ElementRef>,
    windows: HashMap<WindowKey, ElementRef>,
    writes: Vec<(ElementRef, Point)>,
    snap: HashMap<ElementRef, Point>,
    failing_reads: HashMap<ElementRef, u32>,
    position_reads: HashMap<ElementRef, usize>,
    subscribers: Vec<(i32, UnboundedSender<AxSignal>, Arc<AtomicBool>)>,
}

impl TreeInner {
    fn node(&self, el: ElementRef) -> AxResult<&FakeNode> {
        let idx = usize::try_from(el.raw()).map_err(|_| AxError::Gone)?;
        match self.nodes.get(idx.wrapping_sub(1)) {
            Some(n) if n.alive => Ok(n),
            _ => Err(AxError::Gone),
        }
    }

    fn node_mut(&mut self, el: ElementRef) -> Option<&mut FakeNode> {
        let idx = usize::try_from(el.raw()).ok()?;
        self.nodes.get_mut(idx.wrapping_sub(1))
    }

    fn attr<T>(&self, el: ElementRef, f: impl FnOnce(&NodeSpec) -> Option<T>) -> AxResult<Option<T>> {
        let n = self.node(el)?;
        if n.spec.failing {
            return Err(AxError::Code(AX_CANNOT_COMPLETE));
        }
        Ok(f(&n.spec))
    }
}

/// Scripted accessibility tree. Implements the query, mutation and event
/// collaborators.
#[derive(Default)]
pub struct FakeAxTree {
    inner: Mutex<TreeInner>,
}

impl FakeAxTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, spec: NodeSpec) -> ElementRef {
        let mut g = self.inner.lock();
        g.nodes.push(FakeNode {
            spec,
            children: Vec::new(),
            alive: true,
        });
        ElementRef::from_raw(g.nodes.len() as u64)
    }

    /// Add a parentless element.
    pub fn add_root(&self, spec: NodeSpec) -> ElementRef {
        let el = self.insert(spec);
        self.inner.lock().roots.push(el);
        el
    }

    /// Add `spec` as the last child of `parent`.
    pub fn add_child(&self, parent: ElementRef, spec: NodeSpec) -> ElementRef {
        let el = self.insert(spec);
        if let Some(p) = self.inner.lock().node_mut(parent) {
            p.children.push(el);
        }
        el
    }

    /// First root added.
    pub fn root(&self) -> ElementRef {
        self.inner.lock().roots[0]
    }

    /// Make `key`'s window resolve to `root`.
    pub fn bind_window(&self, key: WindowKey, root: ElementRef) {
        self.inner.lock().windows.insert(key, root);
    }

    /// Invalidate an element and everything below it.
    pub fn kill(&self, el: ElementRef) {
        let mut g = self.inner.lock();
        let mut stack = vec![el];
        while let Some(e) = stack.pop() {
            if let Some(n) = g.node_mut(e) {
                n.alive = false;
                stack.extend(n.children.iter().copied());
            }
        }
    }

    /// Overwrite an element's frame.
    pub fn set_frame(&self, el: ElementRef, pos: Point, size: Size) {
        if let Some(n) = self.inner.lock().node_mut(el) {
            n.spec.position = Some(pos);
            n.spec.size = Some(size);
        }
    }

    /// Clear an element's size so it reads as absent.
    pub fn clear_size(&self, el: ElementRef) {
        if let Some(n) = self.inner.lock().node_mut(el) {
            n.spec.size = None;
        }
    }

    /// Current stored position of `el`.
    pub fn position_of(&self, el: ElementRef) -> Option<Point> {
        self.inner.lock().node_mut(el).and_then(|n| n.spec.position)
    }

    /// Make the next `n` position reads of `el` fail as not ready.
    pub fn fail_position_reads(&self, el: ElementRef, n: u32) {
        self.inner.lock().failing_reads.insert(el, n);
    }

    /// Total position reads of `el`.
    pub fn position_reads(&self, el: ElementRef) -> usize {
        self.inner
            .lock()
            .position_reads
            .get(&el)
            .copied()
            .unwrap_or(0)
    }

    /// Writes to `el` land at `p` regardless of the requested point.
    pub fn snap_writes_to(&self, el: ElementRef, p: Point) {
        self.inner.lock().snap.insert(el, p);
    }

    /// All accepted position writes, in order.
    pub fn writes(&self) -> Vec<(ElementRef, Point)> {
        self.inner.lock().writes.clone()
    }

    /// Accepted writes to `el`.
    pub fn writes_to(&self, el: ElementRef) -> Vec<Point> {
        self.inner
            .lock()
            .writes
            .iter()
            .filter(|(e, _)| *e == el)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Deliver `signal` to live subscribers for its pid.
    pub fn emit(&self, signal: AxSignal) {
        let pid = match signal {
            AxSignal::WindowCreated { pid } | AxSignal::ElementDestroyed { pid } => pid,
        };
        for (p, tx, live) in &self.inner.lock().subscribers {
            if *p == pid && live.load(Ordering::SeqCst) {
                let _ = tx.send(signal.clone());
            }
        }
    }

    /// Pids with a live subscription.
    pub fn subscribed_pids(&self) -> Vec<i32> {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|(_, _, live)| live.load(Ordering::SeqCst))
            .map(|(p, _, _)| *p)
            .collect()
    }
}

impl AxQuery for FakeAxTree {
    fn window_element(&self, window: &WindowDescriptor) -> AxResult<Option<ElementRef>> {
        Ok(self.inner.lock().windows.get(&window.key()).copied())
    }

    fn children(&self, el: ElementRef) -> AxResult<Vec<ElementRef>> {
        let g = self.inner.lock();
        Ok(g.node(el)?.children.clone())
    }

    fn role(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.inner.lock().attr(el, |s| s.role.clone())
    }

    fn subrole(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.inner.lock().attr(el, |s| s.subrole.clone())
    }

    fn identifier(&self, el: ElementRef) -> AxResult<Option<String>> {
        self.inner.lock().attr(el, |s| s.identifier.clone())
    }

    fn position(&self, el: ElementRef) -> AxResult<Option<Point>> {
        let mut g = self.inner.lock();
        *g.position_reads.entry(el).or_default() += 1;
        g.node(el)?;
        if let Some(left) = g.failing_reads.get_mut(&el)
            && *left > 0
        {
            *left -= 1;
            return Err(AxError::NotReady);
        }
        g.attr(el, |s| s.position)
    }

    fn size(&self, el: ElementRef) -> AxResult<Option<Size>> {
        self.inner.lock().attr(el, |s| s.size)
    }

    fn is_position_settable(&self, el: ElementRef) -> AxResult<bool> {
        Ok(self.inner.lock().node(el)?.spec.settable)
    }

    fn is_alive(&self, el: ElementRef) -> bool {
        self.inner.lock().node(el).is_ok()
    }
}

impl AxMutate for FakeAxTree {
    fn set_position(&self, el: ElementRef, p: Point) -> AxResult<()> {
        let mut g = self.inner.lock();
        if !g.node(el)?.spec.settable {
            return Err(AxError::Code(AX_ATTRIBUTE_UNSUPPORTED));
        }
        let landed = g.snap.get(&el).copied().unwrap_or(p);
        g.writes.push((el, p));
        if let Some(n) = g.node_mut(el) {
            n.spec.position = Some(landed);
        }
        Ok(())
    }
}

/// Subscription handle that marks itself dead on drop.
struct FakeSubscription(Arc<AtomicBool>);

impl Subscription for FakeSubscription {}

impl Drop for FakeSubscription {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AxEvents for FakeAxTree {
    fn subscribe(
        &self,
        pid: i32,
        sink: UnboundedSender<AxSignal>,
    ) -> AxResult<Box<dyn Subscription>> {
        let live = Arc::new(AtomicBool::new(true));
        self.inner.lock().subscribers.push((pid, sink, live.clone()));
        Ok(Box::new(FakeSubscription(live)))
    }
}

/// Toggleable permission check.
#[derive(Debug)]
pub struct FakePermissions(AtomicBool);

impl FakePermissions {
    /// Check answering `trusted`.
    pub fn new(trusted: bool) -> Self {
        Self(AtomicBool::new(trusted))
    }

    /// Change the answer.
    pub fn set(&self, trusted: bool) {
        self.0.store(trusted, Ordering::SeqCst);
    }
}

impl PermissionCheck for FakePermissions {
    fn accessibility_trusted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settable screen geometry.
#[derive(Debug, Default)]
pub struct FakeScreen(Mutex<Option<ScreenGeometry>>);

impl FakeScreen {
    /// Screen answering `geometry`.
    pub fn new(geometry: Option<ScreenGeometry>) -> Self {
        Self(Mutex::new(geometry))
    }

    /// Change the geometry.
    pub fn set(&self, geometry: Option<ScreenGeometry>) {
        *self.0.lock() = geometry;
    }
}

impl ScreenSource for FakeScreen {
    fn notification_screen(&self) -> Option<ScreenGeometry> {
        *self.0.lock()
    }
}

/// One recorded delegate callback.
#[derive(Clone, Debug, PartialEq)]
pub enum DelegateEvent {
    /// `on_window_detected`.
    Detected(WindowKey),
    /// `on_window_dismissed`.
    Dismissed(WindowKey),
    /// `on_error`.
    Error(DetectionError),
    /// `on_state_changed`.
    State(MonitoringState, MonitoringState),
}

/// Delegate that records every callback.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
    detected: Mutex<Vec<TrackedWindow>>,
}

impl RecordingDelegate {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All callbacks in order.
    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    /// Windows passed to `on_window_detected`.
    pub fn detected(&self) -> Vec<TrackedWindow> {
        self.detected.lock().clone()
    }

    /// Keys passed to `on_window_dismissed`.
    pub fn dismissed(&self) -> Vec<WindowKey> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::Dismissed(k) => Some(*k),
                _ => None,
            })
            .collect()
    }

    /// Errors passed to `on_error`.
    pub fn errors(&self) -> Vec<DetectionError> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    /// True if `event` was recorded.
    pub fn contains(&self, event: &DelegateEvent) -> bool {
        self.events.lock().iter().any(|e| e == event)
    }
}

impl MonitorDelegate for RecordingDelegate {
    fn on_window_detected(&self, window: &TrackedWindow) {
        self.events.lock().push(DelegateEvent::Detected(window.key));
        self.detected.lock().push(window.clone());
    }

    fn on_window_dismissed(&self, window: &TrackedWindow) {
        self.events.lock().push(DelegateEvent::Dismissed(window.key));
    }

    fn on_error(&self, error: &DetectionError) {
        self.events.lock().push(DelegateEvent::Error(error.clone()));
    }

    fn on_state_changed(&self, from: &MonitoringState, to: &MonitoringState) {
        self.events
            .lock()
            .push(DelegateEvent::State(from.clone(), to.clone()));
    }
}

/// Pid used for the fake notification process.
pub const NC_PID: i32 = 501;

/// A complete fake environment with handles to each piece.
#[derive(Clone)]
pub struct FakePlatform {
    /// Window list.
    pub windows: Arc<FakeWindows>,
    /// Accessibility tree.
    pub tree: Arc<FakeAxTree>,
    /// Permission check.
    pub permissions: Arc<FakePermissions>,
    /// Screen geometry.
    pub screen: Arc<FakeScreen>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    /// Trusted environment with a 1920x1080 screen and no windows.
    pub fn new() -> Self {
        Self {
            windows: Arc::new(FakeWindows::new()),
            tree: Arc::new(FakeAxTree::new()),
            permissions: Arc::new(FakePermissions::new(true)),
            screen: Arc::new(FakeScreen::new(Some(ScreenGeometry::simple(
                1920.0, 1080.0,
            )))),
        }
    }

    /// Bundle the fakes for the monitor.
    pub fn platform(&self) -> Platform {
        Platform {
            windows: self.windows.clone(),
            query: self.tree.clone(),
            mutate: self.tree.clone(),
            events: self.tree.clone(),
            permissions: self.permissions.clone(),
            screen: self.screen.clone(),
        }
    }

    /// Add a notification window whose content is a banner-subrole group
    /// with `frame` (AX coordinates). Returns the window key and content
    /// element.
    pub fn add_banner(&self, id: u32, frame: Rect) -> (WindowKey, ElementRef) {
        self.add_notification(id, frame, "AXNotificationCenterBanner")
    }

    /// Like [`add_banner`](Self::add_banner) with an explicit subrole.
    pub fn add_notification(&self, id: u32, frame: Rect, subrole: &str) -> (WindowKey, ElementRef) {
        let desc = WindowDescriptor {
            id,
            pid: NC_PID,
            owner: "NotificationCenter".into(),
            bounds: Rect::new(frame.x - 10.0, frame.y - 10.0, frame.w + 20.0, frame.h + 20.0),
            layer: 23,
        };
        let root = self.tree.add_root(NodeSpec::new().role("AXWindow"));
        let content = self.tree.add_child(
            root,
            NodeSpec::new()
                .role("AXGroup")
                .subrole(subrole)
                .frame(frame.origin(), frame.size()),
        );
        let key = desc.key();
        self.tree.bind_window(key, root);
        self.windows.push(desc);
        (key, content)
    }

    /// Add the notification center tray: a tall window carrying widget content.
    pub fn add_tray(&self, id: u32) -> WindowKey {
        let desc = WindowDescriptor {
            id,
            pid: NC_PID,
            owner: "NotificationCenter".into(),
            bounds: Rect::new(1500.0, 0.0, 420.0, 1080.0),
            layer: 23,
        };
        let root = self.tree.add_root(
            NodeSpec::new()
                .role("AXWindow")
                .frame(Point::new(1500.0, 0.0), Size::new(420.0, 1080.0)),
        );
        self.tree.add_child(
            root,
            NodeSpec::new()
                .identifier("widget-local:com.apple.calendar")
                .frame(Point::new(1520.0, 20.0), Size::new(380.0, 200.0)),
        );
        let key = desc.key();
        self.tree.bind_window(key, root);
        self.windows.push(desc);
        key
    }

    /// Remove a window from the list and invalidate its tree.
    pub fn dismiss(&self, key: WindowKey) {
        self.windows.remove(key);
        let root = self.tree.inner.lock().windows.remove(&key);
        if let Some(root) = root {
            self.tree.kill(root);
        }
    }
}
