//! Coordinator actor: owns a [`Monitor`] on one task and drives its passes.
//!
//! Three trigger sources feed the actor: a poll ticker (throttled), the
//! accessibility observer stream (debounced, leading edge plus one trailing
//! pass), and commands from [`CoordinatorHandle`]s. Passes never overlap
//! because everything runs inside one `select!` loop.

use std::{collections::BTreeMap, future};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::{DetectionError, Result},
    model::{Anchor, FilterCriteria, TrackedWindow},
    monitor::{Monitor, MonitorStatus, PassReport, Trigger},
    platform::{AxSignal, Subscription},
    schedule::{Debouncer, Throttle},
    state::MonitoringState,
};

/// Buffered pass reports per subscriber.
const REPORT_BUFFER: usize = 64;

/// Cheap, clonable handle to a running coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    /// Command channel.
    tx: mpsc::UnboundedSender<Command>,
    /// Report fan-out.
    reports: broadcast::Sender<PassReport>,
    /// Shutdown signal.
    token: CancellationToken,
}

impl CoordinatorHandle {
    /// Receive a copy of every completed pass report.
    pub fn subscribe(&self) -> broadcast::Receiver<PassReport> {
        self.reports.subscribe()
    }

    /// Start monitoring and run the first pass immediately.
    pub async fn start(&self, anchor: Anchor, filter: FilterCriteria) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Start {
            anchor,
            filter,
            respond: tx,
        })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Stop monitoring: the poll tick goes idle and observer registrations
    /// are released. The actor keeps running until [`shutdown`](Self::shutdown).
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stop { respond: tx })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Suspend passes.
    pub async fn pause(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Pause { respond: tx })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Resume passes and re-evaluate every tracked window.
    pub async fn resume(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Resume { respond: tx })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Change the anchor and reposition tracked windows.
    pub async fn update_anchor(&self, anchor: Anchor) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::UpdateAnchor {
            anchor,
            respond: tx,
        })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Run one pass now, bypassing throttle and debounce.
    pub async fn run_pass(&self) -> Result<Option<PassReport>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::RunPass { respond: tx })?;
        rx.await.unwrap_or(Err(DetectionError::Closed))
    }

    /// Tracked windows, ordered by key.
    pub async fn snapshot(&self) -> Vec<TrackedWindow> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Snapshot { respond: tx });
        rx.await.unwrap_or_default()
    }

    /// Diagnostic summary, or `None` once the coordinator has exited.
    pub async fn status(&self) -> Option<MonitorStatus> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Status { respond: tx });
        rx.await.ok()
    }

    /// Ask the actor to exit. Observer registrations are dropped on the way out.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// True once [`shutdown`](Self::shutdown) has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| DetectionError::Closed)
    }
}

/// Coordinator constructor.
pub struct Coordinator;

impl Coordinator {
    /// Spawn the actor on the current Tokio runtime and return a handle.
    pub fn spawn(monitor: Monitor) -> CoordinatorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reports, _) = broadcast::channel(REPORT_BUFFER);
        let token = CancellationToken::new();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let actor = Actor::new(monitor, reports.clone(), signal_tx);
        tokio::spawn(actor.run(rx, signal_rx, token.clone()));
        CoordinatorHandle { tx, reports, token }
    }
}

/// Requests from handles to the actor.
enum Command {
    /// Begin monitoring.
    Start {
        anchor: Anchor,
        filter: FilterCriteria,
        respond: oneshot::Sender<Result<()>>,
    },
    /// Stop monitoring.
    Stop {
        respond: oneshot::Sender<Result<()>>,
    },
    /// Suspend passes.
    Pause {
        respond: oneshot::Sender<Result<()>>,
    },
    /// Resume after a pause.
    Resume {
        respond: oneshot::Sender<Result<()>>,
    },
    /// Change the anchor and re-evaluate.
    UpdateAnchor {
        anchor: Anchor,
        respond: oneshot::Sender<Result<()>>,
    },
    /// Run one pass now.
    RunPass {
        respond: oneshot::Sender<Result<Option<PassReport>>>,
    },
    /// Tracked windows.
    Snapshot {
        respond: oneshot::Sender<Vec<TrackedWindow>>,
    },
    /// Monitor status.
    Status {
        respond: oneshot::Sender<MonitorStatus>,
    },
}

/// Actor-owned state.
struct Actor {
    /// The engine.
    monitor: Monitor,
    /// Report fan-out.
    reports: broadcast::Sender<PassReport>,
    /// Poll spacing.
    throttle: Throttle,
    /// Event coalescing.
    debounce: Debouncer,
    /// Live observer registrations by pid.
    subscriptions: BTreeMap<i32, Box<dyn Subscription>>,
    /// Sender handed to observers.
    signal_tx: mpsc::UnboundedSender<AxSignal>,
}

impl Actor {
    fn new(
        monitor: Monitor,
        reports: broadcast::Sender<PassReport>,
        signal_tx: mpsc::UnboundedSender<AxSignal>,
    ) -> Self {
        let throttle = Throttle::new(monitor.cfg().throttle);
        let debounce = Debouncer::new(monitor.cfg().debounce);
        Self {
            monitor,
            reports,
            throttle,
            debounce,
            subscriptions: BTreeMap::new(),
            signal_tx,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<AxSignal>,
        token: CancellationToken,
    ) {
        let mut poll = time::interval(self.monitor.cfg().poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let deadline = self.debounce.deadline();
            let polling = self.monitor.state().is_active();
            tokio::select! {
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                Some(signal) = signals.recv() => {
                    trace!(?signal, "ax signal");
                    if self.debounce.on_event(Instant::now()) {
                        let _ = self.pass(Trigger::AxEvent).await;
                    }
                }
                _ = poll.tick(), if polling => {
                    if self.throttle.ready(Instant::now()) {
                        let _ = self.pass(Trigger::Poll).await;
                    }
                }
                () = sleep_until(deadline), if deadline.is_some() => {
                    if self.debounce.on_deadline(Instant::now()) {
                        let _ = self.pass(Trigger::Debounced).await;
                    }
                }
            }
        }
        self.subscriptions.clear();
        if self.monitor.state().is_active() || *self.monitor.state() == MonitoringState::Paused {
            let _ = self.monitor.stop();
        }
        debug!("coordinator exited");
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start {
                anchor,
                filter,
                respond,
            } => {
                let res = self.monitor.start(anchor, filter);
                let res = match res {
                    Ok(()) => {
                        self.debounce.reset();
                        self.pass(Trigger::Start).await.map(|_| ())
                    }
                    Err(e) => Err(e),
                };
                let _ = respond.send(res);
            }
            Command::Stop { respond } => {
                let res = self.monitor.stop();
                self.debounce.reset();
                self.subscriptions.clear();
                let _ = respond.send(res);
            }
            Command::Pause { respond } => {
                let res = self.monitor.pause();
                self.debounce.reset();
                let _ = respond.send(res);
            }
            Command::Resume { respond } => {
                let res = match self.monitor.resume() {
                    Ok(()) => self.pass(Trigger::Resume).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                let _ = respond.send(res);
            }
            Command::UpdateAnchor { anchor, respond } => {
                self.monitor.update_anchor(anchor);
                let res = self.pass(Trigger::AnchorChanged).await.map(|_| ());
                let _ = respond.send(res);
            }
            Command::RunPass { respond } => {
                let res = self.pass(Trigger::Manual).await;
                let _ = respond.send(res);
            }
            Command::Snapshot { respond } => {
                let _ = respond.send(self.monitor.snapshot());
            }
            Command::Status { respond } => {
                let _ = respond.send(self.monitor.status());
            }
        }
    }

    /// Run a pass, publish its report and refresh observer registrations.
    async fn pass(&mut self, trigger: Trigger) -> Result<Option<PassReport>> {
        let res = self.monitor.run_pass(trigger).await;
        self.throttle.note(Instant::now());
        match &res {
            Ok(Some(report)) => {
                let _ = self.reports.send(report.clone());
                self.sync_subscriptions();
            }
            Ok(None) => {}
            Err(e) => {
                warn!(trigger = %trigger, error = %e, "pass failed");
                self.debounce.reset();
                self.subscriptions.clear();
            }
        }
        res
    }

    /// Observe exactly the processes that own notification surfaces.
    fn sync_subscriptions(&mut self) {
        let wanted = self.monitor.surface_pids().clone();
        self.subscriptions.retain(|pid, _| wanted.contains(pid));
        for pid in wanted {
            if self.subscriptions.contains_key(&pid) {
                continue;
            }
            match self
                .monitor
                .platform()
                .events
                .subscribe(pid, self.signal_tx.clone())
            {
                Ok(sub) => {
                    debug!(pid, "observing notification process");
                    self.subscriptions.insert(pid, sub);
                }
                Err(e) => warn!(pid, error = %e, "observer registration failed; polling only"),
            }
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => time::sleep_until(d).await,
        None => future::pending().await,
    }
}
