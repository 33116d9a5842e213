//! The `run` daemon.

use std::sync::Arc;

use notimover_engine::{
    Coordinator, DetectionError, Monitor, MonitorDelegate, MonitoringState, PassReport,
    TrackedWindow,
};
use tokio::{runtime::Builder, signal, sync::broadcast};
use tracing::{debug, error, info, warn};

use crate::{
    cli::RunArgs,
    error::{Error, Result},
};

/// Delegate that turns monitor callbacks into log lines.
struct LogDelegate;

impl MonitorDelegate for LogDelegate {
    fn on_window_detected(&self, w: &TrackedWindow) {
        info!(
            key = %w.key,
            kind = %w.kind,
            strategy = %w.strategy,
            position = %w.position,
            size = %w.size,
            "notification detected"
        );
    }

    fn on_window_dismissed(&self, w: &TrackedWindow) {
        info!(
            key = %w.key,
            repositioned = w.has_been_repositioned,
            "notification dismissed"
        );
    }

    fn on_error(&self, e: &DetectionError) {
        error!(error = %e, "monitor failed");
    }

    fn on_state_changed(&self, from: &MonitoringState, to: &MonitoringState) {
        debug!(%from, %to, "monitor state");
    }
}

/// Log a pass summary unless nothing happened.
fn log_report(report: &PassReport) {
    if report.is_quiet() {
        return;
    }
    info!(
        trigger = %report.trigger,
        detected = report.detected.len(),
        dismissed = report.dismissed.len(),
        repositioned = report.repositioned.len(),
        reevaluated = report.reevaluated.len(),
        panel = ?report.panel_event,
        "pass"
    );
    for s in &report.skipped {
        debug!(key = %s.key, reason = %s.reason, "skipped");
    }
    if let Some(e) = &report.error {
        warn!(trigger = %report.trigger, error = %e, "pass failed");
    }
}

/// Load settings, start the coordinator and run until Ctrl-C.
///
/// Uses a current-thread runtime so the coordinator (and with it AppKit
/// screen queries) runs on the main thread.
pub fn run(args: &RunArgs) -> Result<()> {
    let (settings, source) = config::load(args.config.as_deref())?;
    let mut engine = settings.engine();
    if let Some(anchor) = args.anchor {
        engine.anchor = anchor;
    }
    if let Some(poll) = args.poll {
        engine.monitor.poll_interval = poll;
    }
    match &source {
        Some(p) => info!(path = %p.display(), anchor = %engine.anchor, "settings loaded"),
        None => info!(anchor = %engine.anchor, "using default settings"),
    }

    let status = permissions::check_permissions();
    if !status.ready() {
        return Err(Error::PermissionDenied);
    }

    let rt = Builder::new_current_thread().enable_all().build()?;
    rt.block_on(async move {
        let platform = mac_notify_ax::platform()?;
        let monitor = Monitor::new(platform, engine.monitor, Arc::new(LogDelegate))?;
        let handle = Coordinator::spawn(monitor);
        let mut reports = handle.subscribe();
        handle.start(engine.anchor, engine.filter).await?;
        info!("monitoring; press Ctrl-C to stop");

        loop {
            tokio::select! {
                res = signal::ctrl_c() => {
                    res?;
                    info!("interrupted");
                    break;
                }
                msg = reports.recv() => match msg {
                    Ok(report) => log_report(&report),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "report stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        if let Some(status) = handle.status().await {
            info!(
                passes = status.passes,
                tracked = status.tracked,
                state = %status.state,
                "stopping"
            );
        }
        handle.stop().await.or_else(|e| match e {
            DetectionError::Closed => Ok(()),
            other => Err(other),
        })?;
        handle.shutdown();
        Ok(())
    })
}
