//! Diagnostic commands: `windows` and `permissions`.

use notimover_engine::{
    ElementLocator, FilterCriteria, LocateReport, Platform, Rect, ScreenGeometry, WindowDescriptor,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    cli::WindowsArgs,
    error::{Error, Result},
};

/// One notification-owner window and what the locator made of it.
#[derive(Debug, Clone, Serialize)]
pub struct WindowRow {
    /// Owning process.
    pub pid: i32,
    /// Window number.
    pub id: u32,
    /// Owning application name.
    pub owner: String,
    /// Window bounds (AX coordinates).
    pub bounds: Rect,
    /// Window layer.
    pub layer: i32,
    /// Passes the coarse size filter.
    pub candidate: bool,
    /// Winning strategy, if any.
    pub strategy: Option<String>,
    /// Classification of the located content.
    pub kind: Option<String>,
    /// Frame of the located content.
    pub content: Option<Rect>,
    /// Strategies tried in order.
    pub tried: Vec<String>,
    /// Elements visited during the search.
    pub visited: usize,
    /// Why no content was located.
    pub note: Option<String>,
}

impl WindowRow {
    /// Row for `w` before any accessibility lookup.
    fn new(w: &WindowDescriptor, candidate: bool) -> Self {
        Self {
            pid: w.pid,
            id: w.id,
            owner: w.owner.clone(),
            bounds: w.bounds,
            layer: w.layer,
            candidate,
            strategy: None,
            kind: None,
            content: None,
            tried: Vec::new(),
            visited: 0,
            note: None,
        }
    }

    /// Fill in the locator outcome.
    fn apply(&mut self, report: &LocateReport) {
        self.tried = report.tried().iter().map(ToString::to_string).collect();
        self.visited = report.visited;
        match &report.located {
            Some(l) => {
                self.strategy = Some(l.strategy.to_string());
                self.kind = Some(l.kind.to_string());
                self.content = Some(l.frame);
            }
            None => self.note = Some("no strategy matched".into()),
        }
    }
}

/// Inspect every notification-owner window on `platform`.
pub fn inspect(
    platform: &Platform,
    filter: &FilterCriteria,
    locator: &ElementLocator,
) -> Result<Vec<WindowRow>> {
    let screen: Option<ScreenGeometry> = platform.screen.notification_screen();
    let mut rows = Vec::new();
    for w in platform.windows.list_windows()? {
        if !filter.owner_matches(&w.owner) {
            continue;
        }
        let mut row = WindowRow::new(&w, filter.window_passes(&w.bounds));
        match platform.query.window_element(&w) {
            Ok(Some(root)) => match locator.locate_report(root, filter, screen.as_ref()) {
                Ok(report) => row.apply(&report),
                Err(e) => row.note = Some(format!("locate failed: {e}")),
            },
            Ok(None) => row.note = Some("no accessibility window".into()),
            Err(e) => row.note = Some(format!("window element: {e}")),
        }
        debug!(pid = row.pid, id = row.id, strategy = ?row.strategy, "inspected");
        rows.push(row);
    }
    rows.sort_by_key(|r| (r.pid, r.id));
    Ok(rows)
}

/// Placeholder for absent table cells.
fn opt(v: Option<&str>) -> &str {
    v.unwrap_or("-")
}

/// Human-readable table.
pub fn render_table(rows: &[WindowRow]) -> String {
    if rows.is_empty() {
        return "no notification windows on screen\n".to_string();
    }
    let mut out = format!(
        "{:<12} {:<22} {:<26} {:<14} {:<12} {}\n",
        "KEY", "OWNER", "BOUNDS", "STRATEGY", "KIND", "NOTE"
    );
    for r in rows {
        let key = format!("{}:{}", r.pid, r.id);
        let bounds = format!("{}", r.bounds);
        let note = match (&r.note, r.candidate) {
            (Some(n), _) => n.clone(),
            (None, false) => "below size floor".into(),
            (None, true) => String::new(),
        };
        out.push_str(&format!(
            "{:<12} {:<22} {:<26} {:<14} {:<12} {}\n",
            key,
            r.owner,
            bounds,
            opt(r.strategy.as_deref()),
            opt(r.kind.as_deref()),
            note
        ));
    }
    out
}

/// The `windows` command.
pub fn windows(args: &WindowsArgs) -> Result<()> {
    let (settings, _) = config::load(args.config.as_deref())?;
    let engine = settings.engine();
    if !permissions::accessibility_ok() {
        return Err(Error::PermissionDenied);
    }
    let platform = mac_notify_ax::platform()?;
    let locator = ElementLocator::new(platform.query.clone(), engine.monitor.locator.clone());
    let rows = inspect(&platform, &engine.filter, &locator)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

/// The `permissions` command.
pub fn permissions() {
    let status = permissions::check_permissions();
    println!("Accessibility:    {}", label(status.accessibility_ok));
    println!("Screen Recording: {}", label(status.screen_recording_ok));
    if !status.ready() {
        println!();
        println!("notimover needs Accessibility access to move notifications.");
        println!("Grant it in System Settings > Privacy & Security > Accessibility.");
    }
}

/// Permission label.
fn label(ok: bool) -> &'static str {
    if ok { "granted" } else { "missing" }
}

#[cfg(test)]
mod tests {
    use notimover_engine::{LocatorCfg, test_support::FakePlatform};

    use super::*;

    #[test]
    fn inspect_reports_located_banner() {
        let fake = FakePlatform::new();
        let (key, _) = fake.add_banner(3, Rect::new(1500.0, 40.0, 360.0, 90.0));
        let platform = fake.platform();
        let locator = ElementLocator::new(platform.query.clone(), LocatorCfg::default());
        let rows = inspect(&platform, &FilterCriteria::default(), &locator).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!((row.pid, row.id), (key.pid(), key.number()));
        assert!(row.candidate);
        assert_eq!(row.strategy.as_deref(), Some("subrole"));
        assert_eq!(row.kind.as_deref(), Some("banner"));
        assert!(row.note.is_none());
    }

    #[test]
    fn table_marks_missing_values() {
        let w = WindowDescriptor {
            id: 7,
            pid: 42,
            owner: "NotificationCenter".into(),
            bounds: Rect::new(0.0, 0.0, 50.0, 20.0),
            layer: 0,
        };
        let table = render_table(&[WindowRow::new(&w, false)]);
        assert!(table.contains("42:7"));
        assert!(table.contains("below size floor"));
    }
}
