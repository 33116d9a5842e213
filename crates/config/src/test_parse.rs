use std::{env, fs, path::Path, process, time::Duration};

use notimover_engine::{Anchor, NotificationKind};

use crate::*;

#[test]
fn empty_file_is_defaults() {
    let s = load_from_str("()", None).unwrap();
    assert_eq!(s, Settings::default());
}

#[test]
fn partial_settings_keep_other_defaults() {
    let src = r#"(
        anchor: TopLeft,
        timing: (poll_interval: "1s"),
        filter: (allowed_kinds: [Banner]),
    )"#;
    let s = load_from_str(src, None).unwrap();
    assert_eq!(s.anchor, Anchor::TopLeft);
    assert_eq!(s.timing.poll_interval, Interval::secs(1));
    assert_eq!(s.timing.debounce, Timing::default().debounce);
    assert_eq!(s.filter.allowed_kinds.len(), 1);
    assert!(s.filter.allowed_kinds.contains(&NotificationKind::Banner));
    assert_eq!(s.filter.max_width, 800.0);

    let e = s.engine();
    assert_eq!(e.monitor.poll_interval, Duration::from_secs(1));
    assert_eq!(e.anchor, Anchor::TopLeft);
}

#[test]
fn parse_error_has_location() {
    let src = "(\n    anchor: Sideways,\n)";
    let err = load_from_str(src, Some(Path::new("cfg.ron"))).unwrap_err();
    match &err {
        Error::Parse { line, path, .. } => {
            assert_eq!(*line, 2);
            assert_eq!(path.as_deref(), Some(Path::new("cfg.ron")));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(err.pretty().contains("cfg.ron:2:"));
}

#[test]
fn unknown_field_rejected() {
    let err = load_from_str("(ancor: TopLeft)", None).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn bad_duration_rejected() {
    let err = load_from_str(r#"(timing: (debounce: "soon"))"#, None).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(err.to_string().contains("soon"));
}

#[test]
fn validation_runs_after_parse() {
    let err = load_from_str("(failure_threshold: 0)", Some(Path::new("a.ron"))).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation { ref field, ref path, .. }
            if field == "failure_threshold" && path.as_deref() == Some(Path::new("a.ron"))
    ));
}

#[test]
fn default_rendering_reloads() {
    let text = Settings::default().to_ron().unwrap();
    assert!(text.contains("poll_interval: \"200ms\""));
    let back = load_from_str(&text, None).unwrap();
    assert_eq!(back, Settings::default());
}

#[test]
fn explicit_missing_path_is_read_error() {
    let p = Path::new("/nonexistent/notimover/config.ron");
    assert!(matches!(resolve_config_path(Some(p)), Err(Error::Read { .. })));
}

#[test]
fn load_from_disk() {
    let dir = env::temp_dir().join(format!("notimover-config-{}", process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.ron");
    fs::write(&path, "(anchor: DeadCenter)").unwrap();
    let (s, from) = load(Some(&path)).unwrap();
    assert_eq!(s.anchor, Anchor::DeadCenter);
    assert_eq!(from.as_deref(), Some(path.as_path()));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn default_path_shape() {
    let p = default_config_path();
    assert!(p.ends_with(".config/notimover/config.ron"));
}
