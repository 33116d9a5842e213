//! The settings file schema.
//!
//! Every field has a default, so an empty `()` file is a valid settings file
//! and any subset of fields may be given. Durations are written as
//! human-readable strings (`"200ms"`, `"30s"`).

use std::{fmt, time::Duration};

use notimover_engine::{Anchor, FilterCriteria, LocatorCfg, MonitorCfg, PaddingConfig};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::Error;

/// A duration written as a humantime string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval(pub Duration);

impl Interval {
    /// Interval of `ms` milliseconds.
    pub const fn millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Interval of `s` seconds.
    pub const fn secs(s: u64) -> Self {
        Self(Duration::from_secs(s))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(raw.trim())
            .map(Self)
            .map_err(|e| de::Error::custom(format!("invalid duration {raw:?}: {e}")))
    }
}

/// Scheduling intervals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// Poll tick period.
    pub poll_interval: Interval,
    /// Minimum spacing between poll-driven passes.
    pub throttle: Interval,
    /// Coalescing window for accessibility events.
    pub debounce: Interval,
    /// Age after which a tracked entry is revalidated.
    pub stale_after: Interval,
}

impl Default for Timing {
    fn default() -> Self {
        let m = MonitorCfg::default();
        Self {
            poll_interval: Interval(m.poll_interval),
            throttle: Interval(m.throttle),
            debounce: Interval(m.debounce),
            stale_after: Interval(m.stale_after),
        }
    }
}

/// Engine configuration derived from [`Settings`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Initial anchor.
    pub anchor: Anchor,
    /// Candidate filter.
    pub filter: FilterCriteria,
    /// Monitor tunables.
    pub monitor: MonitorCfg,
}

/// Top-level settings file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where notifications are moved to.
    pub anchor: Anchor,
    /// Scheduling intervals.
    pub timing: Timing,
    /// Consecutive enumeration failures tolerated before the monitor errors out.
    pub failure_threshold: u32,
    /// Passes a window may fail to resolve before it is given up on.
    pub locate_attempts: u32,
    /// Candidate filter.
    pub filter: FilterCriteria,
    /// Padding from the screen edges.
    pub padding: PaddingConfig,
    /// Extra space kept above the Dock for bottom anchors.
    pub extra_bottom: f64,
    /// Element search tunables.
    pub locator: LocatorCfg,
    /// Identifier regex recognising the widget panel.
    pub widget_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        let m = MonitorCfg::default();
        Self {
            anchor: Anchor::default(),
            timing: Timing::default(),
            failure_threshold: m.failure_threshold,
            locate_attempts: m.locate_attempts,
            filter: FilterCriteria::default(),
            padding: m.padding,
            extra_bottom: m.extra_bottom,
            locator: m.locator,
            widget_pattern: m.widget_pattern,
        }
    }
}

fn positive(field: &str, v: Interval) -> Result<(), Error> {
    if v.0.is_zero() {
        return Err(Error::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn non_negative(field: &str, v: f64) -> Result<(), Error> {
    if !v.is_finite() || v < 0.0 {
        return Err(Error::invalid(field, format!("must be a finite value >= 0 (got {v})")));
    }
    Ok(())
}

fn ordered(min_field: &str, min: f64, max_field: &str, max: f64) -> Result<(), Error> {
    non_negative(min_field, min)?;
    non_negative(max_field, max)?;
    if min > max {
        return Err(Error::invalid(
            min_field,
            format!("{min} exceeds {max_field} ({max})"),
        ));
    }
    Ok(())
}

impl Settings {
    /// Check value ranges and the widget pattern.
    pub fn validate(&self) -> Result<(), Error> {
        positive("timing.poll_interval", self.timing.poll_interval)?;
        positive("timing.debounce", self.timing.debounce)?;
        positive("timing.stale_after", self.timing.stale_after)?;
        if self.failure_threshold == 0 {
            return Err(Error::invalid("failure_threshold", "must be at least 1"));
        }
        if self.locate_attempts == 0 {
            return Err(Error::invalid("locate_attempts", "must be at least 1"));
        }
        let f = &self.filter;
        ordered("filter.min_width", f.min_width, "filter.max_width", f.max_width)?;
        ordered("filter.min_height", f.min_height, "filter.max_height", f.max_height)?;
        if f.allowed_kinds.iter().any(|k| !k.is_repositionable()) {
            return Err(Error::invalid(
                "filter.allowed_kinds",
                "only Banner and Alert can be repositioned",
            ));
        }
        non_negative("padding.edge", self.padding.edge)?;
        non_negative("padding.center", self.padding.center)?;
        non_negative("extra_bottom", self.extra_bottom)?;
        if self.locator.max_depth == 0 || self.locator.max_nodes == 0 {
            return Err(Error::invalid("locator", "max_depth and max_nodes must be at least 1"));
        }
        Regex::new(&self.widget_pattern)
            .map_err(|e| Error::invalid("widget_pattern", e.to_string()))?;
        Ok(())
    }

    /// Split into the engine's configuration types.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            anchor: self.anchor,
            filter: self.filter.clone(),
            monitor: MonitorCfg {
                poll_interval: self.timing.poll_interval.0,
                throttle: self.timing.throttle.0,
                debounce: self.timing.debounce.0,
                failure_threshold: self.failure_threshold,
                stale_after: self.timing.stale_after.0,
                locate_attempts: self.locate_attempts,
                padding: self.padding,
                extra_bottom: self.extra_bottom,
                locator: self.locator.clone(),
                widget_pattern: self.widget_pattern.clone(),
            },
        }
    }

    /// Pretty RON rendering, suitable as a starting settings file.
    pub fn to_ron(&self) -> Result<String, Error> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(false);
        ron::ser::to_string_pretty(self, pretty).map_err(|e| Error::Render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_engine() {
        let e = Settings::default().engine();
        assert_eq!(e.monitor, MonitorCfg::default());
        assert_eq!(e.filter, FilterCriteria::default());
        assert_eq!(e.anchor, Anchor::BottomRight);
    }

    #[test]
    fn defaults_validate() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn zero_poll_rejected() {
        let mut s = Settings::default();
        s.timing.poll_interval = Interval::millis(0);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "timing.poll_interval"));
    }

    #[test]
    fn zero_throttle_allowed() {
        let mut s = Settings::default();
        s.timing.throttle = Interval::millis(0);
        s.validate().unwrap();
    }

    #[test]
    fn inverted_bounds_rejected() {
        let mut s = Settings::default();
        s.filter.min_height = 700.0;
        let err = s.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "filter.min_height"));
    }

    #[test]
    fn bad_widget_pattern_rejected() {
        let s = Settings {
            widget_pattern: "(".into(),
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(Error::Validation { ref field, .. }) if field == "widget_pattern"
        ));
    }

    #[test]
    fn interval_display_is_humantime() {
        assert_eq!(Interval::millis(200).to_string(), "200ms");
        assert_eq!(Interval::secs(30).to_string(), "30s");
    }
}
