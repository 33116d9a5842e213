//! Runtime tunables for the monitor and coordinator.

use std::time::Duration;

use crate::{
    calculator::{DEFAULT_EXTRA_BOTTOM_PADDING, PaddingConfig},
    locator::LocatorCfg,
    widget::DEFAULT_WIDGET_PATTERN,
};

/// Monitor configuration. Defaults match the shipped behaviour.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorCfg {
    /// Poll tick period.
    pub poll_interval: Duration,
    /// Minimum spacing between poll-driven passes.
    pub throttle: Duration,
    /// Coalescing window for accessibility events.
    pub debounce: Duration,
    /// Consecutive enumeration failures tolerated before entering the error state.
    pub failure_threshold: u32,
    /// Age after which a tracked entry is revalidated.
    pub stale_after: Duration,
    /// Passes a window may fail to resolve before it is given up on.
    pub locate_attempts: u32,
    /// Padding by anchor class.
    pub padding: PaddingConfig,
    /// Extra bottom padding above the Dock.
    pub extra_bottom: f64,
    /// Locator tunables.
    pub locator: LocatorCfg,
    /// Identifier pattern for widget panels.
    pub widget_pattern: String,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            throttle: Duration::from_millis(200),
            debounce: Duration::from_millis(500),
            failure_threshold: 5,
            stale_after: Duration::from_secs(30),
            locate_attempts: 3,
            padding: PaddingConfig::default(),
            extra_bottom: DEFAULT_EXTRA_BOTTOM_PADDING,
            locator: LocatorCfg::default(),
            widget_pattern: DEFAULT_WIDGET_PATTERN.to_string(),
        }
    }
}
