//! Command-line interface definitions for notimover.

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;
use notimover_engine::{Anchor, Size};

/// Command-line interface for the `notimover` binary.
#[derive(Parser, Debug)]
#[command(
    name = "notimover",
    about = "Move macOS notification banners to a chosen screen anchor",
    version
)]
pub struct Cli {
    /// Logging controls shared across notimover binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Which command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch for notifications and move them until interrupted.
    Run(RunArgs),
    /// Print where content would be placed for an anchor.
    Position(PositionArgs),
    /// List notification windows and what the locator finds in each.
    Windows(WindowsArgs),
    /// Print the default or effective settings.
    Config(ConfigArgs),
    /// Report permission status.
    Permissions,
}

/// Arguments for `run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Settings file (defaults to ~/.config/notimover/config.ron when present).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the anchor from the settings file.
    #[arg(long, value_parser = parse_anchor, value_name = "ANCHOR")]
    pub anchor: Option<Anchor>,

    /// Override the poll interval, e.g. `250ms`.
    #[arg(long, value_parser = parse_interval, value_name = "DURATION")]
    pub poll: Option<Duration>,
}

/// Arguments for `position`.
#[derive(Args, Debug, Clone)]
pub struct PositionArgs {
    /// Target anchor, e.g. `top-left` or `dead-center`.
    #[arg(long, value_parser = parse_anchor)]
    pub anchor: Anchor,

    /// Screen size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_dims, value_name = "WxH")]
    pub screen: Size,

    /// Content size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_dims, value_name = "WxH")]
    pub content: Size,

    /// Height reserved by the Dock at the bottom of the screen.
    #[arg(long, default_value_t = 0.0, value_name = "N")]
    pub dock: f64,

    /// Padding from the screen edges (defaults depend on the anchor).
    #[arg(long, value_name = "N")]
    pub padding: Option<f64>,
}

/// Arguments for `windows`.
#[derive(Args, Debug, Clone)]
pub struct WindowsArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Settings file providing the filter.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for `config`.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Print the built-in defaults as a settings file.
    #[arg(long, conflicts_with = "path")]
    pub print_default: bool,

    /// Settings file to load and print.
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

/// Parse an anchor name.
fn parse_anchor(s: &str) -> Result<Anchor, String> {
    Anchor::from_str(s).map_err(|e| e.to_string())
}

/// Parse a non-zero duration such as `250ms`.
fn parse_interval(s: &str) -> Result<Duration, String> {
    let d = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if d.is_zero() {
        return Err(format!("interval must be non-zero, got {s:?}"));
    }
    Ok(d)
}

/// Parse `WIDTHxHEIGHT`.
fn parse_dims(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0)
            .ok_or_else(|| format!("invalid dimension {v:?} in {s:?}"))
    };
    Ok(Size::new(parse(w)?, parse(h)?))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dims_parse() {
        assert_eq!(parse_dims("1920x1080").unwrap(), Size::new(1920.0, 1080.0));
        assert_eq!(parse_dims("350X80").unwrap(), Size::new(350.0, 80.0));
        assert!(parse_dims("1920").is_err());
        assert!(parse_dims("0x10").is_err());
        assert!(parse_dims("axb").is_err());
    }

    #[test]
    fn position_args() {
        let cli = Cli::try_parse_from([
            "notimover",
            "position",
            "--anchor",
            "top-left",
            "--screen",
            "1920x1080",
            "--content",
            "300x80",
            "--dock",
            "70",
        ])
        .unwrap();
        let Commands::Position(p) = cli.command else {
            panic!("expected position");
        };
        assert_eq!(p.anchor, Anchor::TopLeft);
        assert_eq!(p.dock, 70.0);
        assert_eq!(p.padding, None);
    }

    #[test]
    fn run_overrides() {
        let cli =
            Cli::try_parse_from(["notimover", "run", "--anchor", "dead-center", "--poll", "1s"])
                .unwrap();
        let Commands::Run(r) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(r.anchor, Some(Anchor::DeadCenter));
        assert_eq!(r.poll, Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_poll_rejected() {
        assert!(Cli::try_parse_from(["notimover", "run", "--poll", "0s"]).is_err());
        assert!(Cli::try_parse_from(["notimover", "run", "--poll", "0ms"]).is_err());
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn bad_anchor_rejected() {
        assert!(Cli::try_parse_from(["notimover", "run", "--anchor", "upstairs"]).is_err());
    }
}
