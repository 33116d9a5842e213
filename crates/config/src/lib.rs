//! User settings for notimover.
//!
//! Settings live in a RON file (default `~/.config/notimover/config.ron`).
//! A missing default file is not an error: built-in defaults apply. An
//! explicitly named file must exist.

use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::debug;

mod error;
mod loader;
mod settings;

#[cfg(test)]
mod test_parse;

pub use error::{Error, excerpt_at};
pub use loader::{load_from_path, load_from_str};
pub use settings::{EngineConfig, Interval, Settings, Timing};

/// Preferred settings path (`~/.config/notimover/config.ron`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".config");
    p.push("notimover");
    p.push("config.ron");
    p
}

/// Resolve which settings file applies.
///
/// Policy:
/// 1) Use `explicit` when provided; it must exist.
/// 2) Else use the default path when it exists.
/// 3) Else `None`: run on built-in defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, Error> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Read {
                path: Some(path.to_path_buf()),
                message: "settings file does not exist".to_string(),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }
    let preferred = default_config_path();
    Ok(preferred.exists().then_some(preferred))
}

/// Load settings by the [`resolve_config_path`] policy.
///
/// Returns the settings and the file they came from, if any.
pub fn load(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>), Error> {
    match resolve_config_path(explicit)? {
        Some(path) => Ok((load_from_path(&path)?, Some(path))),
        None => {
            debug!("no settings file; using defaults");
            Ok((Settings::default(), None))
        }
    }
}
