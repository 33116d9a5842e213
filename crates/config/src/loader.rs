//! Read and parse settings files.

use std::{fs, path::Path};

use tracing::debug;

use crate::{Error, Settings, error::excerpt_at};

/// Parse and validate settings from RON source text.
pub fn load_from_str(source: &str, path: Option<&Path>) -> Result<Settings, Error> {
    let parsed = ron::from_str::<Settings>(source).map_err(|e| {
        let line = e.span.start.line;
        let col = e.span.start.col;
        Error::Parse {
            path: None,
            line,
            col,
            message: e.code.to_string(),
            excerpt: excerpt_at(source, line, col),
        }
    });
    let attach = |e: Error| match path {
        Some(p) => e.with_path(p),
        None => e,
    };
    let settings = parsed.map_err(attach)?;
    settings.validate().map_err(attach)?;
    Ok(settings)
}

/// Load settings from a RON file at `path`.
pub fn load_from_path(path: &Path) -> Result<Settings, Error> {
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    let settings = load_from_str(&source, Some(path))?;
    debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}
