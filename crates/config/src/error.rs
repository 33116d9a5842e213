//! Error types for settings loading and validation.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading, parsing, or validating a settings file.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// RON parse error with a concrete line/column location and excerpt.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
        /// Rendered excerpt including a caret at the error location.
        excerpt: String,
    },
    #[error("{field}: {message}")]
    /// A value parsed but is out of range or otherwise unusable.
    Validation {
        /// Optional path associated with the validation error.
        path: Option<PathBuf>,
        /// Dotted name of the offending field.
        field: String,
        /// Human-readable error message.
        message: String,
    },
    #[error("{0}")]
    /// Settings could not be rendered back to RON.
    Render(String),
}

impl Error {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {message}", p.display()),
                None => format!("Read error: {message}"),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
                excerpt,
            } => match path {
                Some(p) => format!(
                    "Settings parse error at {}:{line}:{col}\n{message}\n{excerpt}",
                    p.display()
                ),
                None => format!(
                    "Settings parse error at line {line}, column {col}\n{message}\n{excerpt}"
                ),
            },
            Self::Validation {
                path,
                field,
                message,
            } => match path {
                Some(p) => format!("Invalid setting in {}\n{field}: {message}", p.display()),
                None => format!("Invalid setting\n{field}: {message}"),
            },
            Self::Render(message) => format!("Could not render settings: {message}"),
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                path.as_deref()
            }
            Self::Render(_) => None,
        }
    }

    /// Attach `at` to an error produced from an in-memory source.
    pub fn with_path(mut self, at: &Path) -> Self {
        match &mut self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                *path = Some(at.to_path_buf());
            }
            Self::Render(_) => {}
        }
        self
    }

    /// Validation failure on `field`.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            path: None,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Build a short excerpt ending one line after `line_no`, with a caret under `col_no`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let first = max(1, line_no.saturating_sub(2));
    let last = min(lines.len(), line_no + 1);

    let mut out = String::new();
    for n in first..=last {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let gutter = format!(" {n:>4} | ");
        let _ignored = writeln!(out, "{gutter}{text}");
        if n == line_no {
            let pad = gutter.len() + col_no.saturating_sub(1);
            let _ignored = writeln!(out, "{}^", " ".repeat(pad));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_column() {
        let src = "(\n  anchor: Nowhere,\n)";
        let ex = excerpt_at(src, 2, 11);
        let lines: Vec<&str> = ex.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("anchor: Nowhere,"));
        // gutter is 8 columns wide
        assert_eq!(lines[2].find('^'), Some(8 + 10));
    }

    #[test]
    fn pretty_includes_path_and_field() {
        let e = Error::invalid("timing.poll_interval", "must be positive")
            .with_path(Path::new("/tmp/x.ron"));
        let s = e.pretty();
        assert!(s.contains("/tmp/x.ron"));
        assert!(s.contains("timing.poll_interval: must be positive"));
        assert_eq!(e.path(), Some(Path::new("/tmp/x.ron")));
    }
}
