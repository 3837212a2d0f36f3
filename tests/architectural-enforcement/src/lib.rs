//! Architectural Enforcement Integration Tests
//!
//! Source-level checks over the ChatFlow crates:
//! - The form engine's pure modules stay free of runtime and network crates
//! - Async code in the CLI and core never blocks on std IO
//!
//! The checks live in `tests/`; this library only holds the shared source
//! scanning helpers.

use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .components()
        .collect()
}

/// A line of production source
#[derive(Debug)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// The line with any trailing `//` comment removed
    pub code: String,
    /// Whether the nearest enclosing `fn` is `async`
    pub in_async_fn: bool,
}

/// Collect production lines from every `.rs` file under `dir`
///
/// Everything from a `#[cfg(test)]` attribute onward is treated as test code
/// and skipped, as are doc and line comments.
#[must_use]
pub fn production_lines(dir: &Path) -> Vec<SourceLine> {
    let mut lines = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
    {
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        let mut in_async_fn = false;
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }

            let code = line.split("//").next().unwrap_or(line).to_string();
            if code.contains("fn ") {
                in_async_fn = code.contains("async fn ");
            }

            lines.push(SourceLine {
                path: entry.path().to_path_buf(),
                number: idx + 1,
                code,
                in_async_fn,
            });
        }
    }

    lines
}
