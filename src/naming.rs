//! Path helpers for derived images.
//!
//! Splitting is done on the last `.` of the whole path string. A path with no
//! `.` has an empty extension and is its own stem; a `.` inside a directory
//! name is treated like any other.

use crate::models::OutputFormat;
use std::path::{Path, PathBuf};

/// Everything before the last `.`, or the whole path when there is none.
pub fn path_without_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(index) => &path[..index],
        None => path,
    }
}

/// Everything after the last `.`, or `""` when there is none.
pub fn extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(index) => &path[index + 1..],
        None => "",
    }
}

/// `<source-without-extension>_<suffix>.<format extension>`
pub fn derived_path(source: &Path, suffix: &str, format: OutputFormat) -> PathBuf {
    let source = source.to_string_lossy();
    PathBuf::from(format!(
        "{}_{}.{}",
        path_without_extension(&source),
        suffix,
        format.extension()
    ))
}
