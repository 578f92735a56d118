use crate::error::IoError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Creates a directory and all of its parents.
pub fn ensure_dir(path: &Path) -> Result<(), IoError> {
    fs::create_dir_all(path).map_err(|source| IoError {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a JSON document with two-space indentation.
///
/// Callers assemble the full document in memory first, so a failed write
/// never leaves a half-reconstructed project behind under a valid name.
pub fn write_json(path: &Path, value: &Value) -> Result<(), IoError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|source| IoError {
        path: path.to_path_buf(),
        source: source.into(),
    })?;
    fs::write(path, rendered).map_err(|source| IoError {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes raw bytes (cover images, referenced media).
pub fn write_bytes(path: &Path, data: &[u8]) -> Result<(), IoError> {
    fs::write(path, data).map_err(|source| IoError {
        path: path.to_path_buf(),
        source,
    })
}
