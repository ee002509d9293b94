use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use brinson_core::attribution::ingest::{self, IngestOptions};
use brinson_core::SegmentRecord;

/// Input table formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// A full `AttributionInput` document
    Json,
    /// Delimited text with a header row
    Delimited,
}

impl TableFormat {
    pub fn detect(path: &str) -> Self {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TableFormat::Json,
            _ => TableFormat::Delimited,
        }
    }
}

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Read a delimited segment table (CSV, TSV, ...).
pub fn read_delimited(
    path: &str,
    options: &IngestOptions,
) -> Result<Vec<SegmentRecord>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let segments = ingest::read_segments_from_path(&canonical, options)?;
    Ok(segments)
}

/// Resolve and validate the path, preventing directory traversal.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
