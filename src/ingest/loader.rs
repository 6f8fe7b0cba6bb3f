//! Loading input records from JSON or JSON Lines.
//!
//! The format is detected from the first non-whitespace character: `[` means
//! a JSON array, anything else is read as one record per line.

use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::UsageEvent;

/// Errors while reading input records.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON array in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid record in {path:?} on line {line}: {source}")]
    Line {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl IngestError {
    /// The input the error came from.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } | Self::Line { path, .. } => path,
        }
    }
}

/// Origin reported for documents parsed from memory.
const INLINE_ORIGIN: &str = "<inline>";

/// Parse records from an in-memory document.
pub fn parse_records<T: DeserializeOwned>(content: &str) -> Result<Vec<T>, IngestError> {
    parse_from(content, Path::new(INLINE_ORIGIN))
}

fn parse_from<T: DeserializeOwned>(content: &str, origin: &Path) -> Result<Vec<T>, IngestError> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|source| IngestError::Json {
            path: origin.to_path_buf(),
            source,
        });
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| IngestError::Line {
                path: origin.to_path_buf(),
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Read records from a reader.
pub fn read_records<T: DeserializeOwned, R: Read>(
    mut reader: R,
    origin: &Path,
) -> Result<Vec<T>, IngestError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|source| IngestError::Io {
            path: origin.to_path_buf(),
            source,
        })?;
    parse_from(&content, origin)
}

/// Load records from a file. A path of `-` reads standard input.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    if path == Path::new("-") {
        return read_records(std::io::stdin().lock(), path);
    }

    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(file, path)?;
    tracing::debug!(path = %path.display(), count = records.len(), "loaded records");
    Ok(records)
}

/// Load usage events from a file.
pub fn load_usage_events(path: &Path) -> Result<Vec<UsageEvent>, IngestError> {
    load_records(path)
}
