//! Output sinks: where the finished, ordered records go.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::models::{PublicationList, PublicationRecord};

/// Errors raised while persisting records
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize publications: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives the final record sequence and persists it verbatim
pub trait Sink: Send + Sync {
    fn emit(&self, records: &[PublicationRecord]) -> Result<(), SinkError>;
}

/// Writes `{"items": [...]}` as indented UTF-8 JSON, replacing the file
///
/// The document is written to a temporary file next to the target and then
/// renamed over it, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Sink for JsonFileSink {
    fn emit(&self, records: &[PublicationRecord]) -> Result<(), SinkError> {
        let mut json = PublicationList::new(records.to_vec()).to_pretty_json()?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut file = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.as_file().sync_all().map_err(|e| self.io_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        tracing::debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}
