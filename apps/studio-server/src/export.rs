// [[MMSS]]/apps/studio-server/src/export.rs
// Purpose: Writes the pretty-printed pipeline document to the export directory.
// Architecture: Infrastructure Helper Layer.
// Dependencies: std::fs, std::path, serde_json

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::serializer::{self, ConfigDocument};

pub const DEFAULT_EXPORT_FILENAME: &str = "mmss_agentic_pipeline.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid export filename: {0}")]
    InvalidFilename(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ExportWriter {
    root: PathBuf,
}

impl ExportWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reduces a requested name to a bare `.json` file name inside the export root.
    pub fn sanitize_filename(requested: Option<&str>) -> Result<String, ExportError> {
        let requested = match requested.map(str::trim) {
            None | Some("") => return Ok(DEFAULT_EXPORT_FILENAME.to_string()),
            Some(name) => name,
        };

        let safe_name = Path::new(requested)
            .file_name()
            .ok_or_else(|| ExportError::InvalidFilename(requested.to_string()))?
            .to_string_lossy()
            .to_string();

        if safe_name.contains("..") || safe_name.starts_with('.') {
            return Err(ExportError::InvalidFilename(requested.to_string()));
        }

        if safe_name.ends_with(".json") {
            Ok(safe_name)
        } else {
            Ok(format!("{}.json", safe_name))
        }
    }

    /// Writes the document and returns the path of the file.
    pub fn write(&self, filename: Option<&str>, document: &ConfigDocument) -> Result<PathBuf, ExportError> {
        let name = Self::sanitize_filename(filename)?;
        let json = serializer::to_pretty_json(document)?;

        fs::create_dir_all(&self.root)?;
        let target_path = self.root.join(&name);
        let mut file = fs::File::create(&target_path)?;
        file.write_all(json.as_bytes())?;

        tracing::info!("Exported pipeline document: {}", target_path.display());
        Ok(target_path)
    }
}
