use std::path::Path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {file}: {message}")]
    Xml { file: String, message: String },

    #[error("no known namespace matched {file}")]
    UnresolvedNamespace { file: String },

    #[error("directory not found: {0}")]
    MissingDirectory(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("document rendering failed: {0}")]
    Render(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl ReportError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// True for failures scoped to one input file; the batch keeps going after these.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            ReportError::Io { .. } | ReportError::Xml { .. } | ReportError::UnresolvedNamespace { .. }
        )
    }
}
