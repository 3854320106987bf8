// components/audio_tools/src/types.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("required tool not found: {0}")]
    ToolNotFound(&'static str),

    #[error("could not extract {what} from {path}")]
    Extraction { path: PathBuf, what: String },

    #[error("io error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command execution failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command returned non-zero exit code: {command}\nStderr: {stderr}")]
    CommandExitCode { command: String, stderr: String },
}

impl ToolError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn extraction(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        ToolError::Extraction {
            path: path.into(),
            what: what.into(),
        }
    }
}

/// Finds the audio files that make up a book
#[async_trait]
pub trait AudioFileLister {
    async fn list_audio_files(&self, directory: &Path) -> Result<Vec<PathBuf>, ToolError>;
}

/// Reads tags and stream properties of a single audio file
#[async_trait]
pub trait MetadataReader {
    /// The file's global tags as an ffmetadata block
    async fn read_raw_metadata(&self, path: &Path) -> Result<String, ToolError>;

    /// Title tag and duration in seconds
    async fn read_title_and_duration(&self, path: &Path) -> Result<(String, f64), ToolError>;
}

/// Encode and mux operations on audio containers
///
/// Operations that modify a container either leave it untouched or replace
/// it completely.
#[async_trait]
pub trait AudioProcessor {
    /// Re-encode every file into `out_dir`, returning the new paths in input order
    async fn transcode(&self, paths: &[PathBuf], out_dir: &Path) -> Result<Vec<PathBuf>, ToolError>;

    /// Join files into a single container inside `out_dir`
    async fn concatenate(&self, paths: &[PathBuf], out_dir: &Path) -> Result<PathBuf, ToolError>;

    async fn embed_metadata(
        &self,
        container: &Path,
        metadata: &str,
        book_title: &str,
    ) -> Result<(), ToolError>;

    /// Replace the global tags of `container` with an ffmetadata block
    async fn write_metadata(&self, container: &Path, metadata: &str) -> Result<(), ToolError>;

    async fn embed_cover(&self, container: &Path, cover: &Path) -> Result<(), ToolError>;

    /// Extract the attached picture of `source` into `work_dir`
    async fn extract_cover(&self, source: &Path, work_dir: &Path) -> Result<PathBuf, ToolError>;

    async fn embed_chapters(&self, container: &Path, chapters: &str) -> Result<(), ToolError>;
}
