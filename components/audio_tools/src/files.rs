// components/audio_tools/src/files.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::types::{AudioFileLister, ToolError};

/// Lists audio files below a directory by extension
#[derive(Debug, Clone)]
pub struct WalkdirLister {
    extension: String,
}

impl Default for WalkdirLister {
    fn default() -> Self {
        Self::new("m4a")
    }
}

impl WalkdirLister {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

#[async_trait]
impl AudioFileLister for WalkdirLister {
    async fn list_audio_files(&self, directory: &Path) -> Result<Vec<PathBuf>, ToolError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(directory).follow_links(true) {
            let entry = entry.map_err(|e| {
                let operation = format!("listing {}", directory.display());
                ToolError::io(operation, e.into())
            })?;

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        tracing::debug!("found {} audio files in {}", files.len(), directory.display());
        Ok(files)
    }
}
