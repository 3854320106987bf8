//! In-memory collaborators for tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use audio_tools::{AudioFileLister, AudioProcessor, MetadataReader, ToolError};
use parking_lot::Mutex;

use crate::track::Track;

/// Raw ffmetadata block from `key=value` pairs
pub fn block(tags: &[(&str, &str)]) -> String {
    let mut lines = vec![tag_rules::FFMETADATA_HEADER.to_string()];
    lines.extend(tags.iter().map(|(k, v)| format!("{k}={v}")));
    lines.join("\n")
}

/// Track without rules whose title is its file name
pub fn track(file: &str, tags: &[(&str, &str)]) -> Track {
    Track::new(file, block(tags), file, 1.0, Arc::from(Vec::new()))
}

struct FakeFile {
    raw_metadata: String,
    title: String,
    duration: f64,
}

/// Metadata reader answering from a table
#[derive(Default)]
pub struct FakeReader {
    files: HashMap<PathBuf, FakeFile>,
    delays: HashMap<PathBuf, u64>,
}

impl FakeReader {
    pub fn with_track(
        mut self,
        file: impl AsRef<Path>,
        title: &str,
        duration: f64,
        tags: &[(&str, &str)],
    ) -> Self {
        self.files.insert(
            file.as_ref().to_path_buf(),
            FakeFile {
                raw_metadata: block(tags),
                title: title.to_string(),
                duration,
            },
        );
        self
    }

    pub fn with_delay(mut self, file: impl AsRef<Path>, millis: u64) -> Self {
        self.delays.insert(file.as_ref().to_path_buf(), millis);
        self
    }

    async fn lookup(&self, path: &Path) -> Result<&FakeFile, ToolError> {
        if let Some(millis) = self.delays.get(path) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        self.files
            .get(path)
            .ok_or_else(|| ToolError::extraction(path, "title"))
    }
}

#[async_trait]
impl MetadataReader for FakeReader {
    async fn read_raw_metadata(&self, path: &Path) -> Result<String, ToolError> {
        Ok(self.lookup(path).await?.raw_metadata.clone())
    }

    async fn read_title_and_duration(&self, path: &Path) -> Result<(String, f64), ToolError> {
        let file = self.lookup(path).await?;
        Ok((file.title.clone(), file.duration))
    }
}

/// Lister returning a fixed list, or failing when it has none
#[derive(Default)]
pub struct FakeLister {
    pub files: Option<Vec<PathBuf>>,
}

impl FakeLister {
    pub fn new(files: &[&str]) -> Self {
        Self {
            files: Some(files.iter().map(PathBuf::from).collect()),
        }
    }
}

#[async_trait]
impl AudioFileLister for FakeLister {
    async fn list_audio_files(&self, directory: &Path) -> Result<Vec<PathBuf>, ToolError> {
        self.files.clone().ok_or_else(|| {
            ToolError::io(
                format!("listing {}", directory.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            )
        })
    }
}

/// Processor that records calls and creates empty output files
#[derive(Default)]
pub struct RecordingProcessor {
    pub calls: Mutex<Vec<String>>,
    pub metadata: Mutex<Option<String>>,
    pub chapters: Mutex<Option<String>>,
    /// Output dirs handed to `concatenate`
    pub out_dirs: Mutex<Vec<PathBuf>>,
    /// Metadata blocks passed to `write_metadata`, by file
    pub written: Mutex<Vec<(PathBuf, String)>>,
    pub fail_on: Option<&'static str>,
}

impl RecordingProcessor {
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            fail_on: Some(operation),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Operation names in call order
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| call.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    fn record(&self, operation: &str, detail: impl AsRef<str>) -> Result<(), ToolError> {
        self.calls
            .lock()
            .push(format!("{operation} {}", detail.as_ref()));

        if self.fail_on == Some(operation) {
            return Err(ToolError::CommandExitCode {
                command: operation.to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

fn touch(path: &Path) -> Result<(), ToolError> {
    std::fs::write(path, b"").map_err(|e| ToolError::io(format!("touching {}", path.display()), e))
}

#[async_trait]
impl AudioProcessor for RecordingProcessor {
    async fn transcode(&self, paths: &[PathBuf], out_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
        self.record("transcode", paths.len().to_string())?;
        paths
            .iter()
            .map(|path| {
                let name = path.file_name().unwrap_or_default();
                let output = out_dir.join(name).with_extension("m4a");
                touch(&output)?;
                Ok(output)
            })
            .collect()
    }

    async fn concatenate(&self, paths: &[PathBuf], out_dir: &Path) -> Result<PathBuf, ToolError> {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        self.out_dirs.lock().push(out_dir.to_path_buf());
        self.record("concatenate", names.join(","))?;
        let output = out_dir.join("concat.m4b");
        touch(&output)?;
        Ok(output)
    }

    async fn embed_metadata(
        &self,
        _container: &Path,
        metadata: &str,
        book_title: &str,
    ) -> Result<(), ToolError> {
        self.record("embed_metadata", book_title)?;
        *self.metadata.lock() = Some(metadata.to_string());
        Ok(())
    }

    async fn write_metadata(&self, container: &Path, metadata: &str) -> Result<(), ToolError> {
        self.record("write_metadata", container.display().to_string())?;
        self.written
            .lock()
            .push((container.to_path_buf(), metadata.to_string()));
        Ok(())
    }

    async fn embed_cover(&self, _container: &Path, cover: &Path) -> Result<(), ToolError> {
        self.record("embed_cover", cover.display().to_string())
    }

    async fn extract_cover(&self, source: &Path, work_dir: &Path) -> Result<PathBuf, ToolError> {
        self.record("extract_cover", source.display().to_string())?;
        let cover = work_dir.join("cover.jpg");
        touch(&cover)?;
        Ok(cover)
    }

    async fn embed_chapters(&self, _container: &Path, chapters: &str) -> Result<(), ToolError> {
        self.record("embed_chapters", "")?;
        *self.chapters.lock() = Some(chapters.to_string());
        Ok(())
    }
}
