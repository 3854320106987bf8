// components/audiobook/src/config.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tag_rules::{ChapterRule, MetadataRule};
use tracing::debug;

use crate::error::ConfigError;

/// Name of the per-project configuration file
pub const CONFIG_FILE_NAME: &str = "narr.yaml";

/// Directory below the home directory used when no output path is configured
const DEFAULT_OUTPUT_DIR: &str = "narr";

/// Configuration of one audiobook project
///
/// Relative paths are resolved against `project_dir`, the directory the
/// configuration applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub audio_file_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cover_path: String,

    #[serde(default)]
    pub has_chapters: bool,

    /// Re-encode every track before concatenating
    #[serde(default)]
    pub should_convert: bool,

    /// Apply this configuration to every child directory instead
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multi: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(default)]
    pub metadata_rules: Vec<MetadataRule>,

    #[serde(default)]
    pub chapter_rules: Vec<ChapterRule>,

    #[serde(skip)]
    pub project_dir: PathBuf,
}

impl ProjectConfig {
    /// Config file for `path`, which is either a directory or the file itself
    pub fn config_file(path: &Path) -> PathBuf {
        if path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME) {
            path.to_path_buf()
        } else {
            path.join(CONFIG_FILE_NAME)
        }
    }

    /// Read and validate the configuration at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = Self::config_file(path);
        debug!("reading config {}", file.display());

        let content = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
            path: file.clone(),
            source,
        })?;

        let mut config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: file.clone(),
            source,
        })?;
        config.project_dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Structural checks only; rule regexes are compiled when applied
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio_file_path.is_empty() {
            return Err(ConfigError::MissingAudioPath);
        }

        for rule in &self.metadata_rules {
            rule.validate().map_err(ConfigError::MetadataRule)?;
        }

        for rule in &self.chapter_rules {
            rule.validate().map_err(ConfigError::ChapterRule)?;
        }

        Ok(())
    }

    /// Same configuration applied to another directory
    pub fn for_project_dir(&self, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            ..self.clone()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.resolve(Path::new(&self.audio_file_path))
    }

    /// Configured cover, if any
    pub fn cover_file(&self) -> Option<PathBuf> {
        if self.cover_path.is_empty() {
            None
        } else {
            Some(self.resolve(Path::new(&self.cover_path)))
        }
    }

    /// Base directory finished books are written below
    pub fn output_base(&self) -> Result<PathBuf, ConfigError> {
        match &self.output_path {
            Some(path) => Ok(self.resolve(path)),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_OUTPUT_DIR))
                .ok_or(ConfigError::NoHomeDirectory),
        }
    }

    /// Configuration written by `generate`
    pub fn starter() -> Self {
        Self {
            audio_file_path: ".".to_string(),
            ..Self::default()
        }
    }

    /// Write a starter configuration into `dir`, refusing to overwrite one
    pub fn generate(dir: &Path) -> Result<PathBuf, ConfigError> {
        let file = dir.join(CONFIG_FILE_NAME);
        if file.exists() {
            return Err(ConfigError::AlreadyExists { path: file });
        }

        let content = serde_yaml::to_string(&Self::starter()).map_err(ConfigError::Render)?;
        std::fs::write(&file, content).map_err(|source| ConfigError::Write {
            path: file.clone(),
            source,
        })?;

        Ok(file)
    }
}
