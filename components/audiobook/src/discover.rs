// components/audiobook/src/discover.rs
//! Finding the projects a path refers to

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::{ProjectConfig, CONFIG_FILE_NAME};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    /// The config at the path, expanded when it sets `multi`
    #[default]
    Single,
    /// The config at the path applied to every child directory
    Multi,
    /// Every config file below the path
    Recursive,
}

impl DiscoveryMode {
    pub fn from_flags(recursive: bool, multi: bool) -> Result<Self, ConfigError> {
        match (recursive, multi) {
            (true, true) => Err(ConfigError::ConflictingModes),
            (true, false) => Ok(DiscoveryMode::Recursive),
            (false, true) => Ok(DiscoveryMode::Multi),
            (false, false) => Ok(DiscoveryMode::Single),
        }
    }
}

/// Project configurations for `path`, each bound to its project directory
pub fn discover(path: &Path, mode: DiscoveryMode) -> Result<Vec<ProjectConfig>, ConfigError> {
    match mode {
        DiscoveryMode::Single => from_config(path, false),
        DiscoveryMode::Multi => from_config(path, true),
        DiscoveryMode::Recursive => {
            let mut projects = Vec::new();
            for file in config_files(path)? {
                projects.extend(from_config(&file, false)?);
            }
            Ok(projects)
        }
    }
}

fn from_config(path: &Path, force_multi: bool) -> Result<Vec<ProjectConfig>, ConfigError> {
    let config = ProjectConfig::load(path)?;

    if !(force_multi || config.multi) {
        return Ok(vec![config]);
    }

    let projects: Vec<ProjectConfig> = child_dirs(&config.project_dir)?
        .into_iter()
        .map(|dir| config.for_project_dir(dir))
        .collect();
    debug!(
        "{} projects below {}",
        projects.len(),
        config.project_dir.display()
    );
    Ok(projects)
}

fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let discovery_error = |source| ConfigError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        if entry.file_type().map_err(discovery_error)?.is_dir() {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn config_files(root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| ConfigError::Discovery {
            path: root.to_path_buf(),
            source: e.into(),
        })?;

        if entry.file_type().is_file() && entry.file_name() == CONFIG_FILE_NAME {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
