//! Audiobook error types
//!
//! Configuration problems are reported before any work starts. Pipeline
//! failures carry the stage they happened in.

use std::fmt;
use std::path::PathBuf;

use audio_tools::ToolError;
use tag_rules::{RuleError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not write config file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("could not render config")]
    Render(#[source] serde_yaml::Error),

    #[error("audioFilePath must be a valid path")]
    MissingAudioPath,

    #[error("metadata rule invalid")]
    MetadataRule(#[source] ValidationError),

    #[error("chapter rule invalid")]
    ChapterRule(#[source] ValidationError),

    #[error("could not determine home directory for the default output path")]
    NoHomeDirectory,

    #[error("could not list projects below {path}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("--multi and --recursive cannot be combined")]
    ConflictingModes,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not load track {file}")]
    Tool {
        file: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("track {file} has no disc number")]
    MissingDiscNumber { file: PathBuf },

    #[error("could not apply metadata rules to {file}")]
    Rules {
        file: PathBuf,
        #[source]
        source: RuleError,
    },
}

/// Failures of the tag and file tools working on finished books
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("could not list books below {path}")]
    List {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("invalid regex")]
    Pattern(#[source] RuleError),

    #[error("failed to read metadata of {file}")]
    Read {
        file: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("could not rewrite {file}")]
    Rule {
        file: PathBuf,
        #[source]
        source: RuleError,
    },

    #[error("could not write metadata to {file}")]
    Write {
        file: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("new name '{name}' for {file} is not a plain file name")]
    InvalidName { file: PathBuf, name: String },

    #[error("cannot rename {from} to {to}: target exists")]
    TargetExists { from: PathBuf, to: PathBuf },

    #[error("could not rename {from} to {to}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Steps of a conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadTracks,
    ResolveFilename,
    ComputeChapters,
    Transcode,
    Concatenate,
    ComputeMetadata,
    EmbedMetadata,
    ResolveCover,
    EmbedCover,
    EmbedChapters,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadTracks => "loading tracks",
            Stage::ResolveFilename => "resolving output filename",
            Stage::ComputeChapters => "computing chapters",
            Stage::Transcode => "converting tracks",
            Stage::Concatenate => "concatenating tracks",
            Stage::ComputeMetadata => "computing metadata",
            Stage::EmbedMetadata => "adding metadata",
            Stage::ResolveCover => "resolving cover",
            Stage::EmbedCover => "adding cover",
            Stage::EmbedChapters => "adding chapters",
            Stage::Finalize => "moving output into place",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("{stage} failed")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ProjectError>,
    },

    #[error("could not load audio files")]
    Load(#[from] LoadError),

    #[error("audio tool failed")]
    Tool(#[from] ToolError),

    #[error("invalid project configuration")]
    Config(#[from] ConfigError),

    #[error("could not read chapter title for {file}")]
    ChapterRule {
        file: PathBuf,
        #[source]
        source: RuleError,
    },

    #[error("could not get metadata of the first track")]
    Metadata(#[source] RuleError),

    #[error("no {tag} found in metadata")]
    MissingMetadata { tag: &'static str },

    #[error("no audio files found in {directory}")]
    NoAudioFiles { directory: PathBuf },

    #[error("io error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProjectError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        ProjectError::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Attach the pipeline stage this error surfaced in
    pub fn in_stage(self, stage: Stage) -> Self {
        ProjectError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The error without stage wrapping
    pub fn root(&self) -> &ProjectError {
        match self {
            ProjectError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProjectError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectError>;
