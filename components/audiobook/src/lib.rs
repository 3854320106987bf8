//! Audiobook assembly
//!
//! Turns a directory of chapter tracks into a single m4b:
//! - [`Track`] and [`sort_tracks`]: per-file metadata and playback order
//! - [`TrackLoader`]: concurrent loading through a [`audio_tools::MetadataReader`]
//! - [`ChapterList`]: chapters, offsets and the marker text for mp4chaps
//! - [`ProjectConfig`] and [`discover`]: `narr.yaml` handling
//! - [`Project`]: previews and the conversion pipeline
//! - [`Library`]: tag and file tools for finished books

mod chapter;
mod config;
mod discover;
mod error;
mod library;
mod loader;
mod naming;
mod project;
mod track;

#[cfg(test)]
mod testing;

pub use chapter::{format_timestamp, Chapter, ChapterFile, ChapterList};
pub use config::{ProjectConfig, CONFIG_FILE_NAME};
pub use discover::{discover, DiscoveryMode};
pub use error::{ConfigError, LibraryError, LoadError, ProjectError, Result, Stage};
pub use library::{BookEdit, BookTags, Library, Rename, Rewrite};
pub use loader::TrackLoader;
pub use naming::{book_path, sanitize, BOOK_EXTENSION};
pub use project::{Project, ProjectDependencies};
pub use track::{compare_tracks, sort_tracks, Track};
