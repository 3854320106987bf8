// components/audiobook/src/library.rs
//! Tag and file tools for finished books
//!
//! These work on every `.m4b` below a path, independent of any project
//! config: show tags, rewrite selected tags with a regex, rename files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use audio_tools::WalkdirLister;
use regex::Regex;
use tag_rules::{apply_regex, edit_tags, select_tags, RuleError, TagChange, TagMap};
use tracing::{debug, info};

use crate::error::LibraryError;
use crate::naming::BOOK_EXTENSION;
use crate::project::ProjectDependencies;

/// A regex whose capture groups are filled into a `%s` format
#[derive(Debug, Clone)]
pub struct Rewrite {
    regex: Regex,
    format: String,
}

impl Rewrite {
    pub fn new(pattern: &str, format: impl Into<String>) -> Result<Self, LibraryError> {
        let regex = Regex::new(pattern).map_err(|source| {
            LibraryError::Pattern(RuleError::Pattern {
                pattern: pattern.to_string(),
                source,
            })
        })?;

        Ok(Self {
            regex,
            format: format.into(),
        })
    }

    pub fn apply(&self, input: &str) -> Result<String, RuleError> {
        apply_regex(input, &self.regex, &self.format)
    }
}

/// Raw tags of one book
#[derive(Debug, Clone)]
pub struct BookTags {
    pub file: PathBuf,
    pub raw: String,
}

impl BookTags {
    /// `tag=value` lines for the selected tags, in the book's tag order
    pub fn selected(&self, names: &[String]) -> Vec<String> {
        let tags = TagMap::parse(&self.raw);
        select_tags(&tags, names)
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

/// Outcome of a tag edit on one book
#[derive(Debug, Clone)]
pub struct BookEdit {
    pub file: PathBuf,
    pub changes: Vec<TagChange>,
    /// Metadata block after the edit
    pub metadata: String,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

pub struct Library {
    deps: ProjectDependencies,
}

impl Library {
    pub fn new(deps: ProjectDependencies) -> Self {
        Self { deps }
    }

    /// Library over the ffmpeg tools, listing `.m4b` files
    pub fn ffmpeg() -> Self {
        Self::new(ProjectDependencies {
            files: Arc::new(WalkdirLister::new(BOOK_EXTENSION)),
            ..ProjectDependencies::ffmpeg(None)
        })
    }

    /// Every book at or below `path`, sorted
    pub async fn books(&self, path: &Path) -> Result<Vec<PathBuf>, LibraryError> {
        self.deps
            .files
            .list_audio_files(path)
            .await
            .map_err(|source| LibraryError::List {
                path: path.to_path_buf(),
                source,
            })
    }

    pub async fn show(&self, path: &Path) -> Result<Vec<BookTags>, LibraryError> {
        let mut books = Vec::new();
        for file in self.books(path).await? {
            let raw = self.read(&file).await?;
            books.push(BookTags { file, raw });
        }
        Ok(books)
    }

    /// Rewrite the selected tags of every book below `path`
    ///
    /// Books are handled one after another and the first failure stops the
    /// run. Books without changes are reported but never written.
    pub async fn edit(
        &self,
        path: &Path,
        tags: &[String],
        rewrite: &Rewrite,
        dry_run: bool,
    ) -> Result<Vec<BookEdit>, LibraryError> {
        let mut edits = Vec::new();

        for file in self.books(path).await? {
            let mut metadata = TagMap::parse(&self.read(&file).await?);
            let changes = edit_tags(&mut metadata, tags, &rewrite.regex, &rewrite.format)
                .map_err(|source| LibraryError::Rule {
                    file: file.clone(),
                    source,
                })?;
            let metadata = metadata.to_string();

            let written = !changes.is_empty() && !dry_run;
            if written {
                info!("writing {} changed tags to {}", changes.len(), file.display());
                self.deps
                    .processor
                    .write_metadata(&file, &metadata)
                    .await
                    .map_err(|source| LibraryError::Write {
                        file: file.clone(),
                        source,
                    })?;
            } else if changes.is_empty() {
                debug!("nothing to change in {}", file.display());
            }

            edits.push(BookEdit {
                file,
                changes,
                metadata,
                written,
            });
        }

        Ok(edits)
    }

    /// Rename every book below `path` whose file name the rewrite changes
    ///
    /// Existing files are never overwritten.
    pub async fn rename(
        &self,
        path: &Path,
        rewrite: &Rewrite,
        dry_run: bool,
    ) -> Result<Vec<Rename>, LibraryError> {
        let mut renames = Vec::new();

        for file in self.books(path).await? {
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let new_name = rewrite.apply(&name).map_err(|source| LibraryError::Rule {
                file: file.clone(),
                source,
            })?;
            if new_name == name {
                continue;
            }
            if !is_plain_name(&new_name) {
                return Err(LibraryError::InvalidName {
                    file,
                    name: new_name,
                });
            }

            let target = file.with_file_name(&new_name);
            if tokio::fs::symlink_metadata(&target).await.is_ok() {
                return Err(LibraryError::TargetExists {
                    from: file,
                    to: target,
                });
            }

            if !dry_run {
                tokio::fs::rename(&file, &target)
                    .await
                    .map_err(|source| LibraryError::Rename {
                        from: file.clone(),
                        to: target.clone(),
                        source,
                    })?;
                info!("renamed {} to {}", file.display(), target.display());
            }

            renames.push(Rename {
                from: file,
                to: target,
            });
        }

        Ok(renames)
    }

    async fn read(&self, file: &Path) -> Result<String, LibraryError> {
        self.deps
            .metadata
            .read_raw_metadata(file)
            .await
            .map_err(|source| LibraryError::Read {
                file: file.to_path_buf(),
                source,
            })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.chars().any(std::path::is_separator)
}
