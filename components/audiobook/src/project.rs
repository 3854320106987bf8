// components/audiobook/src/project.rs
//! Conversion of one project into a single audiobook file
//!
//! The run goes through fixed stages: tracks are loaded and sorted, the
//! output name and chapters are computed before any heavy work, then the
//! tracks are optionally transcoded, concatenated, tagged, given a cover and
//! chapters, and finally moved into place. Intermediate files live in a
//! temporary directory that is removed when the run ends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use audio_tools::{AudioFileLister, AudioProcessor, Ffmpeg, MetadataReader, WalkdirLister};
use tag_rules::{MetadataRule, TagMap};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::chapter::ChapterList;
use crate::config::ProjectConfig;
use crate::error::{ConfigError, ProjectError, Result, Stage};
use crate::loader::TrackLoader;
use crate::naming::book_path;
use crate::track::Track;

/// Relative difference in duration under which an existing book counts as done
const COMPLETED_TOLERANCE: f64 = 0.05;

/// External collaborators of a project
#[derive(Clone)]
pub struct ProjectDependencies {
    pub files: Arc<dyn AudioFileLister + Send + Sync>,
    pub metadata: Arc<dyn MetadataReader + Send + Sync>,
    pub processor: Arc<dyn AudioProcessor + Send + Sync>,
}

impl ProjectDependencies {
    /// Collaborators backed by the ffmpeg tool suite
    pub fn ffmpeg(codec: Option<&str>) -> Self {
        let ffmpeg = match codec {
            Some(codec) => Ffmpeg::new().with_codec(codec),
            None => Ffmpeg::new(),
        };
        let ffmpeg = Arc::new(ffmpeg);

        Self {
            files: Arc::new(WalkdirLister::default()),
            metadata: Arc::clone(&ffmpeg) as Arc<dyn MetadataReader + Send + Sync>,
            processor: ffmpeg,
        }
    }
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<ProjectError>> InStage<T> for std::result::Result<T, E> {
    fn in_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| Into::<ProjectError>::into(e).in_stage(stage))
    }
}

pub struct Project {
    config: ProjectConfig,
    deps: ProjectDependencies,
    loader: TrackLoader,
    rules: Arc<[MetadataRule]>,
    tracks: OnceCell<Vec<Track>>,
}

impl Project {
    pub fn new(
        config: ProjectConfig,
        deps: ProjectDependencies,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let loader = TrackLoader::new(Arc::clone(&deps.metadata));
        let rules = Arc::from(config.metadata_rules.clone());

        Ok(Self {
            config,
            deps,
            loader,
            rules,
            tracks: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn project_dir(&self) -> &Path {
        &self.config.project_dir
    }

    /// Loaded tracks in playback order, loaded once per project
    pub async fn tracks(&self) -> Result<&[Track]> {
        let tracks = self
            .tracks
            .get_or_try_init(|| async {
                let directory = self.config.audio_dir();
                let files = self.deps.files.list_audio_files(&directory).await?;
                if files.is_empty() {
                    return Err(ProjectError::NoAudioFiles { directory });
                }

                info!("loading {} tracks from {}", files.len(), directory.display());
                Ok(self
                    .loader
                    .load_tracks(files, Arc::clone(&self.rules))
                    .await?)
            })
            .await?;

        Ok(tracks.as_slice())
    }

    pub async fn chapters(&self) -> Result<ChapterList> {
        let tracks = self.tracks().await?;
        ChapterList::from_tracks(tracks, &self.config.chapter_rules)
    }

    async fn book_tags(&self) -> Result<&TagMap> {
        let first = self
            .tracks()
            .await?
            .first()
            .ok_or_else(|| ProjectError::NoAudioFiles {
                directory: self.config.audio_dir(),
            })?;

        first.metadata().map_err(ProjectError::Metadata)
    }

    /// Metadata block for the book, taken from the first track
    pub async fn metadata(&self) -> Result<String> {
        Ok(self.book_tags().await?.render_book())
    }

    pub async fn artist_and_book_title(&self) -> Result<(String, String)> {
        let tags = self.book_tags().await?;

        let artist = tags
            .get("artist")
            .ok_or(ProjectError::MissingMetadata { tag: "artist" })?;
        let album = tags
            .get("album")
            .ok_or(ProjectError::MissingMetadata { tag: "album" })?;

        Ok((artist.to_string(), album.to_string()))
    }

    /// Where the finished book is written
    pub async fn filename(&self) -> Result<PathBuf> {
        let (artist, album) = self.artist_and_book_title().await?;
        let base = self.config.output_base()?;
        Ok(book_path(&base, &artist, &album))
    }

    /// Configured cover when it exists, otherwise the picture of the first track
    pub async fn cover(&self, work_dir: &Path) -> Result<PathBuf> {
        if let Some(cover) = self.config.cover_file() {
            match tokio::fs::metadata(&cover).await {
                Ok(meta) if !meta.is_dir() => return Ok(cover),
                _ => debug!("no cover at {}, extracting one", cover.display()),
            }
        }

        let first = self
            .tracks()
            .await?
            .first()
            .ok_or_else(|| ProjectError::NoAudioFiles {
                directory: self.config.audio_dir(),
            })?;

        Ok(self
            .deps
            .processor
            .extract_cover(first.file(), work_dir)
            .await?)
    }

    /// Sum of all track durations in seconds
    pub async fn total_duration(&self) -> Result<f64> {
        Ok(self.tracks().await?.iter().map(Track::duration).sum())
    }

    /// Whether the book already exists with a duration close to the tracks'
    ///
    /// Any failure along the way counts as not completed.
    pub async fn already_completed(&self) -> bool {
        let (expected, output) = match (self.total_duration().await, self.filename().await) {
            (Ok(expected), Ok(output)) => (expected, output),
            _ => return false,
        };

        if !tokio::fs::metadata(&output)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return false;
        }

        match self.loader.load_track(&output, Arc::from(Vec::new())).await {
            Ok(existing) => {
                let difference = (existing.duration() - expected).abs();
                difference <= expected * COMPLETED_TOLERANCE
            }
            Err(error) => {
                warn!("could not read existing {}: {}", output.display(), error);
                false
            }
        }
    }

    /// Run the whole conversion and return the path of the finished book
    pub async fn convert(&self) -> Result<PathBuf> {
        let work_dir = tempfile::Builder::new()
            .prefix("narr-")
            .tempdir()
            .map_err(|e| ProjectError::io("creating work dir", e))?;

        let result = self.run_stages(work_dir.path()).await;

        if let Err(error) = work_dir.close() {
            warn!("could not remove work dir: {}", error);
        }
        result
    }

    async fn run_stages(&self, work_dir: &Path) -> Result<PathBuf> {
        let processor = &self.deps.processor;

        let tracks = self.tracks().await.in_stage(Stage::LoadTracks)?;
        let final_path = self.filename().await.in_stage(Stage::ResolveFilename)?;

        if self.already_completed().await {
            info!("skipping {}, already completed", final_path.display());
            return Ok(final_path);
        }

        // computed before any tool runs so that broken rules fail early
        let chapters = self.chapters().await.in_stage(Stage::ComputeChapters)?;

        let mut files: Vec<PathBuf> = tracks.iter().map(|t| t.file().to_path_buf()).collect();

        if self.config.should_convert {
            info!("converting {} files", files.len());
            let transcode_dir = work_dir.join("m4a");
            tokio::fs::create_dir(&transcode_dir)
                .await
                .map_err(|e| ProjectError::io("creating transcode dir", e))
                .in_stage(Stage::Transcode)?;
            files = processor
                .transcode(&files, &transcode_dir)
                .await
                .in_stage(Stage::Transcode)?;
        }

        info!("concatenating {} files", files.len());
        let book = processor
            .concatenate(&files, work_dir)
            .await
            .in_stage(Stage::Concatenate)?;

        let metadata = self.metadata().await.in_stage(Stage::ComputeMetadata)?;
        let (_, book_title) = self
            .artist_and_book_title()
            .await
            .in_stage(Stage::ComputeMetadata)?;

        info!("adding metadata");
        processor
            .embed_metadata(&book, &metadata, &book_title)
            .await
            .in_stage(Stage::EmbedMetadata)?;

        let cover = self.cover(work_dir).await.in_stage(Stage::ResolveCover)?;

        info!("adding cover {}", cover.display());
        processor
            .embed_cover(&book, &cover)
            .await
            .in_stage(Stage::EmbedCover)?;

        if self.config.has_chapters {
            info!("adding {} chapters", chapters.len());
            processor
                .embed_chapters(&book, &chapters.markers())
                .await
                .in_stage(Stage::EmbedChapters)?;
        }

        move_into_place(&book, &final_path)
            .await
            .in_stage(Stage::Finalize)?;

        info!("created {}", final_path.display());
        Ok(final_path)
    }
}

/// Move `source` to `target`, never leaving a partial file at `target`
async fn move_into_place(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProjectError::io(format!("creating {}", parent.display()), e))?;
    }

    if tokio::fs::rename(source, target).await.is_ok() {
        return Ok(());
    }

    // work dir and output may be on different filesystems
    let staging = target.with_extension("part");
    let copied = match tokio::fs::copy(source, &staging).await {
        Ok(_) => tokio::fs::rename(&staging, target).await,
        Err(error) => Err(error),
    };

    if let Err(error) = copied {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(ProjectError::io(
            format!("moving {} to {}", source.display(), target.display()),
            error,
        ));
    }

    Ok(())
}
