// components/audiobook/src/loader.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use audio_tools::pool::{fan_out, DEFAULT_WORKERS};
use audio_tools::MetadataReader;
use tag_rules::MetadataRule;
use tracing::debug;

use crate::error::LoadError;
use crate::track::{sort_tracks, Track};

/// Loads tracks through a metadata reader on a bounded worker pool
#[derive(Clone)]
pub struct TrackLoader {
    reader: Arc<dyn MetadataReader + Send + Sync>,
    workers: usize,
}

impl TrackLoader {
    pub fn new(reader: Arc<dyn MetadataReader + Send + Sync>) -> Self {
        Self {
            reader,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Load a single file without any ordering checks
    pub async fn load_track(
        &self,
        file: &Path,
        rules: Arc<[MetadataRule]>,
    ) -> Result<Track, LoadError> {
        read_track(self.reader.as_ref(), file.to_path_buf(), rules).await
    }

    /// Load every file and return the tracks in playback order
    ///
    /// Every track must carry a disc number after rules are applied. The
    /// first failure aborts the whole batch.
    pub async fn load_tracks(
        &self,
        files: Vec<PathBuf>,
        rules: Arc<[MetadataRule]>,
    ) -> Result<Vec<Track>, LoadError> {
        debug!("loading {} tracks", files.len());
        let reader = Arc::clone(&self.reader);

        let mut tracks = fan_out(files, self.workers, move |file| {
            let reader = Arc::clone(&reader);
            let rules = Arc::clone(&rules);
            async move {
                let track = read_track(reader.as_ref(), file, rules).await?;
                check_disc_number(&track)?;
                Ok::<_, LoadError>(track)
            }
        })
        .await?;

        sort_tracks(&mut tracks);
        Ok(tracks)
    }
}

async fn read_track(
    reader: &(dyn MetadataReader + Send + Sync),
    file: PathBuf,
    rules: Arc<[MetadataRule]>,
) -> Result<Track, LoadError> {
    let raw_metadata = reader
        .read_raw_metadata(&file)
        .await
        .map_err(|source| LoadError::Tool {
            file: file.clone(),
            source,
        })?;
    let (title, duration) = reader
        .read_title_and_duration(&file)
        .await
        .map_err(|source| LoadError::Tool {
            file: file.clone(),
            source,
        })?;

    Ok(Track::new(file, raw_metadata, title, duration, rules))
}

fn check_disc_number(track: &Track) -> Result<(), LoadError> {
    track.metadata().map_err(|source| LoadError::Rules {
        file: track.file().to_path_buf(),
        source,
    })?;

    match track.disc_number() {
        Some(_) => Ok(()),
        None => Err(LoadError::MissingDiscNumber {
            file: track.file().to_path_buf(),
        }),
    }
}
