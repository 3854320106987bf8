// components/audiobook/src/track.rs
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tag_rules::{MetadataRule, RuleError, TagMap};

/// One input audio file
///
/// The rule-applied tag mapping is computed on first access and reused for
/// the lifetime of the track, so every rule runs exactly once per track.
#[derive(Debug)]
pub struct Track {
    file: PathBuf,
    raw_metadata: String,
    title: String,
    duration: f64,
    rules: Arc<[MetadataRule]>,
    tags: OnceLock<Result<TagMap, RuleError>>,
}

impl Track {
    pub fn new(
        file: impl Into<PathBuf>,
        raw_metadata: impl Into<String>,
        title: impl Into<String>,
        duration: f64,
        rules: Arc<[MetadataRule]>,
    ) -> Self {
        Self {
            file: file.into(),
            raw_metadata: raw_metadata.into(),
            title: title.into(),
            duration,
            rules,
            tags: OnceLock::new(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn raw_metadata(&self) -> &str {
        &self.raw_metadata
    }

    /// Title as reported by the probe, before any chapter rule
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Tags with every metadata rule applied in order
    pub fn metadata(&self) -> Result<&TagMap, RuleError> {
        self.tags
            .get_or_init(|| {
                let mut tags = TagMap::parse(&self.raw_metadata);
                for rule in self.rules.iter() {
                    rule.apply(&mut tags)?;
                }
                Ok(tags)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.metadata().ok()?.get(name)
    }

    pub fn disc_number(&self) -> Option<u32> {
        self.tag("disc").and_then(parse_position)
    }

    pub fn track_number(&self) -> Option<u32> {
        self.tag("track").and_then(parse_position)
    }
}

/// `"3"` and `"3/12"` both yield 3
fn parse_position(value: &str) -> Option<u32> {
    value.split('/').next()?.parse().ok()
}

/// Disc first, then track number, each only when both sides have one and
/// they differ; the file path breaks every remaining tie.
pub fn compare_tracks(a: &Track, b: &Track) -> Ordering {
    if let (Some(x), Some(y)) = (a.disc_number(), b.disc_number()) {
        if x != y {
            return x.cmp(&y);
        }
    }

    if let (Some(x), Some(y)) = (a.track_number(), b.track_number()) {
        if x != y {
            return x.cmp(&y);
        }
    }

    a.file.as_os_str().cmp(b.file.as_os_str())
}

/// Sort tracks into playback order
///
/// `compare_tracks` is not transitive when tags are missing on some tracks,
/// so a stable insertion sort runs over a path-sorted list. Tracks with a
/// disc number are then put in disc order among the positions they hold,
/// which keeps any two discs in order even with disc-less tracks between
/// them. The result only depends on the set of tracks, never on the order
/// they were loaded in.
pub fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| a.file.as_os_str().cmp(b.file.as_os_str()));

    for i in 1..tracks.len() {
        let mut j = i;
        while j > 0 && compare_tracks(&tracks[j - 1], &tracks[j]) == Ordering::Greater {
            tracks.swap(j - 1, j);
            j -= 1;
        }
    }

    let with_disc: Vec<usize> = (0..tracks.len())
        .filter(|&i| tracks[i].disc_number().is_some())
        .collect();

    for i in 1..with_disc.len() {
        let mut j = i;
        while j > 0 && tracks[with_disc[j - 1]].disc_number() > tracks[with_disc[j]].disc_number() {
            tracks.swap(with_disc[j - 1], with_disc[j]);
            j -= 1;
        }
    }
}
