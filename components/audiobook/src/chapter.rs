// components/audiobook/src/chapter.rs
//! Grouping of sorted tracks into chapters
//!
//! Tracks whose chapter title (after chapter rules) is identical end up in
//! the same chapter, even when other chapters sit between them. Chapters are
//! numbered in order of first appearance.

use std::collections::HashMap;
use std::path::PathBuf;

use tag_rules::{ChapterRule, RuleError};

use crate::error::ProjectError;
use crate::track::Track;

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterFile {
    pub name: PathBuf,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub files: Vec<ChapterFile>,
    pub index: usize,
    /// Position of the chapter created before this one
    pub previous: Option<usize>,
}

impl Chapter {
    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        self.files.iter().map(|f| f.duration).sum()
    }
}

/// Chapters of a book with their start offsets
#[derive(Debug, Clone, Default)]
pub struct ChapterList {
    chapters: Vec<Chapter>,
    offsets: Vec<f64>,
}

impl ChapterList {
    /// Group tracks, already in playback order, into chapters
    pub fn from_tracks(tracks: &[Track], rules: &[ChapterRule]) -> Result<Self, ProjectError> {
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut by_title: HashMap<String, usize> = HashMap::new();

        for track in tracks {
            let title =
                chapter_title(track.title(), rules).map_err(|source| ProjectError::ChapterRule {
                    file: track.file().to_path_buf(),
                    source,
                })?;
            let file = ChapterFile {
                name: track.file().to_path_buf(),
                duration: track.duration(),
            };

            match by_title.get(&title) {
                Some(&position) => chapters[position].files.push(file),
                None => {
                    let index = chapters.len();
                    by_title.insert(title.clone(), index);
                    chapters.push(Chapter {
                        title,
                        files: vec![file],
                        index,
                        previous: index.checked_sub(1),
                    });
                }
            }
        }

        Ok(Self::with_offsets(chapters))
    }

    fn with_offsets(chapters: Vec<Chapter>) -> Self {
        let mut offsets: Vec<f64> = Vec::with_capacity(chapters.len());
        for chapter in &chapters {
            let offset = match chapter.previous {
                Some(previous) => offsets[previous] + chapters[previous].duration(),
                None => 0.0,
            };
            offsets.push(offset);
        }
        Self { chapters, offsets }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Start of the chapter at `position` in seconds
    pub fn offset(&self, position: usize) -> Option<f64> {
        self.offsets.get(position).copied()
    }

    /// Chapter marker text understood by mp4chaps
    pub fn markers(&self) -> String {
        self.chapters
            .iter()
            .zip(&self.offsets)
            .map(|(chapter, offset)| {
                format!(
                    "CHAPTER{index:02}={time}\nCHAPTER{index:02}NAME={title}",
                    index = chapter.index,
                    time = format_timestamp(*offset),
                    title = chapter.title,
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn chapter_title(title: &str, rules: &[ChapterRule]) -> Result<String, RuleError> {
    rules
        .iter()
        .try_fold(title.to_string(), |current, rule| rule.apply(&current))
}

/// `HH:MM:SS.mmm`, truncated to the millisecond, hours not wrapped
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let secs = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use std::sync::Arc;

    fn track(file: &str, title: &str, duration: f64) -> Track {
        Track::new(file, ";FFMETADATA1", title, duration, Arc::from(Vec::new()))
    }

    #[rstest]
    #[case(0.0, "00:00:00.000")]
    #[case(5000.0, "01:23:20.000")]
    #[case(61.2349, "00:01:01.234")]
    #[case(59.9999, "00:00:59.999")]
    #[case(90_000.5, "25:00:00.500")]
    fn formats_timestamps(#[case] seconds: f64, #[case] expected: &str) {
        assert_eq!(format_timestamp(seconds), expected);
    }

    #[test]
    fn tracks_with_distinct_titles_become_chapters() {
        let tracks = vec![
            track("01.m4a", "Intro", 10.0),
            track("02.m4a", "Middle", 20.5),
            track("03.m4a", "End", 5.0),
        ];

        let list = ChapterList::from_tracks(&tracks, &[]).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.offset(0), Some(0.0));
        assert_eq!(list.offset(1), Some(10.0));
        assert_eq!(list.offset(2), Some(30.5));
        assert_eq!(list.chapters()[2].previous, Some(1));
        assert_eq!(list.chapters()[0].previous, None);
    }

    #[test]
    fn renders_markers() {
        let tracks = vec![track("01.m4a", "Intro", 5000.0), track("02.m4a", "Part Two", 1.5)];

        let list = ChapterList::from_tracks(&tracks, &[]).unwrap();

        assert_eq!(
            list.markers(),
            "CHAPTER00=00:00:00.000\nCHAPTER00NAME=Intro\n\nCHAPTER01=01:23:20.000\nCHAPTER01NAME=Part Two"
        );
    }

    #[test]
    fn same_title_merges_even_when_not_adjacent() {
        let tracks = vec![
            track("01.m4a", "A", 1.0),
            track("02.m4a", "B", 2.0),
            track("03.m4a", "A", 4.0),
            track("04.m4a", "C", 8.0),
        ];

        let list = ChapterList::from_tracks(&tracks, &[]).unwrap();

        let titles: Vec<&str> = list.chapters().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(list.chapters()[0].files.len(), 2);
        assert_eq!(list.chapters()[0].duration(), 5.0);
        assert_eq!(list.offset(1), Some(5.0));
        assert_eq!(list.offset(2), Some(7.0));
    }

    #[test]
    fn rules_decide_the_merge_key() {
        let rules = vec![ChapterRule::new(r"^(Chapter \d+)-\d+$", "%s")];
        let tracks = vec![
            track("01.m4a", "Chapter 1-1", 60.0),
            track("02.m4a", "Chapter 1-2", 60.0),
            track("03.m4a", "Chapter 2-1", 30.0),
            track("04.m4a", "Epilogue", 10.0),
        ];

        let list = ChapterList::from_tracks(&tracks, &rules).unwrap();

        assert_eq!(
            list.markers(),
            "CHAPTER00=00:00:00.000\nCHAPTER00NAME=Chapter 1\n\n\
             CHAPTER01=00:02:00.000\nCHAPTER01NAME=Chapter 2\n\n\
             CHAPTER02=00:02:30.000\nCHAPTER02NAME=Epilogue"
        );
    }

    #[test]
    fn rules_apply_in_order() {
        let rules = vec![
            ChapterRule::new(r"^Track (\d+)$", "Part %s"),
            ChapterRule::new(r"^Part (\d+)$", "%s. Part"),
        ];
        let tracks = vec![track("01.m4a", "Track 7", 1.0)];

        let list = ChapterList::from_tracks(&tracks, &rules).unwrap();

        assert_eq!(list.chapters()[0].title, "7. Part");
    }

    #[test]
    fn broken_rule_names_the_track() {
        let rules = vec![ChapterRule::new("(unclosed", "%s")];
        let tracks = vec![track("01.m4a", "Intro", 1.0)];

        let result = ChapterList::from_tracks(&tracks, &rules);

        assert_matches!(
            result,
            Err(ProjectError::ChapterRule { file, source: RuleError::Pattern { .. } })
                if file == PathBuf::from("01.m4a")
        );
    }

    #[test]
    fn no_tracks_render_nothing() {
        let list = ChapterList::from_tracks(&[], &[]).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.markers(), "");
    }
}
