// components/audio_tools/src/ffmpeg.rs
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{CommandOutput, CommandRunner, SystemRunner};
use crate::pool::{fan_out, DEFAULT_WORKERS};
use crate::types::{AudioProcessor, MetadataReader, ToolError};

/// Codec used when re-encoding tracks
pub const DEFAULT_CODEC: &str = "aac";

const REQUIRED_TOOLS: [&str; 3] = ["ffmpeg", "ffprobe", "mp4chaps"];

/// Audio processing backed by ffmpeg, ffprobe and mp4chaps
pub struct Ffmpeg {
    runner: Arc<dyn CommandRunner + Send + Sync>,
    codec: String,
    workers: usize,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner + Send + Sync>) -> Self {
        Self {
            runner,
            codec: DEFAULT_CODEC.to_string(),
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Check that every tool a conversion needs is on the PATH
    pub fn check_available() -> Result<(), ToolError> {
        Self::check_tools(&REQUIRED_TOOLS)
    }

    pub fn check_tools(tools: &[&'static str]) -> Result<(), ToolError> {
        for &tool in tools {
            which::which(tool).map_err(|_| ToolError::ToolNotFound(tool))?;
        }
        Ok(())
    }

    async fn ffmpeg(&self, args: Vec<OsString>) -> Result<CommandOutput, ToolError> {
        self.runner.run("ffmpeg", &args).await
    }

    /// Run ffmpeg into `temporary` and move the result over `container`
    async fn rewrite(
        &self,
        container: &Path,
        temporary: PathBuf,
        mut args: Vec<OsString>,
    ) -> Result<(), ToolError> {
        remove_stale(&temporary).await?;
        args.push(temporary.clone().into());

        if let Err(error) = self.ffmpeg(args).await {
            let _ = tokio::fs::remove_file(&temporary).await;
            return Err(error);
        }

        replace(&temporary, container).await
    }

    /// Take the global tags of `container` from `metadata`, optionally overriding the title
    async fn map_metadata(
        &self,
        container: &Path,
        metadata: &str,
        title: Option<&str>,
    ) -> Result<(), ToolError> {
        let metadata_file = container.with_extension("metadata");
        tokio::fs::write(&metadata_file, metadata)
            .await
            .map_err(|e| ToolError::io(format!("writing {}", metadata_file.display()), e))?;

        let mut args: Vec<OsString> = vec![
            "-i".into(),
            container.into(),
            "-i".into(),
            metadata_file.clone().into(),
            "-map_metadata".into(),
            "1".into(),
            "-c".into(),
            "copy".into(),
        ];
        if let Some(title) = title {
            args.push("-metadata".into());
            args.push(format!("title={title}").into());
        }

        let result = self
            .rewrite(container, sibling(container, "withMetadata"), args)
            .await;

        let _ = tokio::fs::remove_file(&metadata_file).await;
        result
    }
}

#[async_trait]
impl MetadataReader for Ffmpeg {
    async fn read_raw_metadata(&self, path: &Path) -> Result<String, ToolError> {
        let output = self
            .ffmpeg(vec![
                "-i".into(),
                path.into(),
                "-f".into(),
                "ffmetadata".into(),
                "-".into(),
            ])
            .await?;

        Ok(output.stdout_lossy())
    }

    async fn read_title_and_duration(&self, path: &Path) -> Result<(String, f64), ToolError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "a:0".into(),
            "-show_entries".into(),
            "format=duration:format_tags=title".into(),
            path.into(),
        ];
        let output = self.runner.run("ffprobe", &args).await?;

        parse_probe(path, &output.stdout_lossy())
    }
}

#[async_trait]
impl AudioProcessor for Ffmpeg {
    async fn transcode(&self, paths: &[PathBuf], out_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
        info!("converting {} files with codec {}", paths.len(), self.codec);

        let jobs: Vec<(PathBuf, PathBuf)> = paths
            .iter()
            .enumerate()
            .map(|(index, input)| (input.clone(), transcoded_path(index, input, out_dir)))
            .collect();

        let runner = Arc::clone(&self.runner);
        let codec = self.codec.clone();

        fan_out(jobs, self.workers, move |(input, output)| {
            let runner = Arc::clone(&runner);
            let args: Vec<OsString> = vec![
                "-i".into(),
                input.into(),
                "-c".into(),
                "copy".into(),
                "-c:a".into(),
                codec.clone().into(),
                output.clone().into(),
            ];
            async move {
                runner.run("ffmpeg", &args).await?;
                debug!("converted {}", output.display());
                Ok::<_, ToolError>(output)
            }
        })
        .await
    }

    async fn concatenate(&self, paths: &[PathBuf], out_dir: &Path) -> Result<PathBuf, ToolError> {
        let filelist = out_dir.join("filelist.txt");
        tokio::fs::write(&filelist, filelist_content(paths))
            .await
            .map_err(|e| ToolError::io(format!("writing {}", filelist.display()), e))?;

        let output = out_dir.join("concat.m4b");
        remove_stale(&output).await?;

        self.ffmpeg(vec![
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            filelist.into(),
            "-c".into(),
            "copy".into(),
            "-vn".into(),
            output.clone().into(),
        ])
        .await?;

        Ok(output)
    }

    async fn embed_metadata(
        &self,
        container: &Path,
        metadata: &str,
        book_title: &str,
    ) -> Result<(), ToolError> {
        self.map_metadata(container, metadata, Some(book_title)).await
    }

    async fn write_metadata(&self, container: &Path, metadata: &str) -> Result<(), ToolError> {
        self.map_metadata(container, metadata, None).await
    }

    async fn embed_cover(&self, container: &Path, cover: &Path) -> Result<(), ToolError> {
        let args = vec![
            "-i".into(),
            container.into(),
            "-i".into(),
            cover.into(),
            "-map".into(),
            "0".into(),
            "-map".into(),
            "1".into(),
            "-c".into(),
            "copy".into(),
            "-disposition:v".into(),
            "attached_pic".into(),
        ];
        self.rewrite(container, sibling(container, "withCover"), args)
            .await
    }

    async fn extract_cover(&self, source: &Path, work_dir: &Path) -> Result<PathBuf, ToolError> {
        let cover = work_dir.join("cover.jpg");
        remove_stale(&cover).await?;

        self.ffmpeg(vec![
            "-i".into(),
            source.into(),
            "-an".into(),
            "-vcodec".into(),
            "copy".into(),
            cover.clone().into(),
        ])
        .await?;

        Ok(cover)
    }

    async fn embed_chapters(&self, container: &Path, chapters: &str) -> Result<(), ToolError> {
        // mp4chaps edits in place and reads <stem>.chapters.txt next to the file
        let temporary = sibling(container, "withChapters");
        let chapters_file = temporary.with_extension("chapters.txt");

        remove_stale(&temporary).await?;
        tokio::fs::copy(container, &temporary)
            .await
            .map_err(|e| ToolError::io(format!("copying {}", container.display()), e))?;
        tokio::fs::write(&chapters_file, chapters)
            .await
            .map_err(|e| ToolError::io(format!("writing {}", chapters_file.display()), e))?;

        let args: Vec<OsString> = vec!["--import".into(), temporary.clone().into()];
        let result = self.runner.run("mp4chaps", &args).await;
        let _ = tokio::fs::remove_file(&chapters_file).await;

        if let Err(error) = result {
            let _ = tokio::fs::remove_file(&temporary).await;
            return Err(error);
        }

        replace(&temporary, container).await
    }
}

/// Extract title and duration from `ffprobe -show_entries` output
pub fn parse_probe(path: &Path, output: &str) -> Result<(String, f64), ToolError> {
    let mut title = None;
    let mut duration = None;

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("TAG:title=") {
            if !value.is_empty() {
                title.get_or_insert_with(|| value.to_string());
            }
        } else if let Some(value) = line.strip_prefix("duration=") {
            duration = duration.or_else(|| value.trim().parse::<f64>().ok());
        }
    }

    let title = title.ok_or_else(|| ToolError::extraction(path, "title"))?;
    let duration = duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ToolError::extraction(path, "duration"))?;

    Ok((title, duration))
}

/// Concat demuxer input listing one file per line
fn filelist_content(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

fn transcoded_path(index: usize, input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    out_dir.join(format!("{index:04}-{stem}.m4a"))
}

/// `dir/name.ext` becomes `dir/name.<suffix>.ext`
fn sibling(container: &Path, suffix: &str) -> PathBuf {
    let stem = container
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match container.extension() {
        Some(ext) => format!("{stem}.{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{suffix}"),
    };
    container.with_file_name(name)
}

async fn remove_stale(path: &Path) -> Result<(), ToolError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ToolError::io(format!("removing {}", path.display()), e)),
    }
}

async fn replace(temporary: &Path, container: &Path) -> Result<(), ToolError> {
    tokio::fs::rename(temporary, container).await.map_err(|e| {
        ToolError::io(
            format!("renaming {} to {}", temporary.display(), container.display()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::stub::RecordingRunner;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use tempfile::TempDir;

    fn processor(runner: &Arc<RecordingRunner>) -> Ffmpeg {
        Ffmpeg::with_runner(Arc::clone(runner) as Arc<dyn CommandRunner + Send + Sync>)
    }

    fn s(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parses_probe_output() {
        let output = "[FORMAT]\nduration=5000.123000\nTAG:title=Chapter 1\n[/FORMAT]\n";
        let (title, duration) = parse_probe(Path::new("a.m4a"), output).unwrap();

        assert_eq!(title, "Chapter 1");
        assert_eq!(duration, 5000.123);
    }

    #[test]
    fn probe_without_title_is_extraction_error() {
        let result = parse_probe(Path::new("a.m4a"), "[FORMAT]\nduration=12.5\n[/FORMAT]");
        assert_matches!(result, Err(ToolError::Extraction { what, .. }) if what == "title");
    }

    #[test]
    fn probe_without_duration_is_extraction_error() {
        let result = parse_probe(Path::new("a.m4a"), "duration=N/A\nTAG:title=x");
        assert_matches!(result, Err(ToolError::Extraction { what, .. }) if what == "duration");
    }

    #[test]
    fn filelist_escapes_quotes() {
        let content = filelist_content(&[PathBuf::from("/a/b.m4a"), PathBuf::from("/a/it's.m4a")]);
        assert_eq!(content, "file '/a/b.m4a'\nfile '/a/it'\\''s.m4a'\n");
    }

    #[rstest]
    #[case("/work/concat.m4b", "withCover", "/work/concat.withCover.m4b")]
    #[case("/work/concat", "withMetadata", "/work/concat.withMetadata")]
    #[case("book.tar.m4b", "withChapters", "book.tar.withChapters.m4b")]
    fn sibling_inserts_suffix_before_extension(
        #[case] container: &str,
        #[case] suffix: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(sibling(Path::new(container), suffix), PathBuf::from(expected));
    }

    #[tokio::test]
    async fn reads_raw_metadata_from_stdout() {
        let mut runner = RecordingRunner::default();
        runner
            .stdout
            .insert("ffmetadata".to_string(), ";FFMETADATA1\ntitle=x".to_string());
        let runner = Arc::new(runner);

        let metadata = processor(&runner)
            .read_raw_metadata(Path::new("book/01.m4a"))
            .await
            .unwrap();

        assert_eq!(metadata, ";FFMETADATA1\ntitle=x");
        assert_eq!(
            runner.calls(),
            vec![vec!["ffmpeg", "-i", "book/01.m4a", "-f", "ffmetadata", "-"]]
        );
    }

    #[tokio::test]
    async fn transcodes_every_file_in_order() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::touching_outputs());
        let inputs: Vec<PathBuf> = (1..=7).map(|n| PathBuf::from(format!("in/{n:02}.mp3"))).collect();

        let outputs = processor(&runner)
            .transcode(&inputs, dir.path())
            .await
            .unwrap();

        let expected: Vec<PathBuf> = (1..=7)
            .map(|n| dir.path().join(format!("{:04}-{n:02}.m4a", n - 1)))
            .collect();
        assert_eq!(outputs, expected);

        let mut calls = runner.calls();
        calls.sort();
        assert_eq!(calls.len(), 7);
        assert_eq!(
            calls[0],
            vec![
                "ffmpeg".to_string(),
                "-i".to_string(),
                "in/01.mp3".to_string(),
                "-c".to_string(),
                "copy".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                s(&expected[0]),
            ]
        );
    }

    #[tokio::test]
    async fn transcode_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner {
            fail_on: Some("03.mp3".to_string()),
            ..RecordingRunner::default()
        });
        let inputs: Vec<PathBuf> = (1..=5).map(|n| PathBuf::from(format!("in/{n:02}.mp3"))).collect();

        let result = processor(&runner).transcode(&inputs, dir.path()).await;

        assert_matches!(result, Err(ToolError::CommandExitCode { command, .. }) if command.contains("03.mp3"));
    }

    #[tokio::test]
    async fn concatenate_writes_filelist() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let inputs = vec![PathBuf::from("/in/1.m4a"), PathBuf::from("/in/2.m4a")];

        let output = processor(&runner)
            .concatenate(&inputs, dir.path())
            .await
            .unwrap();

        let filelist = dir.path().join("filelist.txt");
        assert_eq!(output, dir.path().join("concat.m4b"));
        assert_eq!(
            std::fs::read_to_string(&filelist).unwrap(),
            "file '/in/1.m4a'\nfile '/in/2.m4a'\n"
        );
        assert_eq!(
            runner.calls(),
            vec![vec![
                "ffmpeg".to_string(),
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                s(&filelist),
                "-c".to_string(),
                "copy".to_string(),
                "-vn".to_string(),
                s(&output),
            ]]
        );
    }

    #[tokio::test]
    async fn embed_metadata_replaces_container() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("concat.m4b");
        let temporary = dir.path().join("concat.withMetadata.m4b");
        std::fs::write(&container, b"original").unwrap();
        // left over from an earlier run
        std::fs::write(&temporary, b"stale").unwrap();
        let runner = Arc::new(RecordingRunner::touching_outputs());

        processor(&runner)
            .embed_metadata(&container, ";FFMETADATA1\nartist=x", "The Book")
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                "ffmpeg".to_string(),
                "-i".to_string(),
                s(&container),
                "-i".to_string(),
                s(&dir.path().join("concat.metadata")),
                "-map_metadata".to_string(),
                "1".to_string(),
                "-c".to_string(),
                "copy".to_string(),
                "-metadata".to_string(),
                "title=The Book".to_string(),
                s(&temporary),
            ]
        );
        assert!(!temporary.exists());
        assert!(!dir.path().join("concat.metadata").exists());
        // the touched empty output was moved over the container
        assert_eq!(std::fs::read(&container).unwrap(), b"");
    }

    #[tokio::test]
    async fn failed_embed_leaves_container_untouched() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("concat.m4b");
        std::fs::write(&container, b"original").unwrap();
        let runner = Arc::new(RecordingRunner {
            fail_on: Some("attached_pic".to_string()),
            ..RecordingRunner::default()
        });

        let result = processor(&runner)
            .embed_cover(&container, Path::new("cover.jpg"))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&container).unwrap(), b"original");
        assert!(!dir.path().join("concat.withCover.m4b").exists());
    }

    #[tokio::test]
    async fn embed_cover_maps_picture_stream() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("concat.m4b");
        std::fs::write(&container, b"original").unwrap();
        let runner = Arc::new(RecordingRunner::touching_outputs());

        processor(&runner)
            .embed_cover(&container, Path::new("cover.jpg"))
            .await
            .unwrap();

        assert_eq!(
            runner.calls()[0],
            vec![
                "ffmpeg".to_string(),
                "-i".to_string(),
                s(&container),
                "-i".to_string(),
                "cover.jpg".to_string(),
                "-map".to_string(),
                "0".to_string(),
                "-map".to_string(),
                "1".to_string(),
                "-c".to_string(),
                "copy".to_string(),
                "-disposition:v".to_string(),
                "attached_pic".to_string(),
                s(&dir.path().join("concat.withCover.m4b")),
            ]
        );
    }

    #[tokio::test]
    async fn extracts_cover_into_work_dir() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());

        let cover = processor(&runner)
            .extract_cover(Path::new("book/01.m4a"), dir.path())
            .await
            .unwrap();

        assert_eq!(cover, dir.path().join("cover.jpg"));
        assert_eq!(
            runner.calls()[0],
            vec![
                "ffmpeg".to_string(),
                "-i".to_string(),
                "book/01.m4a".to_string(),
                "-an".to_string(),
                "-vcodec".to_string(),
                "copy".to_string(),
                s(&cover),
            ]
        );
    }

    #[tokio::test]
    async fn embed_chapters_imports_into_copy() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("concat.m4b");
        std::fs::write(&container, b"audio").unwrap();
        let runner = Arc::new(RecordingRunner::default());

        processor(&runner)
            .embed_chapters(&container, "CHAPTER00=00:00:00.000\nCHAPTER00NAME=Intro")
            .await
            .unwrap();

        let temporary = dir.path().join("concat.withChapters.m4b");
        assert_eq!(
            runner.calls(),
            vec![vec!["mp4chaps".to_string(), "--import".to_string(), s(&temporary)]]
        );
        assert!(!temporary.exists());
        assert!(!dir.path().join("concat.withChapters.chapters.txt").exists());
        assert_eq!(std::fs::read(&container).unwrap(), b"audio");
    }

    #[tokio::test]
    async fn write_metadata_keeps_tags_as_given() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("Dune.m4b");
        std::fs::write(&container, b"original").unwrap();
        let runner = Arc::new(RecordingRunner::touching_outputs());

        processor(&runner)
            .write_metadata(&container, ";FFMETADATA1\nalbum=Dune")
            .await
            .unwrap();

        let temporary = dir.path().join("Dune.withMetadata.m4b");
        assert_eq!(
            runner.calls(),
            vec![vec![
                "ffmpeg".to_string(),
                "-i".to_string(),
                s(&container),
                "-i".to_string(),
                s(&dir.path().join("Dune.metadata")),
                "-map_metadata".to_string(),
                "1".to_string(),
                "-c".to_string(),
                "copy".to_string(),
                s(&temporary),
            ]]
        );
        assert!(!temporary.exists());
        assert!(!dir.path().join("Dune.metadata").exists());
        assert_eq!(std::fs::read(&container).unwrap(), b"");
    }

    #[tokio::test]
    async fn failed_metadata_write_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("Dune.m4b");
        std::fs::write(&container, b"original").unwrap();
        let runner = Arc::new(RecordingRunner {
            fail_on: Some("map_metadata".to_string()),
            ..RecordingRunner::default()
        });

        let result = processor(&runner)
            .write_metadata(&container, ";FFMETADATA1\nalbum=Dune")
            .await;

        assert_matches!(result, Err(ToolError::CommandExitCode { .. }));
        assert_eq!(std::fs::read(&container).unwrap(), b"original");
        assert!(!dir.path().join("Dune.withMetadata.m4b").exists());
        assert!(!dir.path().join("Dune.metadata").exists());
    }
}
