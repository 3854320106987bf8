//! External audio tooling
//!
//! Collaborator traits used by the audiobook pipeline and their
//! implementations on top of ffmpeg, ffprobe and mp4chaps.

mod command;
mod ffmpeg;
mod files;
pub mod pool;
mod types;

pub use command::{describe, CommandOutput, CommandRunner, SystemRunner};
pub use ffmpeg::{parse_probe, Ffmpeg, DEFAULT_CODEC};
pub use files::WalkdirLister;
pub use types::{AudioFileLister, AudioProcessor, MetadataReader, ToolError};
