// bases/narr/src/args.rs
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Assemble audiobooks from chapter tracks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Which projects a command works on
#[derive(clap::Args, Debug, Clone)]
pub struct Selection {
    /// Project directory or narr.yaml file
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Search for projects in child dirs recursively
    #[arg(short, long, conflicts_with = "multi")]
    pub recursive: bool,

    /// Use the provided config for every immediate child dir
    #[arg(short, long)]
    pub multi: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert projects to m4b
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Audio codec used when a project converts its tracks
        #[arg(long)]
        codec: Option<String>,
    },

    /// Show what a run would produce without converting anything
    Check {
        #[command(flatten)]
        selection: Selection,

        /// Only show one part of the preview
        #[arg(long, value_enum)]
        only: Option<CheckPart>,
    },

    /// Write a starter narr.yaml
    Generate {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Show or edit the tags of finished books
    Metadata {
        #[command(subcommand)]
        command: MetadataCommand,
    },

    /// List or rename finished books
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommand {
    /// Print the tags of every m4b at or below a path
    Show {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only print these tags
        #[arg(short, long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Rewrite tags of every m4b at or below a path with a regex
    Edit {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Tags to rewrite
        #[arg(short, long = "tag", value_delimiter = ',', required = true)]
        tags: Vec<String>,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List every m4b at or below a path
    List {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print only the file name
        #[arg(long, alias = "noPath")]
        no_path: bool,
    },

    /// Rename every m4b at or below a path with a regex
    Rename {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },
}

/// Regex rewrite shared by tag edits and renames
#[derive(clap::Args, Debug, Clone)]
pub struct RewriteArgs {
    /// Regular expression with capture groups
    #[arg(long)]
    pub regex: String,

    /// Format with one %s per capture group
    #[arg(long)]
    pub format: String,

    /// Only show what would change
    #[arg(long, alias = "dryRun")]
    pub dry_run: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPart {
    Files,
    Chapters,
    Metadata,
    Filename,
}

impl CheckPart {
    pub const ALL: [CheckPart; 4] = [
        CheckPart::Files,
        CheckPart::Chapters,
        CheckPart::Metadata,
        CheckPart::Filename,
    ];
}
