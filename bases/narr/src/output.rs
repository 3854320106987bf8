// bases/narr/src/output.rs
use std::path::{Path, PathBuf};

use audiobook::{BookEdit, BookTags, Rename, Track};

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_project_start(&self, project_dir: &Path) {
        println!("\nRunning on {}", project_dir.display());
    }

    pub fn print_outputs(&self, paths: &[PathBuf]) {
        println!();
        for path in paths {
            println!("{}", path.display());
        }
    }

    pub fn print_section(&self, title: &str, body: &str) {
        println!("\n{title}:");
        println!("{body}");
    }

    pub fn print_files(&self, tracks: &[Track]) {
        println!("\nFiles:");
        for track in tracks {
            if self.verbose {
                println!(
                    "{} ({}, {:.1}s)",
                    track.file().display(),
                    track.title(),
                    track.duration()
                );
            } else {
                println!("{}", track.file().display());
            }
        }
    }

    pub fn print_generated(&self, file: &Path) {
        println!("Created {}", file.display());
    }

    pub fn print_book_tags(&self, book: &BookTags, tags: &[String]) {
        println!("# {}", book.file.display());
        if tags.is_empty() {
            println!("{}", book.raw.trim_end());
        } else {
            for line in book.selected(tags) {
                println!("{line}");
            }
        }
        println!();
    }

    pub fn print_edit(&self, edit: &BookEdit) {
        if edit.changes.is_empty() {
            if self.verbose {
                println!("# {}", edit.file.display());
                println!("Nothing to do.");
            }
            return;
        }

        println!("# {}", edit.file.display());
        if self.verbose {
            println!("Metadata after update:");
            println!("{}", edit.metadata);
        }
        for change in &edit.changes {
            println!("{change}");
        }
        if edit.written {
            println!("Metadata successfully changed for file {}", edit.file.display());
        }
        println!();
    }

    pub fn print_books(&self, books: &[PathBuf], file_name_only: bool) {
        for book in books {
            match book.file_name().filter(|_| file_name_only) {
                Some(name) => println!("{}", name.to_string_lossy()),
                None => println!("{}", book.display()),
            }
        }
    }

    pub fn print_renames(&self, renames: &[Rename], dry_run: bool) {
        for rename in renames {
            let name = |path: &Path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            };
            println!("{} -> {}", name(&rename.from), name(&rename.to));
        }
        if dry_run && !renames.is_empty() {
            println!("\n(dry run, nothing renamed)");
        }
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}
