// components/audiobook/src/naming.rs
use std::path::{Path, PathBuf};

/// Extension of the finished book
pub const BOOK_EXTENSION: &str = "m4b";

/// Replace every character outside `[A-Za-z0-9 _.\-']` with `_`
pub fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | ' ' | '_' | '.' | '-' | '\'' => c,
            _ => '_',
        })
        .collect()
}

/// `base/<artist>/<album>/<album>.m4b` with every component sanitized
///
/// Components that would be empty, `.` or `..` become `_`, so the book always
/// lands two levels below `base`.
pub fn book_path(base: &Path, artist: &str, album: &str) -> PathBuf {
    let album = path_component(album);
    base.join(path_component(artist))
        .join(&album)
        .join(format!("{album}.{BOOK_EXTENSION}"))
}

fn path_component(name: &str) -> String {
    match sanitize(name) {
        name if name.is_empty() || name == "." || name == ".." => "_".to_string(),
        name => name,
    }
}
