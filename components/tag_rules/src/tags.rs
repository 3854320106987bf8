use std::fmt;

/// First line of every ffmetadata block
pub const FFMETADATA_HEADER: &str = ";FFMETADATA1";

/// Tags that only make sense per track and are dropped from book metadata
const POSITIONAL_TAGS: [&str; 2] = ["track", "disc"];

/// Ordered tag mapping
///
/// Keys are unique and keep the position of their first appearance, so a
/// parsed block can be rendered again in its original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: Vec<(String, String)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an ffmetadata block
    ///
    /// The first line is the format marker and is skipped. Every following
    /// `key=value` line becomes a tag; a line without `=` becomes a tag with
    /// an empty value. Backslash escapes are resolved, and a line ending in an
    /// escaped newline continues on the next one. Parsing stops at the first
    /// `[SECTION]` header since chapter and stream sections do not belong to
    /// the global tags.
    pub fn parse(block: &str) -> Self {
        let mut tags = Self::new();
        let mut lines = block.lines().skip(1);

        while let Some(line) = lines.next() {
            let mut line = line.trim_end_matches('\r').to_string();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                break;
            }

            while ends_with_escape(&line) {
                let Some(next) = lines.next() else { break };
                line.push('\n');
                line.push_str(next.trim_end_matches('\r'));
            }

            let (key, value) = split_entry(&line);
            tags.insert(key, value);
        }

        tags
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a tag, keeping its position when it already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Tag names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the metadata block for a whole book
    ///
    /// Same as [`Display`](fmt::Display) but without `track` and `disc`.
    pub fn render_book(&self) -> String {
        let mut lines = vec![FFMETADATA_HEADER.to_string()];
        lines.extend(
            self.iter()
                .filter(|(key, _)| !POSITIONAL_TAGS.contains(key))
                .map(|(key, value)| format!("{}={}", escape(key), escape(value))),
        );
        lines.join("\n")
    }
}

impl fmt::Display for TagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{FFMETADATA_HEADER}")?;
        for (key, value) in self.iter() {
            write!(f, "\n{}={}", escape(key), escape(value))?;
        }
        Ok(())
    }
}

/// Odd number of trailing backslashes, so the line break itself is escaped
fn ends_with_escape(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=`, resolving escapes on both sides
fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        let target = if in_value { &mut value } else { &mut key };
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    target.push(escaped);
                }
            }
            '=' if !in_value => in_value = true,
            c => target.push(c),
        }
    }

    (key, value)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
