use std::fmt;

use regex::Regex;

use crate::error::RuleError;
use crate::tags::TagMap;
use crate::template::apply_regex;

/// One tag value changed by [`edit_tags`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChange {
    pub tag: String,
    pub before: String,
    pub after: String,
}

impl fmt::Display for TagChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.tag, self.before, self.after)
    }
}

/// Rewrite the selected tags of a file through `regex` and `format`
///
/// Unlike [`MetadataRule`](crate::MetadataRule), absent tags are skipped
/// rather than rejected, since a bulk edit runs over many files that do not
/// all carry the same tags. Changes are reported in tag order; values the
/// pattern leaves alone produce no change.
pub fn edit_tags(
    tags: &mut TagMap,
    names: &[String],
    regex: &Regex,
    format: &str,
) -> Result<Vec<TagChange>, RuleError> {
    let selected: Vec<(String, String)> = tags
        .iter()
        .filter(|(key, _)| names.iter().any(|name| name == key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let mut changes = Vec::new();
    for (tag, before) in selected {
        let after = apply_regex(&before, regex, format)?;
        if after != before {
            tags.insert(tag.clone(), after.clone());
            changes.push(TagChange { tag, before, after });
        }
    }

    Ok(changes)
}

/// Values of the selected tags in tag order
pub fn select_tags<'a>(tags: &'a TagMap, names: &[String]) -> Vec<(&'a str, &'a str)> {
    tags.iter()
        .filter(|(key, _)| names.iter().any(|name| name == key))
        .collect()
}
