use regex::Regex;

use crate::error::RuleError;

/// Piece of a format string
#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Percent,
    Placeholder,
}

/// Split a format string into literals and `%s` placeholders (`%%` is a literal `%`)
fn segments(format: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = format;

    while let Some(index) = rest.find('%') {
        if index > 0 {
            segments.push(Segment::Literal(&rest[..index]));
        }
        match rest[index + 1..].chars().next() {
            Some('s') => {
                segments.push(Segment::Placeholder);
                rest = &rest[index + 2..];
            }
            Some('%') => {
                segments.push(Segment::Percent);
                rest = &rest[index + 2..];
            }
            _ => {
                segments.push(Segment::Literal("%"));
                rest = &rest[index + 1..];
            }
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    segments
}

/// Rewrite `input` by filling the capture groups of `regex` into `format`
///
/// Each `%s` in `format` takes the next capture group. When the input does
/// not match, it is returned unchanged. The number of placeholders must equal
/// the number of capture groups in the pattern.
pub fn apply_regex(input: &str, regex: &Regex, format: &str) -> Result<String, RuleError> {
    let Some(captures) = regex.captures(input) else {
        return Ok(input.to_string());
    };

    let segments = segments(format);
    let expected = segments
        .iter()
        .filter(|s| **s == Segment::Placeholder)
        .count();
    let actual = captures.len() - 1;

    if expected != actual {
        return Err(RuleError::TemplateArity {
            expected,
            actual,
            input: input.to_string(),
            pattern: regex.as_str().to_string(),
        });
    }

    let mut groups = captures
        .iter()
        .skip(1)
        .map(|group| group.map_or("", |m| m.as_str()));
    let mut output = String::with_capacity(format.len() + input.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Percent => output.push('%'),
            Segment::Placeholder => output.push_str(groups.next().unwrap_or_default()),
        }
    }

    Ok(output)
}
