use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, ValidationError};
use crate::tags::TagMap;
use crate::template::apply_regex;

/// What a [`MetadataRule`] does to its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Delete,
    Set,
    Regex,
}

/// Rule modifying one metadata tag of every track
///
/// Rules are validated structurally when the configuration is loaded. The
/// regex itself is compiled when the rule is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,

    #[serde(default)]
    pub tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, rename = "regex", alias = "pattern", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, rename = "format", alias = "template", skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.is_empty())
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl MetadataRule {
    pub fn delete(tag: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Delete,
            tag: tag.into(),
            value: None,
            pattern: None,
            template: None,
        }
    }

    pub fn set(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Set,
            tag: tag.into(),
            value: Some(value.into()),
            pattern: None,
            template: None,
        }
    }

    pub fn regex(
        tag: impl Into<String>,
        pattern: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            kind: RuleKind::Regex,
            tag: tag.into(),
            value: None,
            pattern: Some(pattern.into()),
            template: Some(template.into()),
        }
    }

    /// Check that the fields fit the rule kind
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tag.is_empty() {
            return Err(ValidationError::MissingTag);
        }

        match self.kind {
            RuleKind::Delete => {
                if present(&self.value) || present(&self.pattern) || present(&self.template) {
                    return Err(ValidationError::DeleteWithArguments);
                }
            }
            RuleKind::Set => {
                if !present(&self.value) {
                    return Err(ValidationError::SetWithoutValue);
                }
                if present(&self.pattern) || present(&self.template) {
                    return Err(ValidationError::SetWithPattern);
                }
            }
            RuleKind::Regex => {
                if !present(&self.pattern) || !present(&self.template) {
                    return Err(ValidationError::RegexIncomplete);
                }
                if present(&self.value) {
                    return Err(ValidationError::RegexWithValue);
                }
            }
        }

        Ok(())
    }

    /// Apply the rule to `tags`
    ///
    /// The tag must exist for every rule kind. A regex that does not match the
    /// current value leaves it untouched.
    pub fn apply(&self, tags: &mut TagMap) -> Result<(), RuleError> {
        let Some(current) = tags.get(&self.tag).map(str::to_owned) else {
            return Err(RuleError::MissingTag {
                tag: self.tag.clone(),
            });
        };

        match self.kind {
            RuleKind::Delete => {
                tags.remove(&self.tag);
            }
            RuleKind::Set => {
                tags.insert(self.tag.as_str(), self.value.clone().unwrap_or_default());
            }
            RuleKind::Regex => {
                let regex = compile(self.pattern.as_deref().unwrap_or_default())?;
                let updated =
                    apply_regex(&current, &regex, self.template.as_deref().unwrap_or_default())?;
                tags.insert(self.tag.as_str(), updated);
            }
        }

        Ok(())
    }
}

/// Rule rewriting chapter titles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRule {
    #[serde(rename = "regex", alias = "pattern")]
    pub pattern: String,

    #[serde(rename = "format", alias = "template")]
    pub template: String,
}

impl ChapterRule {
    pub fn new(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            template: template.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pattern.is_empty() || self.template.is_empty() {
            return Err(ValidationError::RegexIncomplete);
        }
        Ok(())
    }

    /// Rewrite `title`, returning it unchanged when the pattern does not match
    pub fn apply(&self, title: &str) -> Result<String, RuleError> {
        let regex = compile(&self.pattern)?;
        apply_regex(title, &regex, &self.template)
    }
}
