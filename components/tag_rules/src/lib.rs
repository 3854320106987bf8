//! Tag rules for audiobook metadata
//!
//! This component provides:
//! - [`TagMap`]: an ordered tag mapping parsed from an ffmetadata block
//! - [`MetadataRule`]: delete/set/regex transformations of a single tag
//! - [`ChapterRule`]: regex rewrites of chapter titles
//! - [`edit_tags`]: bulk regex rewrites of existing files' tags
//!
//! # Examples
//!
//! ```
//! use tag_rules::{MetadataRule, TagMap};
//!
//! let mut tags = TagMap::parse(";FFMETADATA1\ntitle=Chapter 01-02: Star dust");
//! let rule = MetadataRule::regex("title", r"^Chapter (\d+)-\d+: (.+)$", "%s - %s");
//! rule.apply(&mut tags).unwrap();
//! assert_eq!(tags.get("title"), Some("01 - Star dust"));
//! ```

mod edit;
mod error;
mod rules;
mod tags;
mod template;

pub use edit::{edit_tags, select_tags, TagChange};
pub use error::{RuleError, ValidationError};
pub use rules::{ChapterRule, MetadataRule, RuleKind};
pub use tags::{TagMap, FFMETADATA_HEADER};
pub use template::apply_regex;
