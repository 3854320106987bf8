use thiserror::Error;

/// Failures while applying a rule to a tag value or chapter title
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    #[error("tag {tag} does not exist")]
    MissingTag { tag: String },

    #[error("rule regex '{pattern}' is invalid")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "expected {expected} matches based on the format string, but got {actual} matches for input '{input}' using regex '{pattern}'"
    )]
    TemplateArity {
        expected: usize,
        actual: usize,
        input: String,
        pattern: String,
    },
}

/// Structural problems in a configured rule, detected when the config is loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rule must have a tag")]
    MissingTag,

    #[error("delete rule cannot have value, regex, or format")]
    DeleteWithArguments,

    #[error("set rule requires a value")]
    SetWithoutValue,

    #[error("set rule cannot have regex or format")]
    SetWithPattern,

    #[error("regex rule requires both regex and format")]
    RegexIncomplete,

    #[error("regex rule cannot have value")]
    RegexWithValue,
}
