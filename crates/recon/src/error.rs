use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconError {
    /// TOML / JSON parse or deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (negative tolerance, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A source priority token that is neither `structured` nor `unstructured`.
    #[error("unknown source '{0}' (expected structured|unstructured)")]
    UnknownSource(String),
    /// A field name outside the header vocabulary.
    #[error("unknown field '{0}'")]
    UnknownField(String),
}
