use std::fmt;

/// Errors surfaced by the engine.
///
/// Graph operations never fail: unknown ids and cyclic data degrade to
/// well-defined results. These variants cover caller misuse and malformed
/// input documents only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A blank permission id reached a session or template operation.
    InvalidArgument(String),
    /// A template name that the template set does not define.
    UnknownTemplate(String),
    /// Catalog JSON could not be deserialized.
    CatalogParse(String),
    /// Template document could not be deserialized.
    TemplateParse(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::UnknownTemplate(name) => write!(f, "unknown template: {name}"),
            Self::CatalogParse(msg) => write!(f, "catalog parse error: {msg}"),
            Self::TemplateParse(msg) => write!(f, "template parse error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
