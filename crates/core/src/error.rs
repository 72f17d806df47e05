use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown intent `{0}`")]
    UnknownIntent(String),
}

/// Raised while assembling a catalog; a constructed engine cannot fail on input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("intent `{0}` is declared more than once")]
    DuplicateIntent(String),
    #[error("catalog must declare exactly one `{name}` intent, found {found}")]
    RequiredIntent { name: &'static str, found: usize },
    #[error("fallback intent must not carry trigger patterns")]
    FallbackHasPatterns,
    #[error("emergency intent must have the strictly highest priority")]
    EmergencyNotHighestPriority,
    #[error("intent `{0}` has no trigger patterns")]
    NoPatterns(String),
    #[error("intent `{intent}` has an empty trigger pattern")]
    EmptyPattern { intent: String },
    #[error("pattern `{pattern}` of intent `{intent}` is not lowercase")]
    PatternNotLowercase { intent: String, pattern: String },
    #[error("no responder registered for intent `{0}`")]
    MissingResponder(String),
    #[error("invalid catalog json: {0}")]
    InvalidJson(String),
}
