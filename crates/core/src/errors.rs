use thiserror::Error;

/// Failure of a single skill run. Callers log it and move on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SkillError {
    #[error("request to {origin} failed: {message}")]
    Fetch { origin: String, message: String },
    #[error("could not decode {origin} response as {encoding}")]
    Decode { origin: String, encoding: &'static str },
    #[error("unexpected {origin} response: {message}")]
    Parse { origin: String, message: String },
    #[error("message delivery failed: {0}")]
    Delivery(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl SkillError {
    pub fn fetch(origin: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch { origin: origin.into(), message: message.to_string() }
    }

    pub fn parse(origin: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse { origin: origin.into(), message: message.to_string() }
    }

    /// Stable label for structured logs.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Parse { .. } => "parse",
            Self::Delivery(_) => "delivery",
            Self::Configuration(_) => "configuration",
        }
    }
}
