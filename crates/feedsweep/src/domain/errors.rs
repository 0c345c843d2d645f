//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("selector is empty")]
    Empty,
    #[error("unterminated attribute test in selector '{0}'")]
    Unterminated(String),
    #[error("unexpected '{rest}' in selector '{selector}'")]
    Unexpected { selector: String, rest: String },
    #[error("invalid signature `{name}`: {source}")]
    Invalid {
        name: String,
        #[source]
        source: Box<SignatureError>,
    },
}

impl SignatureError {
    /// Attach the name of the signature table entry the selector came from.
    pub fn for_signature(self, name: impl Into<String>) -> Self {
        SignatureError::Invalid {
            name: name.into(),
            source: Box::new(self),
        }
    }
}
