//! Parse errors for the shared archive types.

/// A value that does not name a data type or channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown data type code: {0}")]
    UnknownDataTypeCode(u8),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// Channel syntax is `<type>:<number>`.
    #[error("invalid channel {input:?}: {reason}")]
    InvalidChannel { input: String, reason: String },
}

impl Error {
    pub fn invalid_channel(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidChannel {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::UnknownDataTypeCode(9).to_string(),
            "unknown data type code: 9"
        );
        assert_eq!(
            Error::invalid_channel("camera", "expected <type>:<number>").to_string(),
            "invalid channel \"camera\": expected <type>:<number>"
        );
    }
}
