//! Error types for aggregate fetch data handling.

use thiserror::Error;

/// Result type alias for common aggregate fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for decoding and value handling.
#[derive(Error, Debug)]
pub enum Error {
    // Decode errors (20-29)
    #[error("unsupported DN encoding: type code {type_code}, width {width} bits")]
    UnsupportedDn { type_code: u8, width: u8 },

    #[error("malformed DN: {0}")]
    MalformedDn(String),

    #[error("malformed channel sample group: {0}")]
    MalformedGroup(String),

    #[error("unexpected end of payload while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("bad payload magic: expected {expected:?}, got {actual:?}")]
    BadMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    // Value errors (30-39)
    #[error("invalid time value: {0}")]
    InvalidTime(String),

    #[error("invalid SCLK value: {0}")]
    InvalidSclk(String),

    #[error("value out of range for {kind}: {value}")]
    OutOfRange { kind: &'static str, value: i128 },
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in batch failure logs.
    pub fn code(&self) -> u32 {
        match self {
            Error::UnsupportedDn { .. } => 20,
            Error::MalformedDn(_) => 21,
            Error::MalformedGroup(_) => 22,
            Error::UnexpectedEof { .. } => 23,
            Error::BadMagic { .. } => 24,
            Error::UnsupportedVersion(_) => 25,
            Error::InvalidTime(_) => 30,
            Error::InvalidSclk(_) => 31,
            Error::OutOfRange { .. } => 32,
        }
    }

    /// True for errors raised while decoding a stored payload.
    pub fn is_decode(&self) -> bool {
        (20..30).contains(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_classified() {
        let err = Error::UnsupportedDn {
            type_code: 9,
            width: 12,
        };
        assert_eq!(err.code(), 20);
        assert!(err.is_decode());
        assert!(!Error::InvalidTime("x".into()).is_decode());
        assert_eq!(
            Error::OutOfRange {
                kind: "u8",
                value: 300
            }
            .code(),
            32
        );
    }

    #[test]
    fn unsupported_dn_message_names_width() {
        let err = Error::UnsupportedDn {
            type_code: 7,
            width: 16,
        };
        assert_eq!(
            err.to_string(),
            "unsupported DN encoding: type code 7, width 16 bits"
        );
    }
}
