use std::io;
use thiserror::Error;

/// Main error type for the Huffman codec and archive container.
#[derive(Error, Debug)]
pub enum HuffError {
    /// An I/O error occurred on the underlying storage
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The data is not a valid frame or archive (bad magic, truncation, bad code lengths)
    #[error("Format error: {0}")]
    Format(String),
    /// A requested archive member does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// A buffer could not be sized for the declared data
    #[error("Allocation error: {0}")]
    Allocation(String),
    /// An invalid argument was provided
    #[error("Invalid argument: {0}")]
    InvalidArg(String),
    /// There is nothing to build a code from
    #[error("Empty input: no symbols to encode")]
    EmptyInput,
}

impl HuffError {
    /// Maps an unexpected end of file while parsing fixed-size structures to a
    /// format error, leaving every other I/O failure as is.
    pub(crate) fn truncated(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            HuffError::Format(format!("truncated {}", what))
        } else {
            HuffError::Io(err)
        }
    }
}

/// A specialized `Result` type for codec and archive operations.
pub type Result<T> = std::result::Result<T, HuffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        assert_eq!(
            HuffError::Io(io_error).to_string(),
            "I/O error: file not found"
        );

        assert_eq!(
            HuffError::Format("bad magic".to_string()).to_string(),
            "Format error: bad magic"
        );

        assert_eq!(
            HuffError::NotFound("a.txt".to_string()).to_string(),
            "Not found: a.txt"
        );

        assert_eq!(
            HuffError::InvalidArg("test".to_string()).to_string(),
            "Invalid argument: test"
        );
    }

    #[test]
    fn test_truncated_mapping() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            HuffError::truncated(eof, "frame header"),
            HuffError::Format(msg) if msg == "truncated frame header"
        ));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            HuffError::truncated(denied, "frame header"),
            HuffError::Io(_)
        ));
    }
}
