use std::{
    error::Error,
    fmt::Display,
    io::{self},
};

/// Errors that may occur when reading a frame from a stream.
#[derive(Debug)]
pub enum ReadError {
    IoError(io::Error),
    /// The frame started with a tag other than the one expected at this point.
    InvalidTag(u8),
    /// The length field of a response disagrees with the requested length.
    LengthMismatch { expected: u16, got: u16 },
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        ReadError::IoError(value)
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::IoError(error) => write!(f, "{}", error),
            ReadError::InvalidTag(tag) => write!(f, "Received frame with invalid tag 0x{:02x}", tag),
            ReadError::LengthMismatch { expected, got } => {
                write!(
                    f,
                    "Frame length mismatch! Expected {}, but got {}",
                    expected, got
                )
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::IoError(error) => Some(error),
            _ => None,
        }
    }
}
