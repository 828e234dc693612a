use thiserror::Error;

use crate::endianness::Field;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Coarse classification of codec failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Truncated, oversized or otherwise mis-sized input.
    Buffer,
    /// Input of acceptable length whose nested structure is invalid.
    Structural,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Buffer remaining length is {remaining}, but requested {requested}.")]
    BufferUnderflow { remaining: usize, requested: usize },
    #[error("Buffer remaining length is {remaining}, but should be equal to {expected}.")]
    RemainingLengthMismatch { remaining: usize, expected: usize },
    #[error("Buffer has size of {size}, but requested position {position}.")]
    InvalidPosition { size: usize, position: usize },
    #[error("Requested value {value:#010x} not found.")]
    ValueNotFound { value: u32 },
    #[error("Destination array length is {length}, but should be a multiple of {window}.")]
    InvalidSwapWindow { length: usize, window: usize },
    #[error("Field {field:?} of {length} bytes cannot be converted as an integer")]
    InvalidIntegerWidth { field: Field, length: usize },
    #[error("Invalid field length: {field}, expected {expected} bytes, got {actual} bytes")]
    InvalidFieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("No byte order rule declared for field {field:?}")]
    MissingEndiannessRule { field: Field },
    #[error("Invalid signature magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidSignatureMagic { expected: u32, actual: u32 },
    #[error("Unsupported signature curve magic: {magic:#010x}")]
    UnsupportedSignatureCurve { magic: u32 },
    #[error("Unsupported device family fuse map: {value}")]
    UnsupportedDeviceFamily { value: u8 },
    #[error("Invalid length field: {message}, expected {expected} bytes, got {actual} bytes")]
    LengthFieldMismatch {
        message: String,
        expected: usize,
        actual: usize,
    },
}

impl CodecError {
    /// Returns whether this error is about buffer sizing or about structure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BufferUnderflow { .. }
            | Self::RemainingLengthMismatch { .. }
            | Self::InvalidPosition { .. }
            | Self::ValueNotFound { .. }
            | Self::InvalidSwapWindow { .. }
            | Self::InvalidIntegerWidth { .. }
            | Self::InvalidFieldLength { .. } => ErrorKind::Buffer,
            Self::MissingEndiannessRule { .. }
            | Self::InvalidSignatureMagic { .. }
            | Self::UnsupportedSignatureCurve { .. }
            | Self::UnsupportedDeviceFamily { .. }
            | Self::LengthFieldMismatch { .. } => ErrorKind::Structural,
        }
    }
}
