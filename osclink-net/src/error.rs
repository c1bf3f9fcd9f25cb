//! Codec errors.

use std::fmt;

/// Why a run of bytes could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remained than the field needs.
    Truncated { at: usize, needed: usize, available: usize },
    /// No NUL terminator before the end of the packet.
    MissingTerminator { at: usize },
    /// A blob or bundle element declared a negative length.
    NegativeLength { at: usize, len: i32 },
    /// A type-tag string did not start with `,`.
    MissingTypeTags { at: usize },
    /// Bundles nested deeper than the parser accepts.
    TooDeep { depth: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { at, needed, available } => write!(
                f,
                "truncated at byte {}: need {} bytes, {} available",
                at, needed, available
            ),
            DecodeError::MissingTerminator { at } => {
                write!(f, "string at byte {} has no NUL terminator", at)
            }
            DecodeError::NegativeLength { at, len } => {
                write!(f, "negative length {} at byte {}", len, at)
            }
            DecodeError::MissingTypeTags { at } => {
                write!(f, "type-tag string at byte {} does not start with ','", at)
            }
            DecodeError::TooDeep { depth } => {
                write!(f, "bundles nested {} levels deep", depth)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Why a message or bundle could not be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// An `Invalid` value has no wire representation.
    InvalidValue { index: usize },
    /// Strings cannot carry NUL bytes on the wire.
    InteriorNul,
    /// A blob or bundle element longer than an int32 length can express.
    TooLarge { len: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidValue { index } => {
                write!(f, "value {} is invalid and cannot be encoded", index)
            }
            EncodeError::InteriorNul => write!(f, "string contains a NUL byte"),
            EncodeError::TooLarge { len } => {
                write!(f, "{} bytes exceed the int32 length limit", len)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<EncodeError> for std::io::Error {
    fn from(e: EncodeError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    }
}
