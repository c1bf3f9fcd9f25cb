//! Error types for value access, message construction and pool setup.

use std::fmt;

use crate::value::ValueKind;

/// A value was read as a variant it does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: ValueKind,
    pub found: ValueKind,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch: expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for TypeMismatch {}

/// Error from an indexed, typed read of a message value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    OutOfRange { index: usize, len: usize },
    Mismatch { index: usize, mismatch: TypeMismatch },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::OutOfRange { index, len } => {
                write!(f, "value index {} is out of range, size is {}", index, len)
            }
            AccessError::Mismatch { index, mismatch } => {
                write!(f, "value index {}: {}", index, mismatch)
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Error from [`MessageBuilder::build`](crate::MessageBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    MissingAddress,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingAddress => {
                write!(f, "message address is empty, set one with MessageBuilder::address")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Error from configuring the process-wide pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was already used (or configured) before `configure` ran.
    AlreadyInitialized(&'static str),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::AlreadyInitialized(name) => {
                write!(f, "{} pool is already initialized", name)
            }
        }
    }
}

impl std::error::Error for PoolError {}
