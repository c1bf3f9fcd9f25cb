//! OSC messages: an address, ordered values and a time tag.

use std::fmt;

use crate::error::{AccessError, TypeMismatch};
use crate::pool::ValueBatch;
use crate::timestamp::Timestamp;
use crate::value::{Value, ValueKind};

/// A single OSC message.
///
/// The value storage is rented from the value pool and goes back to it when
/// the message is dropped or [`dispose`](Message::dispose)d. A message with an
/// empty address is the "no message" sentinel returned by polling APIs.
#[derive(Clone, Default)]
pub struct Message {
    address: String,
    values: ValueBatch,
    timestamp: Timestamp,
}

impl Message {
    pub fn new<A, I>(address: A, values: I) -> Self
    where
        A: Into<String>,
        I: IntoIterator<Item = Value>,
    {
        Self::from_batch(address, values.into_iter().collect(), Timestamp::IMMEDIATE)
    }

    /// Build from an already rented batch without copying it.
    pub fn from_batch(address: impl Into<String>, values: ValueBatch, timestamp: Timestamp) -> Self {
        Self {
            address: address.into(),
            values,
            timestamp,
        }
    }

    /// The "absent" sentinel: empty address, no values.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.address.is_empty()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Release the value storage (and any owned blob buffers) to the pools.
    pub fn dispose(self) {
        drop(self);
    }

    // --- Indexed access ---

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn value(&self, index: usize) -> Result<&Value, AccessError> {
        self.values.get(index).ok_or(AccessError::OutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Value at `index` when it has the `expected` kind.
    pub fn value_of(&self, index: usize, expected: ValueKind) -> Result<&Value, AccessError> {
        let value = self.value(index)?;
        if value.kind() == expected {
            Ok(value)
        } else {
            Err(AccessError::Mismatch {
                index,
                mismatch: TypeMismatch {
                    expected,
                    found: value.kind(),
                },
            })
        }
    }

    pub fn int(&self, index: usize) -> Result<i32, AccessError> {
        self.value_of(index, ValueKind::Int).map(Value::as_int)
    }

    pub fn float(&self, index: usize) -> Result<f32, AccessError> {
        self.value_of(index, ValueKind::Float).map(Value::as_float)
    }

    pub fn string(&self, index: usize) -> Result<&str, AccessError> {
        self.value_of(index, ValueKind::String).map(Value::as_str)
    }

    pub fn bool(&self, index: usize) -> Result<bool, AccessError> {
        self.value_of(index, ValueKind::Bool).map(Value::as_bool)
    }

    pub fn blob(&self, index: usize) -> Result<&[u8], AccessError> {
        self.value_of(index, ValueKind::Blob).map(Value::as_blob)
    }

    pub fn int_or(&self, index: usize, default: i32) -> i32 {
        self.int(index).unwrap_or(default)
    }

    pub fn float_or(&self, index: usize, default: f32) -> f32 {
        self.float(index).unwrap_or(default)
    }

    pub fn string_or<'a>(&'a self, index: usize, default: &'a str) -> &'a str {
        self.string(index).unwrap_or(default)
    }

    pub fn bool_or(&self, index: usize, default: bool) -> bool {
        self.bool(index).unwrap_or(default)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.values == other.values
            && self.timestamp == other.timestamp
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("address", &self.address)
            .field("values", &self.values)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        f.write_str("\t")?;
        for value in self.values.iter() {
            write!(f, "{} ", value)?;
        }
        write!(f, "({})", self.timestamp)
    }
}
