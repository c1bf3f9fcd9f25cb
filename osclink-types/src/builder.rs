//! Fluent construction of messages.

use std::sync::Arc;

use crate::error::BuildError;
use crate::message::Message;
use crate::value::Value;

/// Accumulates an address and values, then builds a [`Message`].
///
/// The builder is reset after every successful `build`, so one instance can
/// be reused on a hot path.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    address: String,
    values: Vec<Value>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(&mut self, address: impl Into<String>) -> &mut Self {
        self.address = address.into();
        self
    }

    pub fn add_int(&mut self, value: i32) -> &mut Self {
        self.add(Value::Int(value))
    }

    pub fn add_float(&mut self, value: f32) -> &mut Self {
        self.add(Value::Float(value))
    }

    pub fn add_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.add(Value::String(value.into()))
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.add(Value::Bool(value))
    }

    /// Copy `data` into a pooled blob.
    pub fn add_blob(&mut self, data: &[u8]) -> &mut Self {
        self.add(Value::blob_copy(data))
    }

    /// Alias shared bytes as a blob without copying.
    pub fn add_shared_blob(&mut self, data: Arc<[u8]>) -> &mut Self {
        self.add(Value::blob_shared(data))
    }

    pub fn add(&mut self, value: Value) -> &mut Self {
        self.values.push(value);
        self
    }

    pub fn reset(&mut self) {
        self.address.clear();
        self.values.clear();
    }

    pub fn build(&mut self) -> Result<Message, BuildError> {
        if self.address.is_empty() {
            return Err(BuildError::MissingAddress);
        }
        let msg = Message::new(std::mem::take(&mut self.address), self.values.drain(..));
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_resets() {
        let mut builder = MessageBuilder::new();
        let msg = builder
            .address("/synth/freq")
            .add_float(440.0)
            .add_int(1)
            .add_string("sine")
            .add_bool(false)
            .add_blob(&[1, 2, 3])
            .build()
            .unwrap();

        assert_eq!(msg.address(), "/synth/freq");
        assert_eq!(msg.len(), 5);
        assert_eq!(msg.blob(4), Ok(&[1u8, 2, 3][..]));

        assert_eq!(builder.build(), Err(BuildError::MissingAddress));
    }

    #[test]
    fn missing_address_is_an_error() {
        let mut builder = MessageBuilder::new();
        builder.add_int(1);
        assert_eq!(builder.build().unwrap_err(), BuildError::MissingAddress);
    }
}
