//! # osclink-types
//!
//! In-memory model for Open Sound Control packets: argument values, NTP time
//! tags, messages, bundles, and the array pools that keep message and blob
//! storage off the allocator on hot paths.
//! The wire codec and transports live in `osclink-net`.

mod builder;
mod bundle;
pub mod error;
mod message;
pub mod pool;
mod timestamp;
mod value;

pub use builder::MessageBuilder;
pub use bundle::{Bundle, Packet};
pub use error::{AccessError, BuildError, PoolError, TypeMismatch};
pub use message::Message;
pub use pool::{ArrayPool, PoolConfig, PoolStats, PooledBytes, ValueBatch};
pub use timestamp::{Timestamp, NTP_UNIX_OFFSET};
pub use value::{Blob, Value, ValueKind};
