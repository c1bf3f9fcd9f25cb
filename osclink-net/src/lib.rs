//! Open Sound Control 1.0 over UDP.
//!
//! Decoding (`reader`, `parser`), encoding (`writer`), and the outbound path:
//! a bounded drop-oldest [`SendQueue`] drained by a dedicated sender thread
//! into a [`Transport`]. [`OscClient`] and [`OscServer`] wire those pieces to
//! UDP sockets.

pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod queue;
pub mod reader;
pub mod sender;
pub mod server;
pub mod transport;
pub mod writer;

pub use client::{ClientConfig, ClientEvent, OscClient};
pub use config::Config;
pub use error::{DecodeError, EncodeError};
pub use parser::{Parser, MAX_BUNDLE_DEPTH};
pub use queue::SendQueue;
pub use sender::{spawn_sender, SenderHandle, SenderOptions};
pub use server::{OscServer, ServerConfig};
pub use transport::{NullTransport, RecordingTransport, Transport, UdpTransport};
pub use writer::{encode, encode_message, write_packet};
