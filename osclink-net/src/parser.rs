//! Recursive-descent packet decoder feeding a thread-safe message queue.
//!
//! Datagrams may arrive on an I/O thread while a different thread polls for
//! messages, so decoded messages go through a channel rather than being
//! returned. Malformed input never aborts the whole buffer: the offending
//! message or bundle element is logged and skipped, and parsing resumes at
//! the next element boundary.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendError, Sender};
use log::{error, warn};

use osclink_types::{Message, Timestamp, Value, ValueBatch};

use crate::error::DecodeError;
use crate::reader::{self, BUNDLE_TAG};

/// Bundles nested deeper than this are dropped.
pub const MAX_BUNDLE_DEPTH: usize = 64;

/// Decodes OSC packets and queues the messages they contain.
pub struct Parser {
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl Parser {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Decode the packet occupying `buf[*pos..end]`.
    ///
    /// Top-level messages get `inherited` as their timestamp (normally
    /// [`Timestamp::IMMEDIATE`]). On return `*pos` should equal `end`; a
    /// mismatch is logged as a framing inconsistency.
    pub fn parse(&self, buf: &[u8], pos: &mut usize, end: usize, inherited: Timestamp) {
        self.parse_range(buf, pos, end, inherited, 0);
    }

    /// Decode one complete datagram.
    pub fn parse_datagram(&self, datagram: &[u8]) {
        let mut pos = 0;
        self.parse(datagram, &mut pos, datagram.len(), Timestamp::IMMEDIATE);
    }

    /// Oldest queued message, or [`Message::none`] when the queue is empty.
    pub fn dequeue(&self) -> Message {
        self.try_dequeue().unwrap_or_else(Message::none)
    }

    pub fn try_dequeue(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a message.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Message> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn message_count(&self) -> usize {
        self.rx.len()
    }

    fn parse_range(
        &self,
        buf: &[u8],
        pos: &mut usize,
        end: usize,
        inherited: Timestamp,
        depth: usize,
    ) {
        let end = end.min(buf.len());
        if *pos > end {
            error!(
                target: "osc::parser",
                "cursor {} is past the end of the packet ({}), nothing parsed",
                *pos,
                end
            );
            return;
        }
        let start = *pos;
        let packet = &buf[start..end];

        let mut cursor = 0;
        if let Err(e) = self.parse_packet(packet, &mut cursor, inherited, depth) {
            error!(target: "osc::parser", "dropping malformed packet at byte {}: {}", start, e);
            cursor = packet.len();
        }

        *pos = start + cursor;
        if *pos != end {
            error!(
                target: "osc::parser",
                "parsed size is inconsistent with the given size: {} / {}",
                *pos,
                end
            );
        }
    }

    fn parse_packet(
        &self,
        packet: &[u8],
        cursor: &mut usize,
        inherited: Timestamp,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let head = reader::read_string(packet, cursor)?;
        if head == BUNDLE_TAG {
            return self.parse_bundle(packet, cursor, inherited, depth + 1);
        }

        let msg = parse_message(head.into_owned(), packet, cursor, inherited)?;
        if let Err(SendError(msg)) = self.tx.send(msg) {
            warn!(target: "osc::parser", "message queue closed, dropping {}", msg.address());
        }
        Ok(())
    }

    fn parse_bundle(
        &self,
        packet: &[u8],
        cursor: &mut usize,
        inherited: Timestamp,
        depth: usize,
    ) -> Result<(), DecodeError> {
        if depth > MAX_BUNDLE_DEPTH {
            return Err(DecodeError::TooDeep { depth });
        }

        let own = reader::read_timetag(packet, cursor)?;
        // an enclosing scheduled bundle governs everything inside it
        let time = if inherited.is_immediate() { own } else { inherited };

        while *cursor < packet.len() {
            let at = *cursor;
            let size = reader::read_int(packet, cursor)?;
            if size < 0 {
                return Err(DecodeError::NegativeLength { at, len: size });
            }

            let size = size as usize;
            let available = packet.len() - *cursor;
            if size > available {
                return Err(DecodeError::Truncated {
                    at: *cursor,
                    needed: size,
                    available,
                });
            }

            let element_end = *cursor + size;
            if size % 4 == 0 {
                self.parse_range(packet, cursor, element_end, time, depth);
            } else {
                error!(
                    target: "osc::parser",
                    "bundle element size ({}) at byte {} is not a multiple of 4, skipping it",
                    size,
                    at
                );
            }
            *cursor = element_end;
        }
        Ok(())
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_message(
    address: String,
    packet: &[u8],
    cursor: &mut usize,
    timestamp: Timestamp,
) -> Result<Message, DecodeError> {
    // OSC 1.0 allows senders to omit the type-tag string entirely
    if *cursor == packet.len() {
        return Ok(Message::from_batch(address, ValueBatch::new(), timestamp));
    }

    let tags_at = *cursor;
    let tag_string = reader::read_string(packet, cursor)?;
    let tags = tag_string
        .strip_prefix(',')
        .ok_or(DecodeError::MissingTypeTags { at: tags_at })?;

    let mut values = ValueBatch::with_capacity(tags.len());
    for tag in tags.chars() {
        let value = match tag {
            'i' => Value::Int(reader::read_int(packet, cursor)?),
            'f' => Value::Float(reader::read_float(packet, cursor)?),
            's' => Value::String(reader::read_string(packet, cursor)?.into_owned()),
            'b' => Value::blob_copy(reader::read_blob(packet, cursor)?),
            'T' => Value::Bool(true),
            'F' => Value::Bool(false),
            other => {
                warn!(
                    target: "osc::parser",
                    "unsupported type tag '{}' in {}, later values may be misread",
                    other,
                    address
                );
                Value::Invalid
            }
        };
        values.push(value);
    }

    Ok(Message::from_batch(address, values, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{encode, encode_message};
    use osclink_types::{Bundle, Packet};

    fn drain(parser: &Parser) -> Vec<Message> {
        std::iter::from_fn(|| parser.try_dequeue()).collect()
    }

    #[test]
    fn empty_queue_yields_sentinel() {
        let parser = Parser::new();
        assert!(parser.dequeue().is_none());
        assert_eq!(parser.message_count(), 0);
    }

    #[test]
    fn top_level_message_is_immediate() {
        let parser = Parser::new();
        let bytes = encode_message(&Message::new("/a", [Value::Int(5)])).unwrap();
        parser.parse_datagram(&bytes);

        let msg = parser.dequeue();
        assert_eq!(msg.address(), "/a");
        assert_eq!(msg.int(0), Ok(5));
        assert!(msg.timestamp().is_immediate());
    }

    #[test]
    fn cursor_lands_on_end() {
        let parser = Parser::new();
        let mut buf = vec![0xAA; 4];
        buf.extend(encode_message(&Message::new("/x", [Value::Float(2.0)])).unwrap());
        let mut pos = 4;
        parser.parse(&buf, &mut pos, buf.len(), Timestamp::IMMEDIATE);
        assert_eq!(pos, buf.len());
        assert_eq!(parser.dequeue().float(0), Ok(2.0));
    }

    #[test]
    fn cursor_past_end_is_left_alone() {
        let parser = Parser::new();
        let buf = encode_message(&Message::new("/x", [])).unwrap();
        let mut pos = buf.len();
        parser.parse(&buf, &mut pos, 4, Timestamp::IMMEDIATE);
        assert_eq!(pos, buf.len());
        assert_eq!(parser.message_count(), 0);
    }

    #[test]
    fn bundle_elements_inherit_timetag() {
        let time = Timestamp::from_parts(3_900_000_000, 7);
        let mut bundle = Bundle::with_timestamp(time);
        bundle.add_message(Message::new("/one", []));
        bundle.add_message(Message::new("/two", [Value::from("x")]));

        let parser = Parser::new();
        parser.parse_datagram(&encode(&Packet::Bundle(bundle)).unwrap());

        let msgs = drain(&parser);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].address(), "/one");
        assert_eq!(msgs[1].address(), "/two");
        assert!(msgs.iter().all(|m| m.timestamp() == time));
    }

    #[test]
    fn immediate_outer_bundle_defers_to_inner_timetag() {
        let inner_time = Timestamp::from_parts(42, 0);
        let mut inner = Bundle::with_timestamp(inner_time);
        inner.add_message(Message::new("/deep", []));
        let mut outer = Bundle::new();
        outer.add_bundle(inner);

        let parser = Parser::new();
        parser.parse_datagram(&encode(&Packet::Bundle(outer)).unwrap());
        assert_eq!(parser.dequeue().timestamp(), inner_time);
    }

    #[test]
    fn unknown_tag_decodes_to_invalid() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"/u\0\0");
        bytes.extend_from_slice(b",xi\0");
        bytes.extend_from_slice(&9i32.to_be_bytes());

        let parser = Parser::new();
        parser.parse_datagram(&bytes);
        let msg = parser.dequeue();
        assert_eq!(msg.values(), &[Value::Invalid, Value::Int(9)]);
    }

    #[test]
    fn address_only_message() {
        let parser = Parser::new();
        parser.parse_datagram(b"/ping\0\0\0");
        let msg = parser.dequeue();
        assert_eq!(msg.address(), "/ping");
        assert!(msg.is_empty());
    }

    #[test]
    fn truncated_message_is_dropped() {
        let mut bytes = encode_message(&Message::new("/t", [Value::Int(1), Value::Int(2)])).unwrap();
        bytes.truncate(bytes.len() - 4);

        let parser = Parser::new();
        let mut pos = 0;
        parser.parse(&bytes, &mut pos, bytes.len(), Timestamp::IMMEDIATE);
        assert_eq!(pos, bytes.len());
        assert_eq!(parser.message_count(), 0);
    }

    #[test]
    fn missing_comma_is_rejected() {
        let parser = Parser::new();
        parser.parse_datagram(b"/a\0\0i\0\0\0\0\0\0\x01");
        assert_eq!(parser.message_count(), 0);
    }

    #[test]
    fn malformed_sibling_does_not_hide_later_elements() {
        let good = encode_message(&Message::new("/ok", [Value::Int(1)])).unwrap();
        let broken = encode_message(&Message::new("/broken", [Value::Int(1), Value::Int(2)])).unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"#bundle\0");
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
        // claims 4 bytes less than the message needs
        bytes.extend_from_slice(&((broken.len() - 4) as i32).to_be_bytes());
        bytes.extend_from_slice(&broken[..broken.len() - 4]);
        bytes.extend_from_slice(&(good.len() as i32).to_be_bytes());
        bytes.extend_from_slice(&good);

        let parser = Parser::new();
        parser.parse_datagram(&bytes);
        let msgs = drain(&parser);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].address(), "/ok");
    }

    #[test]
    fn nesting_beyond_limit_is_rejected() {
        let mut bundle = Bundle::new();
        bundle.add_message(Message::new("/leaf", []));
        for _ in 0..MAX_BUNDLE_DEPTH {
            let mut outer = Bundle::new();
            outer.add_bundle(bundle);
            bundle = outer;
        }

        let parser = Parser::new();
        parser.parse_datagram(&encode(&Packet::Bundle(bundle)).unwrap());
        assert_eq!(parser.message_count(), 0);
    }

    #[test]
    fn nesting_at_limit_is_accepted() {
        let mut bundle = Bundle::new();
        bundle.add_message(Message::new("/leaf", []));
        for _ in 1..MAX_BUNDLE_DEPTH {
            let mut outer = Bundle::new();
            outer.add_bundle(bundle);
            bundle = outer;
        }

        let parser = Parser::new();
        parser.parse_datagram(&encode(&Packet::Bundle(bundle)).unwrap());
        assert_eq!(parser.dequeue().address(), "/leaf");
    }
}
