//! Bundles and the packet type shared by bundle elements and send queues.

use crate::message::Message;
use crate::timestamp::Timestamp;

/// Either half of the OSC packet grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Packet::Message(msg) => msg.timestamp(),
            Packet::Bundle(bundle) => bundle.timestamp(),
        }
    }
}

impl From<Message> for Packet {
    fn from(msg: Message) -> Self {
        Packet::Message(msg)
    }
}

impl From<Bundle> for Packet {
    fn from(bundle: Bundle) -> Self {
        Packet::Bundle(bundle)
    }
}

/// A time-tagged group of messages and nested bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    timestamp: Timestamp,
    elements: Vec<Packet>,
}

impl Bundle {
    /// Bundle tagged for immediate dispatch.
    pub fn new() -> Self {
        Self::with_timestamp(Timestamp::IMMEDIATE)
    }

    pub fn with_timestamp(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            elements: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn add_message(&mut self, msg: Message) {
        self.elements.push(Packet::Message(msg));
    }

    pub fn add_bundle(&mut self, bundle: Bundle) {
        self.elements.push(Packet::Bundle(bundle));
    }

    pub fn push(&mut self, element: impl Into<Packet>) {
        self.elements.push(element.into());
    }

    pub fn elements(&self) -> &[Packet] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Packet> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Nesting depth: 1 for a bundle holding only messages.
    pub fn depth(&self) -> usize {
        1 + self
            .elements
            .iter()
            .map(|el| match el {
                Packet::Bundle(inner) => inner.depth(),
                Packet::Message(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Every message in declaration order, descending into nested bundles.
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        collect_messages(self, &mut out);
        out
    }
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_messages<'a>(bundle: &'a Bundle, out: &mut Vec<&'a Message>) {
    for element in &bundle.elements {
        match element {
            Packet::Message(msg) => out.push(msg),
            Packet::Bundle(inner) => collect_messages(inner, out),
        }
    }
}
