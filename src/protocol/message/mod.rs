//! Protocol messages.
//!
//! Every message kind implements [`Message`]: it reports its [`Opcode`], writes its
//! body into an owned buffer with [`Message::prepare`] and fills itself from a body
//! with [`Message::consume`]. The framing layer reads the opcode from the frame
//! header, picks the variant with [`AnyMessage::for_opcode`] and hands it the body.
//!
//! Only the event and query families are implemented; the remaining kinds share
//! the same contract and are rejected with [`CodecError::UnsupportedOpcode`].
mod event;
mod query;

use std::fmt;

pub use event::{EventMessage, EventType, SchemaChange, StatusChange, TopologyChange};
pub use query::QueryMessage;

use super::{Opcode, error::CodecError};

pub trait Message {
    fn opcode(&self) -> Opcode;

    /// Replaces the message contents with the decoded `body`.
    ///
    /// On error the message is left at its default contents.
    fn consume(&mut self, body: &[u8]) -> Result<(), CodecError>;

    /// Serializes the message body and returns it.
    fn prepare(&mut self) -> Result<&[u8], CodecError>;

    /// Length of the last prepared body, or zero once `consume` has replaced it.
    fn size(&self) -> usize;

    fn debug_name(&self) -> &'static str {
        self.opcode().name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyMessage {
    Event(EventMessage),
    Query(QueryMessage),
}

impl AnyMessage {
    /// Builds an empty message of the kind selected by `opcode`, ready for `consume`.
    pub fn for_opcode(opcode: Opcode) -> Result<Self, CodecError> {
        match opcode {
            Opcode::Event => Ok(AnyMessage::Event(EventMessage::default())),
            Opcode::Query => Ok(AnyMessage::Query(QueryMessage::default())),
            other => Err(CodecError::UnsupportedOpcode(other)),
        }
    }

    fn inner(&self) -> &dyn Message {
        match self {
            AnyMessage::Event(event) => event,
            AnyMessage::Query(query) => query,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Message {
        match self {
            AnyMessage::Event(event) => event,
            AnyMessage::Query(query) => query,
        }
    }
}

impl Message for AnyMessage {
    fn opcode(&self) -> Opcode {
        self.inner().opcode()
    }

    fn consume(&mut self, body: &[u8]) -> Result<(), CodecError> {
        self.inner_mut().consume(body)
    }

    fn prepare(&mut self) -> Result<&[u8], CodecError> {
        self.inner_mut().prepare()
    }

    fn size(&self) -> usize {
        self.inner().size()
    }
}

impl From<EventMessage> for AnyMessage {
    fn from(value: EventMessage) -> Self {
        AnyMessage::Event(value)
    }
}

impl From<QueryMessage> for AnyMessage {
    fn from(value: QueryMessage) -> Self {
        AnyMessage::Query(value)
    }
}

impl fmt::Display for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyMessage::Event(event) => fmt::Display::fmt(event, f),
            AnyMessage::Query(query) => fmt::Display::fmt(query, f),
        }
    }
}
