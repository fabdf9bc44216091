//! CQL binary protocol codec.
//!
//! This module turns typed requests into frame bodies and frame bodies received
//! from a node back into typed messages. It implements exactly one wire format:
//! version 1 of the CQL binary protocol.
//!
//! # Overview
//!
//! A frame is an 8-byte [`FrameHeader`] (version, flags, stream id, opcode, body
//! length) followed by a body. The framing layer reads the header, selects the
//! message variant for its opcode and hands only the body to
//! [`Message::consume`]. Outbound messages are serialized with
//! [`Message::prepare`] and the resulting length goes into the header.
//!
//! # Key Components
//!
//! - [`primitive`]: big-endian `[short]`, `[int]`, `[string]`, `[long string]` and
//!   `[inet]` readers and writers.
//! - [`Message`]: capability shared by every message kind, with [`EventMessage`]
//!   and [`QueryMessage`] as the implemented variants and [`AnyMessage`] as the
//!   opcode-selected union.
//! - [`ProtocolTransport`]: blocking adapter writing and reading whole frames over
//!   any `Read + Write` stream.
//!
//! # Decoding Guarantees
//!
//! - A length prefix pointing past the end of the body fails with
//!   [`CodecError::TruncatedInput`]; nothing is read out of bounds.
//! - A failed `consume` leaves the message at its default contents.
//! - Unrecognized event names decode to an `Unknown` event instead of failing.
//!
//! # See Also
//!
//! - [`pool`](crate::pool): keeps the connections these frames travel over alive.
mod consistency;
pub mod frame;
mod message;
mod opcode;
pub mod primitive;
mod transport;

pub use consistency::Consistency;
pub use frame::FrameHeader;
pub use message::{
    AnyMessage, EventMessage, EventType, Message, QueryMessage, SchemaChange, StatusChange,
    TopologyChange,
};
pub use opcode::Opcode;
pub use transport::{ProtocolTransport, TransportError};

pub mod error {
    use thiserror::Error;

    use super::Opcode;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub enum CodecError {
        #[error("truncated input: need {needed} bytes, {available} available")]
        TruncatedInput { needed: usize, available: usize },

        #[error("string is not valid UTF-8")]
        InvalidUtf8,

        #[error("negative length prefix {0}")]
        NegativeLength(i32),

        #[error("inet address must be 4 or 16 bytes, got {0}")]
        InvalidInetLength(usize),

        #[error("value of {len} bytes exceeds the {max} byte limit of its length prefix")]
        ValueTooLong { len: usize, max: usize },

        #[error("unknown opcode 0x{0:02x}")]
        UnknownOpcode(u8),

        #[error("no message implementation for opcode {0}")]
        UnsupportedOpcode(Opcode),

        #[error("unknown consistency level 0x{0:04x}")]
        UnknownConsistency(u16),
    }
}
