use bincode::{Decode, Encode};

use super::{Opcode, error::CodecError};

pub const REQUEST_VERSION: u8 = 0x01;
pub const RESPONSE_VERSION: u8 = 0x81;

/// Size of an encoded [`FrameHeader`].
pub const HEADER_SIZE: usize = 8;

/// Largest body a peer may announce (256 MiB).
pub const MAX_BODY_SIZE: u32 = 256 * 1024 * 1024;

pub const FLAG_COMPRESSION: u8 = 0x01;
pub const FLAG_TRACING: u8 = 0x02;

/// Fixed header preceding every frame body.
///
/// Laid out field by field in declaration order; with a big-endian fixed-int
/// bincode configuration this is exactly the 8-byte version 1 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct FrameHeader {
    pub version: u8,
    pub flags: u8,
    pub stream: i8,
    pub opcode: u8,
    pub length: u32,
}

impl FrameHeader {
    pub fn request(stream: i8, opcode: Opcode, length: u32) -> Self {
        Self {
            version: REQUEST_VERSION,
            flags: 0,
            stream,
            opcode: opcode.into(),
            length,
        }
    }

    pub fn is_response(&self) -> bool {
        self.version & 0x80 != 0
    }

    pub fn opcode(&self) -> Result<Opcode, CodecError> {
        self.opcode.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header() {
        let header = FrameHeader::request(3, Opcode::Query, 42);
        assert_eq!(header.version, REQUEST_VERSION);
        assert!(!header.is_response());
        assert_eq!(header.opcode().unwrap(), Opcode::Query);
    }

    #[test]
    fn response_direction_bit() {
        let header = FrameHeader {
            version: RESPONSE_VERSION,
            flags: FLAG_TRACING,
            stream: -1,
            opcode: 0x0C,
            length: 0,
        };
        assert!(header.is_response());
        assert_eq!(header.opcode().unwrap(), Opcode::Event);
    }
}
