use std::io::{self, Read, Write};

use bincode::{
    config::{BigEndian, Configuration, Fixint},
    decode_from_std_read, encode_into_std_write,
};
use log::{debug, trace};
use thiserror::Error;

use super::{
    AnyMessage, Message,
    error::CodecError,
    frame::{FrameHeader, MAX_BODY_SIZE},
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode frame header: {0}")]
    Serialize(#[from] bincode::error::EncodeError),
    #[error("failed to decode frame header: {0}")]
    Deserialize(#[from] bincode::error::DecodeError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("frame body of {0} bytes exceeds the 256 MiB limit")]
    BodyTooLarge(u32),
}

/// Writes and reads whole frames over a blocking byte stream.
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    config: Configuration<BigEndian, Fixint>,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_fixed_int_encoding();
        Self { stream, config }
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    /// Prepares `message` and writes it as a request frame on `stream`.
    pub fn write_message<M: Message>(
        &mut self,
        stream: i8,
        message: &mut M,
    ) -> Result<(), TransportError> {
        let opcode = message.opcode();
        let body = message.prepare()?;
        let length =
            u32::try_from(body.len()).map_err(|_| TransportError::BodyTooLarge(u32::MAX))?;
        if length > MAX_BODY_SIZE {
            return Err(TransportError::BodyTooLarge(length));
        }

        let header = FrameHeader::request(stream, opcode, length);
        trace!("writing {header:?}");
        encode_into_std_write(header, &mut self.stream, self.config)?;
        self.stream.write_all(body)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Reads the next frame and decodes its body into the variant named by its opcode.
    pub fn read_message(&mut self) -> Result<(FrameHeader, AnyMessage), TransportError> {
        let header: FrameHeader = decode_from_std_read(&mut self.stream, self.config)?;
        trace!("read {header:?}");
        if header.length > MAX_BODY_SIZE {
            return Err(TransportError::BodyTooLarge(header.length));
        }

        let mut body = vec![0; header.length as usize];
        self.stream.read_exact(&mut body)?;

        let mut message = AnyMessage::for_opcode(header.opcode()?)?;
        message.consume(&body)?;
        debug!("received {} on stream {}", message.debug_name(), header.stream);
        Ok((header, message))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::OpenOptions,
        io::{Cursor, Seek, SeekFrom},
    };

    use bytes::BytesMut;
    use tempdir::TempDir;

    use super::*;
    use crate::protocol::{
        Consistency, EventType, QueryMessage, TopologyChange,
        frame::{HEADER_SIZE, RESPONSE_VERSION},
        primitive::{write_inet, write_string},
    };

    fn event_frame() -> Vec<u8> {
        let mut body = BytesMut::new();
        write_string(&mut body, "TOPOLOGY_CHANGE").unwrap();
        write_string(&mut body, "NEW_NODE").unwrap();
        write_inet(&mut body, "10.0.0.5".parse().unwrap(), 9042);

        let mut frame = vec![RESPONSE_VERSION, 0x00, -1i8 as u8, 0x0C];
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);
        frame
    }

    #[test]
    fn header_is_eight_bytes() {
        let mut transport = ProtocolTransport::new(Cursor::new(Vec::new()));
        let mut query = QueryMessage::new("select 1", Consistency::One);
        transport.write_message(7, &mut query).unwrap();

        let bytes = transport.into_inner().into_inner();
        assert_eq!(&bytes[..HEADER_SIZE], &[0x01, 0x00, 0x07, 0x07, 0, 0, 0, 14]);
        assert_eq!(bytes.len(), HEADER_SIZE + 14);
    }

    #[test]
    fn read_write_query() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream);

        let mut query = QueryMessage::new("select * from system.peers", Consistency::Quorum);
        transport.write_message(1, &mut query).unwrap();
        transport.stream.seek(SeekFrom::Start(0)).unwrap();

        let (header, message) = transport.read_message().unwrap();
        assert_eq!(header.stream, 1);
        assert!(!header.is_response());
        assert_eq!(message, AnyMessage::Query(query));
    }

    #[test]
    fn read_server_event() {
        let mut transport = ProtocolTransport::new(Cursor::new(event_frame()));
        let (header, message) = transport.read_message().unwrap();

        assert!(header.is_response());
        assert_eq!(header.stream, -1);
        let AnyMessage::Event(event) = message else {
            panic!("expected an event, got {message:?}");
        };
        assert_eq!(event.event_type(), EventType::Topology);
        assert_eq!(event.topology_change(), TopologyChange::AddNode);
    }

    #[test]
    #[should_panic(expected = "UnsupportedOpcode")]
    fn unsupported_opcode() {
        // READY carries no body.
        let frame = vec![RESPONSE_VERSION, 0x00, 0x00, 0x02, 0, 0, 0, 0];
        let mut transport = ProtocolTransport::new(Cursor::new(frame));
        transport.read_message().unwrap();
    }

    #[test]
    #[should_panic(expected = "BodyTooLarge")]
    fn oversized_body() {
        let frame = vec![RESPONSE_VERSION, 0x00, 0x00, 0x0C, 0xff, 0xff, 0xff, 0xff];
        let mut transport = ProtocolTransport::new(Cursor::new(frame));
        transport.read_message().unwrap();
    }

    #[test]
    fn truncated_body_is_io_error() {
        let mut frame = event_frame();
        frame.truncate(frame.len() - 3);
        let mut transport = ProtocolTransport::new(Cursor::new(frame));
        assert!(matches!(
            transport.read_message(),
            Err(TransportError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn frames_through_file() {
        let temp = TempDir::new("frames").unwrap();
        let path = temp.path().join("frames.bin");
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();

        let mut transport = ProtocolTransport::new(file);
        let mut first = QueryMessage::new("USE ks", Consistency::One);
        let mut second = QueryMessage::new("select * from t", Consistency::All);
        transport.write_message(0, &mut first).unwrap();
        transport.write_message(1, &mut second).unwrap();
        transport.stream.seek(SeekFrom::Start(0)).unwrap();

        let (_, a) = transport.read_message().unwrap();
        let (_, b) = transport.read_message().unwrap();
        assert_eq!(a, AnyMessage::Query(first));
        assert_eq!(b, AnyMessage::Query(second));
        assert!(matches!(
            transport.read_message(),
            Err(TransportError::Deserialize(_))
        ));
    }
}
