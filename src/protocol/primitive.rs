//! Wire primitives shared by every message body.
//!
//! All multi-byte integers are big-endian. Decoders take a cursor implementing
//! [`Buf`] and advance it past what they read; a length prefix that points past
//! the end of the cursor is reported as [`CodecError::TruncatedInput`] before any
//! byte is copied.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut};

use super::error::CodecError;

const IPV4_SIZE: usize = 4;
const IPV6_SIZE: usize = 16;

fn ensure(buf: &impl Buf, needed: usize) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        return Err(CodecError::TruncatedInput {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

pub fn read_byte(buf: &mut impl Buf) -> Result<u8, CodecError> {
    ensure(&*buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_short(buf: &mut impl Buf) -> Result<u16, CodecError> {
    ensure(&*buf, 2)?;
    Ok(buf.get_u16())
}

pub fn read_int(buf: &mut impl Buf) -> Result<i32, CodecError> {
    ensure(&*buf, 4)?;
    Ok(buf.get_i32())
}

fn read_utf8(buf: &mut impl Buf, len: usize) -> Result<String, CodecError> {
    ensure(&*buf, len)?;
    let mut bytes = vec![0; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Reads a `[string]`: a `[short]` length followed by that many UTF-8 bytes.
pub fn read_string(buf: &mut impl Buf) -> Result<String, CodecError> {
    let len = read_short(buf)? as usize;
    read_utf8(buf, len)
}

/// Reads a `[long string]`: an `[int]` length followed by that many UTF-8 bytes.
pub fn read_long_string(buf: &mut impl Buf) -> Result<String, CodecError> {
    let len = read_int(buf)?;
    let len = usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))?;
    read_utf8(buf, len)
}

/// Reads an `[inet]`: one size byte, the raw address, then an `[int]` port.
pub fn read_inet(buf: &mut impl Buf) -> Result<(IpAddr, i32), CodecError> {
    let size = read_byte(buf)? as usize;
    ensure(&*buf, size)?;

    let ip = match size {
        IPV4_SIZE => {
            let mut octets = [0; IPV4_SIZE];
            buf.copy_to_slice(&mut octets);
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        IPV6_SIZE => {
            let mut octets = [0; IPV6_SIZE];
            buf.copy_to_slice(&mut octets);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        other => return Err(CodecError::InvalidInetLength(other)),
    };
    let port = read_int(buf)?;

    Ok((ip, port))
}

pub fn write_short(buf: &mut impl BufMut, value: u16) {
    buf.put_u16(value);
}

pub fn write_int(buf: &mut impl BufMut, value: i32) {
    buf.put_i32(value);
}

/// Writes a `[string]`. Values longer than `u16::MAX` bytes are rejected and
/// nothing is written.
pub fn write_string(buf: &mut impl BufMut, value: &str) -> Result<(), CodecError> {
    let len = u16::try_from(value.len()).map_err(|_| CodecError::ValueTooLong {
        len: value.len(),
        max: u16::MAX as usize,
    })?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Writes a `[long string]`. Values longer than `i32::MAX` bytes are rejected and
/// nothing is written.
pub fn write_long_string(buf: &mut impl BufMut, value: &str) -> Result<(), CodecError> {
    let len = i32::try_from(value.len()).map_err(|_| CodecError::ValueTooLong {
        len: value.len(),
        max: i32::MAX as usize,
    })?;
    buf.put_i32(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

pub fn write_inet(buf: &mut impl BufMut, ip: IpAddr, port: i32) {
    match ip {
        IpAddr::V4(v4) => {
            buf.put_u8(IPV4_SIZE as u8);
            buf.put_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            buf.put_u8(IPV6_SIZE as u8);
            buf.put_slice(&v6.octets());
        }
    }
    buf.put_i32(port);
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn string_is_short_length_prefixed() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "UP").unwrap();
        assert_eq!(&buf[..], &[0x00, 0x02, b'U', b'P']);

        let mut cursor = &buf[..];
        assert_eq!(read_string(&mut cursor).unwrap(), "UP");
        assert!(cursor.is_empty());
    }

    #[test]
    fn long_string_is_int_length_prefixed() {
        let mut buf = BytesMut::new();
        write_long_string(&mut buf, "select").unwrap();
        assert_eq!(&buf[..4], &[0x00, 0x00, 0x00, 0x06]);
        assert_eq!(read_long_string(&mut &buf[..]).unwrap(), "select");
    }

    #[test]
    fn inet_v4_and_v6() {
        let mut buf = BytesMut::new();
        write_inet(&mut buf, "10.0.0.5".parse().unwrap(), 9042);
        write_inet(&mut buf, "::1".parse().unwrap(), 7000);
        assert_eq!(buf.len(), (1 + 4 + 4) + (1 + 16 + 4));

        let mut cursor = &buf[..];
        assert_eq!(
            read_inet(&mut cursor).unwrap(),
            ("10.0.0.5".parse().unwrap(), 9042)
        );
        assert_eq!(
            read_inet(&mut cursor).unwrap(),
            ("::1".parse().unwrap(), 7000)
        );
    }

    #[test]
    fn length_past_end_is_truncated() {
        // Declares five bytes, carries two.
        let bytes = [0x00, 0x05, b'a', b'b'];
        let err = read_string(&mut &bytes[..]).unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedInput {
                needed: 5,
                available: 2
            }
        );
    }

    #[test]
    fn missing_length_prefix_is_truncated() {
        let bytes = [0x00];
        assert!(matches!(
            read_short(&mut &bytes[..]),
            Err(CodecError::TruncatedInput { needed: 2, .. })
        ));
        assert!(matches!(
            read_int(&mut &bytes[..]),
            Err(CodecError::TruncatedInput { needed: 4, .. })
        ));
    }

    #[test]
    fn negative_long_string_length() {
        let bytes = (-1i32).to_be_bytes();
        assert_eq!(
            read_long_string(&mut &bytes[..]).unwrap_err(),
            CodecError::NegativeLength(-1)
        );
    }

    #[test]
    fn inet_with_bad_address_size() {
        let bytes = [0x03, 1, 2, 3, 0, 0, 0, 1];
        assert_eq!(
            read_inet(&mut &bytes[..]).unwrap_err(),
            CodecError::InvalidInetLength(3)
        );
    }

    #[test]
    fn oversized_string_is_rejected() {
        let value = "x".repeat(70_000);
        let mut buf = BytesMut::new();

        assert_eq!(
            write_string(&mut buf, &value).unwrap_err(),
            CodecError::ValueTooLong {
                len: 70_000,
                max: 65_535
            }
        );
        assert!(buf.is_empty());

        // The same value fits a long string.
        write_long_string(&mut buf, &value).unwrap();
        let mut cursor = &buf[..];
        assert_eq!(read_long_string(&mut cursor).unwrap(), value);
        assert!(cursor.is_empty());
    }

    #[test]
    fn longest_string_fits() {
        let value = "y".repeat(u16::MAX as usize);
        let mut buf = BytesMut::new();
        write_string(&mut buf, &value).unwrap();
        assert_eq!(&buf[..2], &[0xff, 0xff]);
        assert_eq!(read_string(&mut &buf[..]).unwrap(), value);
    }

    #[test]
    #[should_panic(expected = "InvalidUtf8")]
    fn string_with_invalid_utf8() {
        let bytes = [0x00, 0x02, 0xff, 0xfe];
        read_string(&mut &bytes[..]).unwrap();
    }
}
