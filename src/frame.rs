// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use std::string::FromUtf8Error;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Upper bound on a declared `*N` element count. Matches the Redis
/// multibulk limit; anything larger is a protocol error rather than an
/// allocation request.
const MAX_ARRAY_ELEMENTS: i64 = 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid length prefix")]
    InvalidLength,
    #[error("protocol error; bulk string not terminated by CRLF")]
    MissingTerminator,
    /// Invalid message encoding.
    #[error("{0}")]
    Other(crate::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

// Only the RESP2 data types are supported. A leading byte that is not one of
// the five markers is read as a bare inline line, which tolerates minimal
// line-based clients sending e.g. `PING\r\n`.
impl Frame {
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = peek_byte(src)?;

        let data_type = match DataType::try_from(first_byte) {
            Ok(data_type) => {
                src.advance(1);
                data_type
            }
            // Inline command: the whole line is a single simple string.
            Err(_) => {
                let bytes = get_line(src)?.to_vec();
                let string = String::from_utf8(bytes)?;
                return Ok(Frame::Simple(string));
            }
        };

        match data_type {
            DataType::SimpleString => {
                let bytes = get_line(src)?.to_vec();
                let string = String::from_utf8(bytes)?;
                Ok(Frame::Simple(string))
            }
            DataType::SimpleError => {
                let bytes = get_line(src)?.to_vec();
                let string = String::from_utf8(bytes)?;
                Ok(Frame::Error(string))
            }
            DataType::Integer => {
                let integer = get_decimal(src)?;
                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let length = get_decimal(src)?;

                if length < 0 {
                    return Ok(Frame::Null);
                }

                // The declared length is authoritative; the data may contain
                // embedded CRLF bytes, so no terminator scan here.
                let length = length as usize;
                let start = src.position() as usize;
                let remaining = src.get_ref().len() - start;

                if remaining < length + CRLF.len() {
                    return Err(Error::Incomplete);
                }

                let data = Bytes::copy_from_slice(&src.get_ref()[start..start + length]);

                if &src.get_ref()[start + length..start + length + CRLF.len()] != CRLF {
                    return Err(Error::MissingTerminator);
                }
                src.set_position((start + length + CRLF.len()) as u64);

                Ok(Frame::Bulk(data))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_decimal(src)?;

                if length < 0 {
                    return Ok(Frame::Null);
                }

                // The count is client-controlled and no element has been
                // seen yet, so it must be bounds-checked before it sizes an
                // allocation.
                if length > MAX_ARRAY_ELEMENTS {
                    return Err(Error::InvalidLength);
                }

                let mut frames = Vec::with_capacity(length as usize);
                for _ in 0..length {
                    let frame = Self::parse(src)?;
                    frames.push(frame);
                }

                Ok(Frame::Array(frames))
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let s = sanitize_line(s);
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let s = sanitize_line(s);
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let mut bytes = Vec::with_capacity(1 + i.to_string().len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(i.to_string().as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(bytes) => {
                let length_str = bytes.len().to_string();
                let mut result = Vec::with_capacity(
                    1 + length_str.len() + CRLF.len() + bytes.len() + CRLF.len(),
                );
                result.push(u8::from(DataType::BulkString));
                result.extend_from_slice(length_str.as_bytes());
                result.extend_from_slice(CRLF);
                result.extend_from_slice(bytes);
                result.extend_from_slice(CRLF);
                result
            }
            // RESP2 null bulk string.
            Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(arr) => {
                let length_str = arr.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in arr {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}\r\n", arr.len())?;
                for frame in arr {
                    write!(f, "{}\r\n", frame)?;
                }
                Ok(())
            }
        }
    }
}

/// Simple strings and errors are line frames terminated by the first CRLF.
/// Text carrying CR or LF (an unknown verb echoed into an error message, for
/// instance) would terminate the frame early and desynchronize the reply
/// stream, so the control bytes are replaced before framing.
fn sanitize_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Reads up to (excluding) the next CRLF, leaving the cursor just past it.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    let line_end_position = src.get_ref()[start..end]
        .windows(2)
        .position(|window| window == CRLF)
        .ok_or(Error::Incomplete)
        .map(|index| start + index)?;

    src.set_position((line_end_position + CRLF.len()) as u64);

    Ok(&src.get_ref()[start..line_end_position])
}

/// Parses a line as a signed decimal, as used by length prefixes and integer
/// frames. A non-numeric line is a protocol error, not `Incomplete`.
fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;

    std::str::from_utf8(line)
        .map_err(|_| Error::InvalidLength)?
        .parse::<i64>()
        .map_err(|_| Error::InvalidLength)
}

fn peek_byte(src: &Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.chunk()[0])
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(byte),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src.into())
    }
}
