/// Read and write implementations for the protocol frames
use std::io::{self, Read, Write};

use crate::{
    error::ReadError,
    protocol::{
        CommandKind, HEADER_LEN, Header, RESPONSE_HEADER_LEN, ReadResponse, Request, Status,
        WRITE_TAG,
    },
};

impl Header {
    /// Decodes a header. The reserved bytes are ignored and the tag is never rejected.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Header {
        Header::new(
            CommandKind::from_tag(buf[0]),
            u16::from_be_bytes([buf[6], buf[7]]),
            u16::from_be_bytes([buf[4], buf[5]]),
        )
    }

    /// Decodes the header at the start of `buf`, if enough bytes are present.
    pub fn peek(buf: &[u8]) -> Option<Header> {
        let header: &[u8; HEADER_LEN] = buf.get(..HEADER_LEN)?.try_into().ok()?;
        Some(Header::decode(header))
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let length = self.length().to_be_bytes();
        let address = self.address().to_be_bytes();
        [
            self.kind().tag(),
            0,
            0,
            0,
            length[0],
            length[1],
            address[0],
            address[1],
        ]
    }
}

#[test]
fn decode_header() {
    let header = Header::decode(&[0x0a, 0xff, 0xff, 0xff, 0x00, 0x04, 0x40, 0x10]);
    assert_eq!(header.kind(), CommandKind::Read);
    assert_eq!(header.length(), 4);
    assert_eq!(header.address(), 0x4010);
    assert_eq!(header.frame_len(), HEADER_LEN);
}

#[test]
fn peek_needs_full_header() {
    assert_eq!(Header::peek(&[0x0b, 0, 0, 0, 0, 2, 0]), None);
    let header = Header::peek(&[0x0b, 0, 0, 0, 0, 2, 0, 1, 0xAA]).unwrap();
    assert_eq!(header.frame_len(), HEADER_LEN + 2);
}

impl Request {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Request::Read { .. } => writer.write_all(&self.header().encode()),
            Request::Write { data, .. } => {
                if data.len() > u16::MAX as usize {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "write payload exceeds 65535 bytes",
                    ));
                }
                let mut frame = Vec::with_capacity(HEADER_LEN + data.len());
                frame.extend_from_slice(&self.header().encode());
                frame.extend_from_slice(data);
                writer.write_all(&frame)
            }
        }
    }
}

impl ReadResponse {
    /// Serializes the response into a single frame so it can be sent with one write.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(RESPONSE_HEADER_LEN + self.data().len());
        frame.push(WRITE_TAG);
        frame.extend_from_slice(&self.frame_len_field().to_be_bytes());
        frame.push(self.status().byte());
        frame.extend_from_slice(self.data());
        frame
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Reads the response to a read request of `length` bytes.
    pub fn from_reader(reader: &mut impl Read, length: u16) -> Result<ReadResponse, ReadError> {
        let mut header = [0u8; RESPONSE_HEADER_LEN];
        reader.read_exact(&mut header)?;
        if header[0] != WRITE_TAG {
            return Err(ReadError::InvalidTag(header[0]));
        }

        let expected = (RESPONSE_HEADER_LEN as u16).wrapping_add(length);
        let got = u16::from_be_bytes([header[1], header[2]]);
        if got != expected {
            return Err(ReadError::LengthMismatch { expected, got });
        }

        let mut data = vec![0u8; length as usize].into_boxed_slice();
        reader.read_exact(&mut data)?;
        Ok(ReadResponse::new(Status::from_byte(header[3]), data))
    }
}

#[cfg(test)]
mod test {
    use crate::error::ReadError;
    use crate::protocol::{ReadResponse, Request, Status};
    use std::io::Cursor;

    #[test]
    fn write_read_request() {
        let mut out = Vec::new();
        Request::Read {
            address: 0x0010,
            length: 4,
        }
        .write_to(&mut out)
        .unwrap();
        assert_eq!(out, vec![0x0a, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x10]);
    }

    #[test]
    fn write_write_request() {
        let mut out = Vec::new();
        Request::Write {
            address: 0x4000,
            data: vec![0xDE, 0xAD, 0xBE, 0xEF].into_boxed_slice(),
        }
        .write_to(&mut out)
        .unwrap();
        assert_eq!(
            out,
            vec![
                0x0b, 0x00, 0x00, 0x00, 0x00, 0x04, 0x40, 0x00, 0xDE, 0xAD, 0xBE, 0xEF
            ]
        );
    }

    #[test]
    fn oversized_write_is_rejected() {
        let mut out = Vec::new();
        let request = Request::Write {
            address: 0,
            data: vec![0; u16::MAX as usize + 1].into_boxed_slice(),
        };
        assert!(request.write_to(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn encode_zero_filled_response() {
        let response = ReadResponse::new(Status::SUCCESS, vec![0; 4].into_boxed_slice());
        assert_eq!(
            response.encode(),
            vec![0x0b, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_empty_failed_response() {
        let response = ReadResponse::new(Status::FAILURE, Box::default());
        assert_eq!(response.encode(), vec![0x0b, 0x00, 0x04, 0xff]);
    }

    #[test]
    fn read_response() {
        let data = vec![0x0b, 0x00, 0x06, 0x00, 0x12, 0x34];
        let mut cursor = Cursor::new(data);
        let response = ReadResponse::from_reader(&mut cursor, 2).unwrap();
        assert_eq!(response.status(), Status::SUCCESS);
        assert_eq!(response.data(), &[0x12, 0x34]);
    }

    #[test]
    fn read_response_with_wrong_tag() {
        let mut cursor = Cursor::new(vec![0x0a, 0x00, 0x04, 0x00]);
        match ReadResponse::from_reader(&mut cursor, 0) {
            Err(ReadError::InvalidTag(tag)) => assert_eq!(tag, 0x0a),
            other => panic!("expected InvalidTag, got {:?}", other),
        }
    }

    #[test]
    fn read_response_with_wrong_length() {
        let mut cursor = Cursor::new(vec![0x0b, 0x00, 0x05, 0x00, 0x01]);
        match ReadResponse::from_reader(&mut cursor, 2) {
            Err(ReadError::LengthMismatch { expected, got }) => {
                assert_eq!(expected, 6);
                assert_eq!(got, 5);
            }
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn truncated_response() {
        let mut cursor = Cursor::new(vec![0x0b, 0x00, 0x08, 0x00, 0x01]);
        match ReadResponse::from_reader(&mut cursor, 4) {
            Err(ReadError::IoError(err)) => {
                assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected IoError, got {:?}", other),
        }
    }
}
