use std::fmt::Display;

/// Size of a request header in bytes.
pub const HEADER_LEN: usize = 8;

/// Size of the header that precedes the payload of a read response.
pub const RESPONSE_HEADER_LEN: usize = 4;

/// Tag byte of a read request.
pub const READ_TAG: u8 = 0x0a;

/// Tag byte of a write request. Read responses are framed as writes and carry this tag as well.
pub const WRITE_TAG: u8 = 0x0b;

/// The TCP port servers listen on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8086;

/// The kind of command a request header announces.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandKind {
    Read,
    Write,
}

impl CommandKind {
    /// Classifies a tag byte.
    ///
    /// Only [`READ_TAG`] selects a read. Every other value, including unknown ones,
    /// is handled as a write so that the payload that follows is consumed.
    pub fn from_tag(tag: u8) -> CommandKind {
        if tag == READ_TAG {
            CommandKind::Read
        } else {
            CommandKind::Write
        }
    }

    /// The tag byte used when sending this kind of command
    pub fn tag(self) -> u8 {
        match self {
            CommandKind::Read => READ_TAG,
            CommandKind::Write => WRITE_TAG,
        }
    }
}

#[test]
fn unknown_tags_are_writes() {
    assert_eq!(CommandKind::from_tag(READ_TAG), CommandKind::Read);
    assert_eq!(CommandKind::from_tag(WRITE_TAG), CommandKind::Write);
    assert_eq!(CommandKind::from_tag(0x00), CommandKind::Write);
    assert_eq!(CommandKind::from_tag(0xff), CommandKind::Write);
}

/// The fixed size header that starts every request.
///
/// Layout (all multi-byte fields big-endian):
///
/// | Byte | Content |
/// |------|---------|
/// | 0    | command tag |
/// | 1-3  | reserved |
/// | 4-5  | payload length |
/// | 6-7  | register address |
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Header {
    kind: CommandKind,
    length: u16,
    address: u16,
}

impl Header {
    pub fn new(kind: CommandKind, address: u16, length: u16) -> Header {
        Header {
            kind,
            length,
            address,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Number of register bytes to read or write
    pub fn length(&self) -> u16 {
        self.length
    }

    /// The first register address the command targets
    pub fn address(&self) -> u16 {
        self.address
    }

    /// The number of bytes the complete frame occupies in the stream.
    /// Reads carry no payload, writes are followed by `length` bytes.
    pub fn frame_len(&self) -> usize {
        match self.kind {
            CommandKind::Read => HEADER_LEN,
            CommandKind::Write => HEADER_LEN + self.length as usize,
        }
    }
}

/// A request sent from the client to the server.
///
/// Reads are answered with a [`ReadResponse`]. Writes are never acknowledged,
/// so a client cannot observe whether a write reached the device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Read `length` registers starting at `address`.
    Read { address: u16, length: u16 },
    /// Write `data` to the registers starting at `address`.
    Write { address: u16, data: Box<[u8]> },
}

impl Request {
    pub fn header(&self) -> Header {
        match self {
            Request::Read { address, length } => Header::new(CommandKind::Read, *address, *length),
            Request::Write { address, data } => {
                Header::new(CommandKind::Write, *address, data.len() as u16)
            }
        }
    }
}

/// Outcome of a backend operation as transmitted in a read response.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Status(u8);

impl Status {
    pub const SUCCESS: Status = Status(0);
    /// Reported for every failing backend operation.
    pub const FAILURE: Status = Status(0xff);

    pub fn from_byte(byte: u8) -> Status {
        Status(byte)
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::SUCCESS
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_success() {
            write!(f, "success")
        } else {
            write!(f, "failure (0x{:02x})", self.0)
        }
    }
}

/// The reply to a [`Request::Read`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadResponse {
    status: Status,
    data: Box<[u8]>,
}

impl ReadResponse {
    pub fn new(status: Status, data: Box<[u8]>) -> ReadResponse {
        ReadResponse { status, data }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The register contents. Always as long as the requested length, even if the status
    /// reports a failure.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The value of the total length field. The field is 16 bits wide and wraps for payloads
    /// longer than `u16::MAX - 4` bytes.
    pub fn frame_len_field(&self) -> u16 {
        (RESPONSE_HEADER_LEN as u16).wrapping_add(self.data.len() as u16)
    }
}

#[test]
fn response_length_field_wraps() {
    let response = ReadResponse::new(Status::SUCCESS, vec![0; 4].into_boxed_slice());
    assert_eq!(response.frame_len_field(), 8);
    let response = ReadResponse::new(Status::SUCCESS, vec![0; u16::MAX as usize].into_boxed_slice());
    assert_eq!(response.frame_len_field(), 3);
}
