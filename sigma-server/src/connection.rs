//! Connection buffer that turns the TCP byte stream into requests.
//!
//! TCP does not preserve the boundaries of the frames a client sends. A read from the
//! socket may return half a header, a header with part of its payload, or several
//! frames at once. [`RequestBuffer`] retains whatever has not been dispatched yet and
//! hands out requests once they are complete.
//!
//! # Example
//!
//! ```
//! use sigma_server::connection::RequestBuffer;
//! use sigma_protocol::Request;
//!
//! let mut buffer = RequestBuffer::new();
//! buffer.extend_from_slice(&[0x0a, 0x00, 0x00, 0x00]);
//! assert_eq!(buffer.next_request(), None);
//!
//! buffer.extend_from_slice(&[0x00, 0x04, 0x00, 0x10]);
//! assert_eq!(
//!     buffer.next_request(),
//!     Some(Request::Read { address: 0x10, length: 4 })
//! );
//! ```
use std::io::{self, Read};

use bytes::{Buf, BytesMut};
use sigma_protocol::{CommandKind, HEADER_LEN, Header, Request, WRITE_TAG};

/// Initial capacity of a connection buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Buffer for accumulating incoming bytes and extracting complete requests.
///
/// The buffer holds the bytes that were received but not yet dispatched: either a
/// partial header, or a write header together with part of its payload, possibly
/// followed by further frames.
#[derive(Debug)]
pub struct RequestBuffer {
    buffer: BytesMut,
    /// How many bytes the buffer must be able to hold. Starts at the initial capacity
    /// and grows when a write announces a frame that does not fit.
    capacity: usize,
}

impl Default for RequestBuffer {
    fn default() -> Self {
        RequestBuffer::new()
    }
}

impl RequestBuffer {
    pub fn new() -> RequestBuffer {
        RequestBuffer::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a buffer that initially holds up to `capacity` bytes.
    /// The capacity is never smaller than a single header.
    pub fn with_capacity(capacity: usize) -> RequestBuffer {
        let capacity = capacity.max(HEADER_LEN);
        RequestBuffer {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of buffered bytes that have not been turned into a request yet
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The number of bytes the buffer currently accepts before a request has to be taken out.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Performs a single read from `reader` into the free part of the buffer.
    ///
    /// Returns the number of bytes read. `Ok(0)` means the peer closed the stream.
    pub fn read_from(&mut self, reader: &mut impl Read) -> io::Result<usize> {
        let filled = self.buffer.len();
        let spare = self.capacity.saturating_sub(filled).max(1);
        self.buffer.resize(filled + spare, 0);
        match reader.read(&mut self.buffer[filled..]) {
            Ok(n) => {
                self.buffer.truncate(filled + n);
                Ok(n)
            }
            Err(err) => {
                self.buffer.truncate(filled);
                Err(err)
            }
        }
    }

    /// Takes the next complete request out of the buffer.
    ///
    /// Returns `None` if more bytes are needed. If the pending frame is a write that does
    /// not fit into the buffer, the capacity grows so that the next reads can complete it.
    pub fn next_request(&mut self) -> Option<Request> {
        let header = Header::peek(&self.buffer)?;
        match header.kind() {
            CommandKind::Read => {
                self.buffer.advance(HEADER_LEN);
                Some(Request::Read {
                    address: header.address(),
                    length: header.length(),
                })
            }
            CommandKind::Write => {
                let frame_len = header.frame_len();
                if self.buffer.len() < frame_len {
                    if self.capacity < frame_len {
                        log::debug!(
                            "Growing request buffer from {} to {} bytes",
                            self.capacity,
                            frame_len
                        );
                        self.capacity = frame_len;
                    }
                    return None;
                }

                if self.buffer[0] != WRITE_TAG {
                    log::debug!("Treating unknown tag 0x{:02x} as write", self.buffer[0]);
                }
                let frame = self.buffer.split_to(frame_len);
                Some(Request::Write {
                    address: header.address(),
                    data: Box::from(&frame[HEADER_LEN..]),
                })
            }
        }
    }
}
