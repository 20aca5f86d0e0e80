//! # SigmaTCP Protocol Library
//!
//! This crate implements the wire format of the SigmaTCP register access protocol,
//! a small binary protocol that lets a remote client read and write the registers of
//! a device (typically an audio DSP) through a TCP bridge.
//!
//! ## Overview
//!
//! The protocol is a plain byte stream without any session handshake. A client sends
//! requests, the server forwards them to a register backend and answers reads:
//!
//! - Serialize and deserialize request headers
//! - Encode write requests together with their payload
//! - Encode and decode read responses
//!
//! ## Frame Format
//!
//! Every request starts with an 8 byte header. All multi-byte fields are big-endian.
//!
//! - **Read**: `0x0a <3 reserved> <length: u16> <address: u16>`
//! - **Write**: `0x0b <3 reserved> <length: u16> <address: u16> <length bytes of payload>`
//! - **Read response**: `0x0b <4 + length: u16> <status: u8> <length bytes of payload>`
//!
//! Writes are never answered. Tags other than `0x0a` are treated as writes.
//!
//! ## Basic Usage
//!
//! ### Encoding a Read Request
//!
//! ```
//! use sigma_protocol::Request;
//!
//! let mut buffer = Vec::new();
//! Request::Read { address: 0x0010, length: 4 }
//!     .write_to(&mut buffer)
//!     .expect("Writing to vector shouldn't fail");
//! assert_eq!(buffer, [0x0a, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x10]);
//! ```
//!
//! ### Decoding a Read Response
//!
//! ```
//! use sigma_protocol::{ReadResponse, Status};
//! use std::io::Cursor;
//!
//! let mut reader = Cursor::new([0x0b, 0x00, 0x08, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]);
//! let response = ReadResponse::from_reader(&mut reader, 4).expect("Response should parse");
//! assert_eq!(response.status(), Status::SUCCESS);
//! assert_eq!(response.data(), [0xDE, 0xAD, 0xBE, 0xEF]);
//! ```
//!
//! ### Decoding a Request Header
//!
//! ```
//! use sigma_protocol::{CommandKind, Header};
//!
//! let header = Header::decode(&[0x0b, 0x00, 0x00, 0x00, 0x00, 0x04, 0x40, 0x00]);
//! assert_eq!(header.kind(), CommandKind::Write);
//! assert_eq!(header.address(), 0x4000);
//! assert_eq!(header.frame_len(), 12);
//! ```
//!
//! ## Error Handling
//!
//! This library uses the [`error::ReadError`] type for protocol parsing errors.
//!
//! ## Feature Flags
//!
//! - `tokio`: provides [`framed::RegisterCodec`] for use with `tokio_util::codec::Framed`.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
#[cfg(feature = "tokio")]
pub mod framed;
