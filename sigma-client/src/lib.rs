//! # SigmaTCP Client
//!
//! A Rust client library for connecting to SigmaTCP servers and accessing
//! the registers of the device behind them.
//!
//! ## Overview
//!
//! This crate provides a blocking client for the SigmaTCP register access protocol.
//! It handles message serialization and decodes the responses to reads.
//!
//! ## Protocol Support
//!
//! - **Read**: Read a range of registers, returning the backend status and the data
//! - **Write**: Write a range of registers. Writes are not acknowledged by the server.
//!
//! For detailed protocol information, see the [`sigma_protocol`] crate.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use sigma_client::SigmaClient;
//!
//! let mut client = SigmaClient::new("127.0.0.1:8086")?;
//!
//! client.write(0x4000, &[0xDE, 0xAD, 0xBE, 0xEF])?;
//! let response = client.read(0x4000, 4)?;
//! assert!(response.status().is_success());
//! println!("Registers: {:02x?}", response.data());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Related Crates
//!
//! - [`sigma_server`](https://docs.rs/sigma-server/) - Server implementation
//! - [`sigma_protocol`] - Protocol encoding/decoding
use std::{
    io,
    net::{TcpStream, ToSocketAddrs},
};

use sigma_protocol::{ReadResponse, Request, error::ReadError};

/// SigmaTCP client for remote register access.
pub struct SigmaClient {
    tcp: TcpStream,
}

impl SigmaClient {
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<SigmaClient> {
        let tcp = TcpStream::connect(addr)?;
        tcp.set_nodelay(true)?;
        Ok(SigmaClient { tcp })
    }

    /// Read `length` registers starting at `address`.
    ///
    /// # Returns
    ///
    /// The response of the server. Check [`ReadResponse::status`] to find out whether the
    /// backend could perform the read. The data is always `length` bytes long.
    pub fn read(&mut self, address: u16, length: u16) -> Result<ReadResponse, ReadError> {
        Request::Read { address, length }.write_to(&mut self.tcp)?;
        ReadResponse::from_reader(&mut self.tcp, length)
    }

    /// Write `data` to the registers starting at `address`.
    ///
    /// The protocol has no acknowledgement for writes, so success only means
    /// that the request was sent.
    pub fn write(&mut self, address: u16, data: &[u8]) -> io::Result<()> {
        Request::Write {
            address,
            data: data.into(),
        }
        .write_to(&mut self.tcp)
    }
}
