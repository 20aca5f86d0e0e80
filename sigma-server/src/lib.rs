//! # SigmaTCP Server Library
//!
//! This crate provides a foundation for implementing SigmaTCP servers that expose
//! the registers of a device to remote clients over TCP.
//!
//! ## Overview
//!
//! Clients send read and write requests addressing 16 bit register addresses.
//! This library decodes those requests from the TCP byte stream, forwards them to
//! a register backend and sends the results of reads back to the client.
//!
//! ## Architecture
//!
//! The crate is built around these components:
//!
//! - **[`RegisterBackend`] Trait**: Defines the interface that backends must implement
//!   to access a register space (an I2C device, a regmap, a simulated memory, ...)
//! - **[`connection::RequestBuffer`]**: Accumulates bytes from the socket and splits them
//!   into complete requests, regardless of how TCP fragments or coalesces them
//! - **[`server::Server`]**: Accepts connections and drives each one to completion
//! - **[`debug::DebugBackend`]**: A memory backed register window, useful for testing clients
//!
//! ## How It Works
//!
//! 1. A backend implements the [`RegisterBackend`] trait
//! 2. The backend is wrapped in a [`server::Server`] instance
//! 3. The server listens for TCP connections and serves one client at a time
//! 4. Each decoded request is dispatched to the backend
//! 5. Reads are answered with a response frame carrying the backend status and data
//!
//! ## Basic Usage
//!
//! ```no_run
//! use sigma_server::debug::DebugBackend;
//! use sigma_server::server::{Config, Server};
//!
//! let server = Server::new(DebugBackend::new(), Config::default());
//! server.listen("[::]:8086").expect("Server should run");
//! ```
//!
//! ## Error Handling
//!
//! Backend errors never terminate a connection. A failing read is reported through the
//! status byte of the response. Writes are not acknowledged by the protocol, so a failing
//! write is only logged. I/O errors on the socket terminate the affected connection,
//! after which the server accepts the next client.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Client connections and disconnections
//! - Requests being processed
//! - Backend failures
//!
//! ## Thread Model
//!
//! The server processes client connections sequentially in the calling thread.
//! Backends take `&self`, so implementations that hold mutable state must synchronize
//! internally, which also allows sharing a backend between servers.
use std::{io, rc::Rc, sync::Arc};

pub mod connection;
pub mod debug;
pub mod server;

/// Trait that backends must implement to provide register access.
///
/// Device setup (opening a bus, checking a pipe, ...) happens when the backend is
/// constructed, before it is handed to the server. A server never starts listening
/// without a fully constructed backend.
pub trait RegisterBackend {
    /// Read `data.len()` registers starting at `address` into `data`.
    ///
    /// Backends may decide that some addresses are not backed by anything and fill
    /// `data` with a placeholder value while still returning `Ok`. Backends that cannot
    /// read at all must fail immediately instead of blocking.
    ///
    /// # Error Handling
    ///
    /// An error is reported to the client as a failure status. The server zero-fills
    /// `data` in that case, so implementations may leave it partially written.
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()>;

    /// Write `data` to the registers starting at `address`.
    ///
    /// Writing an empty slice must not have any side effects.
    ///
    /// # Error Handling
    ///
    /// The protocol has no acknowledgement for writes. Errors are logged by the server
    /// but never reach the client.
    fn write(&self, address: u16, data: &[u8]) -> io::Result<()>;
}

impl<T: RegisterBackend + ?Sized> RegisterBackend for &T {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        (**self).read(address, data)
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        (**self).write(address, data)
    }
}

impl<T: RegisterBackend + ?Sized> RegisterBackend for Box<T> {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        (**self).read(address, data)
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        (**self).write(address, data)
    }
}

impl<T: RegisterBackend + ?Sized> RegisterBackend for Rc<T> {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        (**self).read(address, data)
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        (**self).write(address, data)
    }
}

impl<T: RegisterBackend + ?Sized> RegisterBackend for Arc<T> {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        (**self).read(address, data)
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        (**self).write(address, data)
    }
}
