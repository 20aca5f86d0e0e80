//! # Bioson FIFO Backend
//!
//! A write-only backend for boards driven by the bioson Linux service. Instead of
//! touching registers itself, it writes textual commands into the FIFO that service
//! reads from. Each command is sent with its own open, write and close of the FIFO.
//!
//! The command only carries the register address. Payload bytes are not forwarded,
//! which is a limitation of the command format understood by the service.
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use sigma_server::RegisterBackend;

/// The FIFO the bioson service reads commands from
pub const DEFAULT_FIFO_PATH: &str = "/tmp/biosonlinux_fifo_in";

pub struct BiosonBackend {
    fifo: PathBuf,
}

impl BiosonBackend {
    /// Checks that the FIFO exists.
    ///
    /// `bus`, `device_address` and `register` identify the target for the operator.
    /// The service has them configured itself, so they are only logged.
    pub fn open(
        fifo: impl AsRef<Path>,
        bus: &str,
        device_address: &str,
        register: &str,
    ) -> io::Result<BiosonBackend> {
        let fifo = fifo.as_ref();
        if !fifo.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("FIFO {} does not exist", fifo.display()),
            ));
        }
        log::info!(
            "Using bioson backend: fifo={}, bus={}, address={}, register={}",
            fifo.display(),
            bus,
            device_address,
            register
        );
        Ok(BiosonBackend {
            fifo: fifo.to_path_buf(),
        })
    }

    /// The command that announces a write to `register`
    pub fn command(register: u16) -> String {
        format!("i 20 01 D8 {:02X}", register)
    }

    fn send_command(&self, command: &str) -> io::Result<()> {
        log::debug!("Sending bioson command: {}", command);
        // Blocks until the service has the FIFO open for reading.
        let mut fifo = OpenOptions::new().write(true).open(&self.fifo)?;
        writeln!(fifo, "{}", command)
    }
}

impl RegisterBackend for BiosonBackend {
    fn read(&self, address: u16, _data: &mut [u8]) -> io::Result<()> {
        log::debug!("Bioson read at 0x{:04x} rejected", address);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Read not supported (write-only backend)",
        ))
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        log::trace!("Bioson write payload not forwarded: {:02x?}", data);
        self.send_command(&BiosonBackend::command(address))
    }
}
