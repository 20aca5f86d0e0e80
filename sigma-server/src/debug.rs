//! # Debug Backend
//!
//! A register backend without any hardware behind it. It simulates a 256 byte
//! register window that lives in memory for as long as the backend exists, so values
//! written by one client can be read back by the next one.
//!
//! Requests that do not lie completely inside the window are not errors: reads return
//! zeros and writes are dropped. This lets clients probe arbitrary addresses without
//! ever observing a failure.
//!
//! ## Example Usage
//!
//! ```
//! use sigma_server::RegisterBackend;
//! use sigma_server::debug::DebugBackend;
//!
//! let backend = DebugBackend::new();
//! backend.write(0x4000, &[0xDE, 0xAD]).unwrap();
//!
//! let mut data = [0u8; 2];
//! backend.read(0x4000, &mut data).unwrap();
//! assert_eq!(data, [0xDE, 0xAD]);
//! ```
use std::{
    io,
    sync::{Mutex, PoisonError},
};

use crate::RegisterBackend;

/// Address of the first register in the simulated window unless configured otherwise.
pub const DEFAULT_BASE_ADDRESS: u16 = 0x4000;

/// Number of registers in the simulated window.
pub const WINDOW_SIZE: usize = 0x100;

/// Memory backed register window
#[derive(Debug)]
pub struct DebugBackend {
    base: u16,
    registers: Mutex<[u8; WINDOW_SIZE]>,
}

impl Default for DebugBackend {
    fn default() -> Self {
        DebugBackend::new()
    }
}

impl DebugBackend {
    pub fn new() -> DebugBackend {
        DebugBackend::with_base(DEFAULT_BASE_ADDRESS)
    }

    /// Creates a zero initialized window starting at `base`.
    pub fn with_base(base: u16) -> DebugBackend {
        log::debug!(
            "Debug backend window: 0x{:04x}..0x{:04x}",
            base,
            base as usize + WINDOW_SIZE
        );
        DebugBackend {
            base,
            registers: Mutex::new([0; WINDOW_SIZE]),
        }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// A copy of the current register contents
    pub fn registers(&self) -> [u8; WINDOW_SIZE] {
        *self.registers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The offset into the window, if `len` registers starting at `address` all lie inside it.
    fn window_offset(&self, address: u16, len: usize) -> Option<usize> {
        let offset = (address as usize).checked_sub(self.base as usize)?;
        (offset + len <= WINDOW_SIZE).then_some(offset)
    }
}

impl RegisterBackend for DebugBackend {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        let Some(offset) = self.window_offset(address, data.len()) else {
            log::trace!(
                "Debug read outside of window: address=0x{:04x}, len={}",
                address,
                data.len()
            );
            data.fill(0);
            return Ok(());
        };
        log::debug!("Debug read: address=0x{:04x}, len={}", address, data.len());
        let registers = self.registers.lock().unwrap_or_else(PoisonError::into_inner);
        data.copy_from_slice(&registers[offset..offset + data.len()]);
        Ok(())
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        let Some(offset) = self.window_offset(address, data.len()) else {
            log::trace!(
                "Debug write outside of window dropped: address=0x{:04x}, len={}",
                address,
                data.len()
            );
            return Ok(());
        };
        log::debug!("Debug write: address=0x{:04x}, len={}", address, data.len());
        let mut registers = self.registers.lock().unwrap_or_else(PoisonError::into_inner);
        registers[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{DebugBackend, WINDOW_SIZE};
    use crate::RegisterBackend;

    #[test]
    fn write_then_read() {
        let backend = DebugBackend::new();
        backend.write(0x4010, &[1, 2, 3, 4]).unwrap();
        let mut data = [0xffu8; 4];
        backend.read(0x4010, &mut data).unwrap();
        assert_eq!(data, [1, 2, 3, 4]);

        let mut data = [0xffu8; 2];
        backend.read(0x4012, &mut data).unwrap();
        assert_eq!(data, [3, 4]);
    }

    #[test]
    fn read_outside_window_is_zero() {
        let backend = DebugBackend::new();
        backend.write(0x4000, &[0xAA; WINDOW_SIZE]).unwrap();
        for (address, len) in [(0x0010, 4), (0x3fff, 1), (0x4100, 8), (0xffff, 16)] {
            let mut data = vec![0x55u8; len];
            backend.read(address, &mut data).unwrap();
            assert!(data.iter().all(|b| *b == 0), "address 0x{:04x}", address);
        }
    }

    #[test]
    fn read_crossing_window_end_is_zero() {
        let backend = DebugBackend::new();
        backend.write(0x40fe, &[0xAA, 0xBB]).unwrap();
        let mut data = [0x55u8; 4];
        backend.read(0x40fe, &mut data).unwrap();
        assert_eq!(data, [0, 0, 0, 0]);
    }

    #[test]
    fn writes_outside_window_are_dropped() {
        let backend = DebugBackend::new();
        backend.write(0x0000, &[0x11; 64]).unwrap();
        backend.write(0x3ffe, &[0x22; 4]).unwrap();
        backend.write(0x40ff, &[0x33; 2]).unwrap();
        backend.write(0xfff0, &[0x44; 16]).unwrap();
        assert_eq!(backend.registers(), [0; WINDOW_SIZE]);
    }

    #[test]
    fn full_window() {
        let backend = DebugBackend::new();
        let contents: Vec<u8> = (0..=255).collect();
        backend.write(0x4000, &contents).unwrap();
        assert_eq!(backend.registers().to_vec(), contents);
    }

    #[test]
    fn empty_write_has_no_effect() {
        let backend = DebugBackend::new();
        backend.write(0x4000, &[]).unwrap();
        backend.write(0x4100, &[]).unwrap();
        assert_eq!(backend.registers(), [0; WINDOW_SIZE]);
    }

    #[test]
    fn custom_base() {
        let backend = DebugBackend::with_base(0x0000);
        backend.write(0x0010, &[0x42]).unwrap();
        let mut data = [0u8; 1];
        backend.read(0x0010, &mut data).unwrap();
        assert_eq!(data, [0x42]);
        assert_eq!(backend.base(), 0);
    }
}
