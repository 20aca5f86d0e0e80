//! # I2C Backend
//!
//! For devices whose registers are reachable over I2C through the Linux
//! [i2c-dev](https://docs.kernel.org/i2c/dev-interface.html) interface.
//!
//! Register addresses are 16 bits wide and sent big-endian before the data.
//! A read is a combined transaction (address write followed by a repeated start read),
//! a write is a single transaction carrying address and data.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sigma_tcp_bridge::backends::i2c::I2cBackend;
//! use sigma_server::server::{Server, Config};
//!
//! let backend = I2cBackend::open("/dev/i2c-1", 0x38)?;
//! let server = Server::new(backend, Config::default());
//! server.listen("[::]:8086")?;
//! ```
use nix::{ioctl_write_int_bad, ioctl_write_ptr_bad};
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    os::fd::AsRawFd,
    path::Path,
};

use sigma_server::RegisterBackend;

/// Message as defined by `struct i2c_msg` in `linux/i2c.h`
#[repr(C)]
#[derive(Debug)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

/// Argument of the `I2C_RDWR` ioctl, `struct i2c_rdwr_ioctl_data` in `linux/i2c-dev.h`
#[repr(C)]
#[derive(Debug)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

const I2C_SLAVE: u32 = 0x0703;
const I2C_RDWR: u32 = 0x0707;
const I2C_M_RD: u16 = 0x0001;

// Select the slave address used by plain read/write calls
ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
// Perform combined transactions
ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrIoctlData);

/// Register access to a single device on an I2C bus.
pub struct I2cBackend {
    file: File,
    slave: u16,
}

impl I2cBackend {
    /// Opens the i2c-dev node at `device_path` and binds it to the device at `slave`.
    pub fn open(device_path: impl AsRef<Path>, slave: u16) -> io::Result<I2cBackend> {
        let path = device_path.as_ref();
        log::debug!("Opening I2C device: {}", path.display());
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // SAFETY: The file descriptor is valid for the lifetime of `file`
        // and I2C_SLAVE takes the address by value.
        unsafe {
            i2c_set_slave(file.as_raw_fd(), slave.into())?;
        }

        log::info!(
            "I2C device {} opened, slave address 0x{:02x}",
            path.display(),
            slave
        );
        Ok(I2cBackend { file, slave })
    }

    pub fn read_registers(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let len = u16::try_from(data.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "I2C read exceeds 65535 bytes")
        })?;

        log::debug!("I2C read: address=0x{:04x}, len={}", address, len);

        let mut register = address.to_be_bytes();
        let mut msgs = [
            I2cMsg {
                addr: self.slave,
                flags: 0,
                len: register.len() as u16,
                buf: register.as_mut_ptr(),
            },
            I2cMsg {
                addr: self.slave,
                flags: I2C_M_RD,
                len,
                buf: data.as_mut_ptr(),
            },
        ];
        let transaction = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // SAFETY: The ioctl call is safe because:
        // - File descriptor is valid (self.file is open)
        // - Both message buffers outlive the call and their lengths match the declared sizes
        unsafe {
            i2c_rdwr(self.file.as_raw_fd(), &transaction)?;
        }

        log::trace!("I2C read result: {:02x?}", data);
        Ok(())
    }

    pub fn write_registers(&self, address: u16, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        log::debug!("I2C write: address=0x{:04x}, len={}", address, data.len());
        log::trace!("I2C write data: {:02x?}", data);

        let mut transaction = Vec::with_capacity(2 + data.len());
        transaction.extend_from_slice(&address.to_be_bytes());
        transaction.extend_from_slice(data);

        // One write call is one bus transaction, so it must not be split up.
        let written = (&self.file).write(&transaction)?;
        if written != transaction.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!(
                    "I2C write transferred {} of {} bytes",
                    written,
                    transaction.len()
                ),
            ));
        }
        Ok(())
    }
}

impl RegisterBackend for I2cBackend {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        self.read_registers(address, data)
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        self.write_registers(address, data)
    }
}
