//! # Regmap Backend
//!
//! Accesses the registers of a device through the debugfs view of its kernel regmap,
//! `/sys/kernel/debug/regmap/<name>/registers`.
//!
//! Reading the file yields one `<address>: <value>` line per register, both in hex.
//! Writing `<address> <value>` to it updates a register, provided the kernel was built
//! with regmap debugfs write support. Every register holds one byte of the payload.
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use sigma_server::RegisterBackend;

/// Directory that contains one subdirectory per registered regmap
pub const DEBUGFS_ROOT: &str = "/sys/kernel/debug/regmap";

/// Registers of a regmap with 8 bit values. Wider values are reported as errors on read.
pub struct RegmapBackend {
    registers: PathBuf,
}

/// Parses a line like `4000: 1f`
fn parse_register_line(line: &str) -> Option<(u32, u32)> {
    let (address, value) = line.split_once(':')?;
    let address = u32::from_str_radix(address.trim(), 16).ok()?;
    let value = u32::from_str_radix(value.trim(), 16).ok()?;
    Some((address, value))
}

impl RegmapBackend {
    /// Opens the regmap called `name` in debugfs.
    pub fn open(name: &str) -> io::Result<RegmapBackend> {
        RegmapBackend::open_in(DEBUGFS_ROOT, name)
    }

    /// Opens the regmap called `name` below `root` instead of the debugfs mount.
    pub fn open_in(root: impl AsRef<Path>, name: &str) -> io::Result<RegmapBackend> {
        let registers = root.as_ref().join(name).join("registers");
        log::debug!("Opening regmap registers: {}", registers.display());
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&registers)?;
        log::info!("Regmap {} opened", name);
        Ok(RegmapBackend { registers })
    }
}

impl RegisterBackend for RegmapBackend {
    fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        log::debug!("Regmap read: address=0x{:04x}, len={}", address, data.len());

        let contents = fs::read_to_string(&self.registers)?;
        let first = address as u32;
        let mut found = vec![false; data.len()];
        for (register, value) in contents.lines().filter_map(parse_register_line) {
            let Some(index) = register.checked_sub(first).map(|i| i as usize) else {
                continue;
            };
            if index < data.len() {
                data[index] = u8::try_from(value).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Register 0x{:x} holds 0x{:x}, wider than 8 bits", register, value),
                    )
                })?;
                found[index] = true;
            }
        }

        if let Some(missing) = found.iter().position(|f| !f) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "Register 0x{:x} is not part of the regmap",
                    first + missing as u32
                ),
            ));
        }
        log::trace!("Regmap read result: {:02x?}", data);
        Ok(())
    }

    fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        log::debug!("Regmap write: address=0x{:04x}, len={}", address, data.len());

        let mut file = OpenOptions::new().write(true).open(&self.registers)?;
        for (offset, value) in data.iter().enumerate() {
            // debugfs expects a single register per write call
            let line = format!("{:x} {:x}\n", address as u32 + offset as u32, value);
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{RegmapBackend, parse_register_line};
    use sigma_server::RegisterBackend;
    use std::fs;

    fn regmap(contents: &str) -> (tempfile::TempDir, RegmapBackend) {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("adau1701")).unwrap();
        fs::write(root.path().join("adau1701").join("registers"), contents).unwrap();
        let backend = RegmapBackend::open_in(root.path(), "adau1701").unwrap();
        (root, backend)
    }

    #[test]
    fn parse_lines() {
        assert_eq!(parse_register_line("081c: 1f"), Some((0x081c, 0x1f)));
        assert_eq!(parse_register_line("  10:00ff"), Some((0x10, 0xff)));
        assert_eq!(parse_register_line("10 00"), None);
        assert_eq!(parse_register_line("zz: 00"), None);
    }

    #[test]
    fn read_registers() {
        let (_root, backend) = regmap("0000: 00\n4000: de\n4001: ad\n4002: be\n4003: ef\n");
        let mut data = [0u8; 3];
        backend.read(0x4001, &mut data).unwrap();
        assert_eq!(data, [0xad, 0xbe, 0xef]);
    }

    #[test]
    fn read_of_missing_register_fails() {
        let (_root, backend) = regmap("4000: de\n4002: be\n");
        let mut data = [0u8; 3];
        let err = backend.read(0x4000, &mut data).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn read_of_wide_register_fails() {
        let (_root, backend) = regmap("4000: 12\n4001: 1234\n");
        let mut data = [0u8; 1];
        backend.read(0x4000, &mut data).unwrap();
        assert_eq!(data, [0x12]);

        let mut data = [0u8; 2];
        let err = backend.read(0x4000, &mut data).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn write_registers() {
        let (_root, backend) = regmap("");
        backend.write(0x4000, &[0xde, 0x0a]).unwrap();
        backend.write(0x5000, &[]).unwrap();
        let written = fs::read_to_string(&backend.registers).unwrap();
        assert_eq!(written, "4000 de\n4001 a\n");
    }

    #[test]
    fn open_missing_regmap() {
        let root = tempfile::tempdir().unwrap();
        let err = RegmapBackend::open_in(root.path(), "missing").err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
