//! # SigmaTCP Register Bridge
//!
//! Serves the SigmaTCP protocol on a TCP port and forwards register accesses to one of
//! several backends, selected once at startup:
//!
//! - `debug`: a simulated 256 byte register window in memory
//! - `i2c`: a device on an I2C bus, through i2c-dev
//! - `regmap`: a kernel regmap, through debugfs
//! - `bioson`: write-only commands to the FIFO of the bioson service
pub mod backends;
mod net;

use std::error::Error;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, error::ErrorKind};
use clap_num::maybe_hex;
use env_logger::Env;
use sigma_protocol::DEFAULT_PORT;
use sigma_server::{
    RegisterBackend,
    debug::{DEFAULT_BASE_ADDRESS, DebugBackend},
    server::{Config, Server},
};

use crate::backends::bioson::DEFAULT_FIFO_PATH;

const AVAILABLE_BACKENDS: &str = "debug, i2c, regmap, bioson";

#[derive(Subcommand, Eq, PartialEq, Clone, Debug)]
enum BackendImpl {
    /// Simulated register window kept in memory
    Debug {
        #[arg(
            short,
            long,
            help = "Address of the first register of the window",
            value_parser = maybe_hex::<u16>,
            default_value = "0x4000"
        )]
        base: u16,
    },
    /// Registers of an I2C device
    I2c {
        /// The i2c-dev node of the bus, e.g. /dev/i2c-1
        device: PathBuf,
        /// The 7 bit address of the device on the bus
        #[arg(value_parser = maybe_hex::<u16>)]
        slave_address: u16,
    },
    /// Registers of a kernel regmap, accessed through debugfs
    Regmap {
        /// Name of the regmap below /sys/kernel/debug/regmap
        name: String,
    },
    /// Write-only forwarding to the bioson FIFO
    Bioson {
        bus: String,
        /// The 8 bit device address
        address: String,
        register: String,
        #[arg(long, default_value = DEFAULT_FIFO_PATH)]
        fifo: PathBuf,
    },
}

#[derive(Parser)]
#[command(name = "sigma-tcp", about = "SigmaTCP register access bridge", long_about=None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = IpAddr::V6(Ipv6Addr::UNSPECIFIED))]
    ip: IpAddr,

    #[clap(subcommand)]
    backend: Option<BackendImpl>,
}

/// The exit status for command line errors that do not go through clap's own exit.
///
/// An unknown backend prints the usage and exits successfully, missing or malformed
/// backend arguments exit with status 1.
fn usage_exit_code(kind: ErrorKind) -> Option<i32> {
    match kind {
        ErrorKind::InvalidSubcommand => Some(0),
        ErrorKind::MissingRequiredArgument
        | ErrorKind::ValueValidation
        | ErrorKind::InvalidValue => Some(1),
        _ => None,
    }
}

/// Parses the command line.
fn parse_args() -> Args {
    let err = match Args::try_parse() {
        Ok(args) => return args,
        Err(err) => err,
    };
    match usage_exit_code(err.kind()) {
        Some(0) => {
            println!("{}", Args::command().render_usage());
            println!("Available backends: {}", AVAILABLE_BACKENDS);
            process::exit(0);
        }
        Some(code) => {
            if let Err(e) = err.print() {
                log::error!("Could not print usage error: {}", e);
            }
            process::exit(code);
        }
        None => err.exit(),
    }
}

fn run(
    backend: impl RegisterBackend,
    addr: SocketAddr,
    config: Config,
) -> Result<(), Box<dyn Error>> {
    log::info!("Binding to address: {}", addr);
    let listener = net::bind(addr)?;
    net::log_interface_addresses();

    let server = Server::new(backend, config);
    server.serve(listener)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("Starting SigmaTCP server");

    let args = parse_args();
    log::debug!("Parsed arguments: ip={}, port={}", args.ip, args.port);

    let config = Config::default();
    log::debug!(
        "Server config: initial_buffer_size={}",
        config.initial_buffer_size
    );

    let addr = SocketAddr::new(args.ip, args.port);

    let backend = args.backend.unwrap_or(BackendImpl::Debug {
        base: DEFAULT_BASE_ADDRESS,
    });

    match backend {
        BackendImpl::Debug { base } => {
            log::info!("Using debug backend");
            run(DebugBackend::with_base(base), addr, config)
        }
        BackendImpl::I2c {
            device,
            slave_address,
        } => {
            use crate::backends::i2c::I2cBackend;

            log::info!("Using i2c backend");
            let backend = I2cBackend::open(&device, slave_address).inspect_err(|e| {
                log::error!("Could not open I2C device {}: {}", device.display(), e)
            })?;
            run(backend, addr, config)
        }
        BackendImpl::Regmap { name } => {
            use crate::backends::regmap::RegmapBackend;

            log::info!("Using regmap backend");
            let backend = RegmapBackend::open(&name)
                .inspect_err(|e| log::error!("Could not open regmap {}: {}", name, e))?;
            run(backend, addr, config)
        }
        BackendImpl::Bioson {
            bus,
            address,
            register,
            fifo,
        } => {
            use crate::backends::bioson::BiosonBackend;

            let backend = BiosonBackend::open(&fifo, &bus, &address, &register)
                .inspect_err(|e| log::error!("Could not open bioson backend: {}", e))?;
            run(backend, addr, config)
        }
    }
}
