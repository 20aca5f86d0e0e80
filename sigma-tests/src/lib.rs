//! Shared helpers for the end-to-end tests of the SigmaTCP crates.
use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener},
    thread,
};

use sigma_server::{
    RegisterBackend,
    server::{Config, Server},
};

/// Starts a server for `backend` on an ephemeral localhost port and returns its address.
///
/// The server runs on a background thread for the rest of the test process.
pub fn spawn_server<T>(backend: T, config: Config) -> SocketAddr
where
    T: RegisterBackend + Send + 'static,
{
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");
    thread::spawn(move || {
        let server = Server::new(backend, config);
        if let Err(e) = server.serve(listener) {
            panic!("server stopped: {}", e);
        }
    });
    addr
}
