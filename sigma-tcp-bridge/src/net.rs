use std::{
    io,
    net::{SocketAddr, SocketAddrV4, SocketAddrV6, TcpListener},
    os::fd::AsRawFd,
};

use nix::{
    ifaddrs::getifaddrs,
    net::if_::InterfaceFlags,
    sys::socket::{
        AddressFamily, Backlog, SockFlag, SockType, SockaddrStorage, bind as bind_socket, getsockopt,
        listen, setsockopt, socket, sockopt,
    },
};

/// Binds the listening socket.
///
/// IPv6 sockets (such as the default `::`) are switched to dual-stack before binding,
/// so IPv4 clients can connect through mapped addresses regardless of the system
/// default. Failing to do so is logged and the socket stays IPv6 only.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let family = if addr.is_ipv6() {
        AddressFamily::Inet6
    } else {
        AddressFamily::Inet
    };
    let fd = socket(family, SockType::Stream, SockFlag::SOCK_CLOEXEC, None)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true)?;

    if addr.is_ipv6() {
        if let Err(e) = setsockopt(&fd, sockopt::Ipv6V6Only, &false) {
            log::warn!("Could not enable dual-stack, IPv4 clients cannot connect: {}", e);
        }
        match getsockopt(&fd, sockopt::Ipv6V6Only) {
            Ok(true) => log::warn!("Socket is IPv6 only, IPv4 clients cannot connect"),
            Ok(false) => log::debug!("Socket accepts IPv4 and IPv6 clients"),
            Err(e) => log::warn!("Could not query IPV6_V6ONLY: {}", e),
        }
    }

    bind_socket(fd.as_raw_fd(), &SockaddrStorage::from(addr))?;
    listen(&fd, Backlog::MAXCONN)?;
    Ok(TcpListener::from(fd))
}

/// Logs the addresses of all non-loopback interfaces, so the user knows where
/// clients can reach the server.
pub fn log_interface_addresses() {
    let addrs = match getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            log::warn!("Could not list interface addresses: {}", e);
            return;
        }
    };

    log::info!("IP addresses:");
    for ifaddr in addrs {
        if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK) {
            continue;
        }
        let Some(address) = ifaddr.address else {
            continue;
        };
        if let Some(sin) = address.as_sockaddr_in() {
            log::info!(" {}: {}", ifaddr.interface_name, SocketAddrV4::from(*sin).ip());
        } else if let Some(sin6) = address.as_sockaddr_in6() {
            log::info!(" {}: {}", ifaddr.interface_name, SocketAddrV6::from(*sin6).ip());
        }
    }
}
