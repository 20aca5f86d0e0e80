use std::{
    io::{self, ErrorKind, Read, Write},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{RegisterBackend, connection::RequestBuffer};
use sigma_protocol::{ReadResponse, Request, Status};

#[derive(Debug, Clone)]
pub struct Config {
    /// Initial size of the per-connection request buffer. Grows on demand for larger writes.
    pub initial_buffer_size: usize,
    /// TCP read and write timeout. `None` lets a stalled client keep the connection forever.
    pub read_write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_buffer_size: crate::connection::DEFAULT_CAPACITY,
            read_write_timeout: None,
        }
    }
}

#[derive(Debug)]
pub struct Server<T: RegisterBackend> {
    backend: T,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```
/// use sigma_server::debug::DebugBackend;
/// use sigma_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .initial_buffer_size(1024)
///     .rw_timeout(Duration::from_secs(20))
///     .build(DebugBackend::new());
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the initial size of the buffer that holds incoming requests.
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.config.initial_buffer_size = size;
        self
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = Some(timeout);
        self
    }

    /// Build and return the server
    pub fn build<T: RegisterBackend>(self, backend: T) -> Server<T> {
        Server::new(backend, self.config)
    }
}

impl<T: RegisterBackend> Server<T> {
    pub fn new(backend: T, config: Config) -> Server<T> {
        Server { backend, config }
    }

    pub fn backend(&self) -> &T {
        &self.backend
    }

    pub fn listen(&self, addr: impl ToSocketAddrs) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener)?;
        Ok(())
    }

    /// Accepts clients from `listener` one at a time.
    /// Each connection is served to completion before the next one is accepted.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        log::info!(
            "Server listening for connections on {}",
            listener.local_addr()?
        );

        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => {
                    let peer_addr = tcp.peer_addr().ok();
                    if let Some(addr) = peer_addr {
                        log::info!("New client connection from {}", addr);
                    }
                    if let Err(e) = self.handle_client(tcp) {
                        log::error!("Client error: {}", e);
                    }
                    log::info!("Connection closed");
                }
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
        Ok(())
    }

    fn handle_client(&self, mut tcp: TcpStream) -> io::Result<()> {
        tcp.set_read_timeout(self.config.read_write_timeout)?;
        tcp.set_write_timeout(self.config.read_write_timeout)?;
        self.handle_stream(&mut tcp)
    }

    /// Serves a single connection until the peer closes it.
    ///
    /// Returns an error if reading from or writing to the stream fails for a reason
    /// other than the peer going away.
    pub fn handle_stream(&self, stream: &mut (impl Read + Write)) -> io::Result<()> {
        let mut buffer = RequestBuffer::with_capacity(self.config.initial_buffer_size);

        loop {
            match buffer.read_from(stream) {
                Ok(0) => break, // Client disconnected
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    log::error!("Client read timeout, closing connection");
                    break;
                }
                Err(err)
                    if err.kind() == ErrorKind::ConnectionAborted
                        || err.kind() == ErrorKind::ConnectionReset =>
                {
                    break;
                } // Client disconnected
                Err(other) => return Err(other),
            }

            while let Some(request) = buffer.next_request() {
                self.process_request(request, stream)?;
            }
        }

        if !buffer.is_empty() {
            log::debug!(
                "Discarding {} bytes of an incomplete request",
                buffer.len()
            );
        }
        Ok(())
    }

    /// Process each request, forwarding it to the backend.
    fn process_request(&self, request: Request, stream: &mut impl Write) -> io::Result<()> {
        match request {
            Request::Read { address, length } => {
                log::debug!(
                    "Received Read request: address=0x{:04x}, length={}",
                    address,
                    length
                );
                let mut data = vec![0u8; length as usize].into_boxed_slice();
                let status = match self.backend.read(address, &mut data) {
                    Ok(()) => Status::SUCCESS,
                    Err(e) => {
                        log::error!("Backend read error at 0x{:04x}: {}", address, e);
                        data.fill(0);
                        Status::FAILURE
                    }
                };
                log::trace!("Read result data: {:02x?}", &data[..]);
                ReadResponse::new(status, data).write_to(stream)?;
                log::debug!("Sent Read response: status={}", status);
            }
            Request::Write { address, data } => {
                log::debug!(
                    "Received Write request: address=0x{:04x}, length={}",
                    address,
                    data.len()
                );
                log::trace!("Write data: {:02x?}", &data[..]);
                // Writes are not acknowledged, the client never learns about a failure.
                if let Err(e) = self.backend.write(address, &data) {
                    log::error!("Backend write error at 0x{:04x}: {}", address, e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Builder, Config, Server};
    use crate::RegisterBackend;
    use crate::debug::DebugBackend;
    use sigma_protocol::{ReadResponse, Request, Status};
    use std::cell::RefCell;
    use std::io::{self, Cursor, Read, Write};
    use std::rc::Rc;

    /// In-memory connection that delivers the input in fixed size chunks
    /// and records everything the server writes.
    struct MockStream {
        input: Vec<u8>,
        position: usize,
        chunk_size: usize,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(input: Vec<u8>, chunk_size: usize) -> MockStream {
            MockStream {
                input,
                position: 0,
                chunk_size,
                output: Vec::new(),
            }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let remaining = &self.input[self.position..];
            let n = remaining.len().min(buf.len()).min(self.chunk_size);
            buf[..n].copy_from_slice(&remaining[..n]);
            self.position += n;
            Ok(n)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Read(u16, usize),
        Write(u16, Vec<u8>),
    }

    /// Records every call and answers reads with a fixed pattern
    #[derive(Default)]
    struct RecordingBackend {
        calls: RefCell<Vec<Call>>,
    }

    impl RegisterBackend for RecordingBackend {
        fn read(&self, address: u16, data: &mut [u8]) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Read(address, data.len()));
            data.fill(0x5A);
            Ok(())
        }

        fn write(&self, address: u16, data: &[u8]) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Write(address, data.to_vec()));
            Ok(())
        }
    }

    /// A write only backend
    struct WriteOnly;

    impl RegisterBackend for WriteOnly {
        fn read(&self, _address: u16, data: &mut [u8]) -> io::Result<()> {
            data.fill(0xEE);
            Err(io::Error::new(io::ErrorKind::Unsupported, "write only"))
        }

        fn write(&self, _address: u16, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::other("pipe closed"))
        }
    }

    fn encode(requests: &[Request]) -> Vec<u8> {
        let mut out = Vec::new();
        for request in requests {
            request.write_to(&mut out).unwrap();
        }
        out
    }

    fn run<T: RegisterBackend>(server: &Server<T>, input: Vec<u8>, chunk_size: usize) -> Vec<u8> {
        let mut stream = MockStream::new(input, chunk_size);
        server.handle_stream(&mut stream).unwrap();
        stream.output
    }

    #[test]
    fn read_of_unwritten_register() {
        let server = Server::new(DebugBackend::new(), Config::default());
        let output = run(
            &server,
            vec![0x0a, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x10],
            usize::MAX,
        );
        assert_eq!(output, vec![0x0b, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn write_then_read_back() {
        let server = Server::new(DebugBackend::new(), Config::default());
        let output = run(
            &server,
            vec![
                0x0b, 0x00, 0x00, 0x00, 0x00, 0x04, 0x40, 0x00, 0xDE, 0xAD, 0xBE, 0xEF, 0x0a, 0x00,
                0x00, 0x00, 0x00, 0x04, 0x40, 0x00,
            ],
            usize::MAX,
        );
        assert_eq!(
            output,
            vec![0x0b, 0x00, 0x08, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn response_length_matches_request() {
        let server = Server::new(DebugBackend::new(), Config::default());
        for length in [0u16, 1, 7, 255, 256, 1000] {
            let input = encode(&[Request::Read {
                address: 0x4000,
                length,
            }]);
            let output = run(&server, input, usize::MAX);
            assert_eq!(output.len(), 4 + length as usize);
            let response = ReadResponse::from_reader(&mut Cursor::new(output), length).unwrap();
            assert_eq!(response.status(), Status::SUCCESS);
        }
    }

    #[test]
    fn backend_calls_do_not_depend_on_chunking() {
        let requests = [
            Request::Write {
                address: 0x4000,
                data: vec![1, 2, 3].into_boxed_slice(),
            },
            Request::Read {
                address: 0x4000,
                length: 3,
            },
            Request::Write {
                address: 0x1234,
                data: vec![0xAB; 700].into_boxed_slice(),
            },
            Request::Write {
                address: 0x0001,
                data: Box::default(),
            },
            Request::Read {
                address: 0xffff,
                length: 0,
            },
        ];
        let input = encode(&requests);
        let expected_calls = vec![
            Call::Write(0x4000, vec![1, 2, 3]),
            Call::Read(0x4000, 3),
            Call::Write(0x1234, vec![0xAB; 700]),
            Call::Write(0x0001, vec![]),
            Call::Read(0xffff, 0),
        ];

        let mut outputs = Vec::new();
        for chunk_size in [1, 5, 8, 64, usize::MAX] {
            let backend = Rc::new(RecordingBackend::default());
            let server = Builder::new()
                .initial_buffer_size(32)
                .build(Rc::clone(&backend));
            outputs.push(run(&server, input.clone(), chunk_size));
            assert_eq!(*backend.calls.borrow(), expected_calls);
        }
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            outputs[0],
            vec![
                0x0b, 0x00, 0x07, 0x00, 0x5A, 0x5A, 0x5A, 0x0b, 0x00, 0x04, 0x00
            ]
        );
    }

    #[test]
    fn failing_backend_keeps_connection_open() {
        let server = Server::new(WriteOnly, Config::default());
        let input = encode(&[
            Request::Write {
                address: 0x0020,
                data: vec![1].into_boxed_slice(),
            },
            Request::Read {
                address: 0x0020,
                length: 2,
            },
            Request::Read {
                address: 0x0021,
                length: 1,
            },
        ]);
        let output = run(&server, input, 3);
        assert_eq!(
            output,
            vec![0x0b, 0x00, 0x06, 0xff, 0x00, 0x00, 0x0b, 0x00, 0x05, 0xff, 0x00]
        );
    }

    #[test]
    fn incomplete_trailing_request_is_discarded() {
        let backend = Rc::new(RecordingBackend::default());
        let server = Server::new(Rc::clone(&backend), Config::default());
        let mut input = encode(&[Request::Read {
            address: 0x0001,
            length: 1,
        }]);
        input.extend_from_slice(&[0x0b, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x01]);
        let output = run(&server, input, usize::MAX);
        assert_eq!(output, vec![0x0b, 0x00, 0x05, 0x00, 0x5A]);
        assert_eq!(*backend.calls.borrow(), vec![Call::Read(0x0001, 1)]);
    }

    #[test]
    fn reset_connection_is_not_an_error() {
        struct Reset;
        impl Read for Reset {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::ConnectionReset))
            }
        }
        impl Write for Reset {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let server = Server::new(DebugBackend::new(), Config::default());
        assert!(server.handle_stream(&mut Reset).is_ok());
    }
}
