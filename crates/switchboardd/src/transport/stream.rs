//! Accepted connections and the handler that serves them.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

trait Duplex: Read + Write + Send {}

impl<T: Read + Write + Send> Duplex for T {}

/// A client connection, independent of the socket family it arrived on.
pub(crate) struct ConnectionStream {
    peer: String,
    io: Box<dyn Duplex>,
}

impl ConnectionStream {
    /// Remote end of the connection, for logs.
    pub(crate) fn peer(&self) -> &str {
        &self.peer
    }
}

impl fmt::Debug for ConnectionStream {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionStream")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl From<TcpStream> for ConnectionStream {
    fn from(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "tcp:unknown".to_owned(), |addr| format!("tcp:{addr}"));
        Self {
            peer,
            io: Box::new(stream),
        }
    }
}

#[cfg(unix)]
impl From<UnixStream> for ConnectionStream {
    fn from(stream: UnixStream) -> Self {
        // Unix clients connect from unnamed sockets.
        Self {
            peer: "unix".to_owned(),
            io: Box::new(stream),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.io.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.io.flush()
    }
}

/// Serves one accepted connection to completion on a worker thread.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    fn serve(&self, connection: ConnectionStream);
}
