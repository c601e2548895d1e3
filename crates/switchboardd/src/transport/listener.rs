//! Blocking accept loop for the daemon socket.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use switchboard_config::SocketEndpoint;

use super::drain::ConnectionTracker;
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::{Path, PathBuf};

const ERROR_BACKOFF: Duration = Duration::from_millis(100);
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// A bound endpoint that has not started accepting yet.
#[derive(Debug)]
pub(crate) struct SocketListener {
    socket: BoundSocket,
    endpoint: SocketEndpoint,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl BoundSocket {
    fn accept(&self) -> io::Result<ConnectionStream> {
        match self {
            Self::Tcp(listener) => listener.accept().map(|(stream, _)| stream.into()),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().map(|(stream, _)| stream.into()),
        }
    }

    /// Where to connect to unblock a pending `accept`.
    fn wake_target(&self) -> io::Result<WakeTarget> {
        match self {
            Self::Tcp(listener) => listener
                .local_addr()
                .map(|addr| WakeTarget::Tcp(loopback(addr))),
            #[cfg(unix)]
            Self::Unix(listener) => listener.local_addr().and_then(|addr| {
                addr.as_pathname()
                    .map(|path| WakeTarget::Unix(path.to_path_buf()))
                    .ok_or_else(|| io::Error::other("unix listener has no path"))
            }),
        }
    }
}

impl SocketListener {
    /// Binds `endpoint`, resolving a TCP port of `0` to the assigned port.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            endpoint: endpoint.to_string(),
            source,
        };
        match endpoint {
            SocketEndpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port)).map_err(bind_error)?;
                let addr = listener.local_addr().map_err(bind_error)?;
                Ok(Self {
                    socket: BoundSocket::Tcp(listener),
                    endpoint: SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
                })
            }
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => {
                claim_unix_path(path.as_std_path())?;
                let listener = UnixListener::bind(path.as_std_path()).map_err(bind_error)?;
                Ok(Self {
                    socket: BoundSocket::Unix(listener),
                    endpoint: endpoint.clone(),
                })
            }
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => Err(ListenerError::UnsupportedUnix {
                endpoint: endpoint.to_string(),
            }),
        }
    }

    /// Endpoint being served.
    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Starts accepting on a dedicated thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let wake = self
            .socket
            .wake_target()
            .map_err(|source| ListenerError::Bind {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        let stopping = Arc::new(AtomicBool::new(false));
        let tracker = ConnectionTracker::default();
        let endpoint = self.endpoint.clone();
        let accept_loop = AcceptLoop {
            listener: self,
            stopping: Arc::clone(&stopping),
            tracker: tracker.clone(),
            handler,
        };
        let thread = thread::Builder::new()
            .name("switchboardd-accept".to_owned())
            .spawn(move || accept_loop.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            endpoint,
            wake,
            stopping,
            tracker,
            thread: Some(thread),
        })
    }
}

/// Controls a running listener.
///
/// Dropping the handle asks the accept loop to stop without waiting for it.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    endpoint: SocketEndpoint,
    wake: WakeTarget,
    stopping: Arc<AtomicBool>,
    tracker: ConnectionTracker,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Endpoint being served.
    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Stops accepting, then waits up to `drain` for live connections.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept loop panicked and
    /// [`ListenerError::DrainTimeout`] if connections outlive `drain`.
    pub(crate) fn stop(mut self, drain: Duration) -> Result<(), ListenerError> {
        self.request_stop();
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| ListenerError::ThreadPanic)?;
        }
        self.tracker.wait_idle(drain).map_err(|active| {
            warn!(
                target: LISTENER_TARGET,
                active,
                endpoint = %self.endpoint,
                "connections outlived the drain period"
            );
            ListenerError::DrainTimeout {
                active,
                timeout: drain,
            }
        })
    }

    fn request_stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = self.wake.connect() {
            debug!(target: LISTENER_TARGET, %error, "could not wake accept loop");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.request_stop();
        }
    }
}

#[derive(Debug)]
enum WakeTarget {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl WakeTarget {
    fn connect(&self) -> io::Result<()> {
        match self {
            Self::Tcp(addr) => TcpStream::connect_timeout(addr, WAKE_TIMEOUT).map(drop),
            #[cfg(unix)]
            Self::Unix(path) => UnixStream::connect(path).map(drop),
        }
    }
}

/// Wildcard binds are reached through the matching loopback address.
fn loopback(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

struct AcceptLoop {
    listener: SocketListener,
    stopping: Arc<AtomicBool>,
    tracker: ConnectionTracker,
    handler: Arc<dyn ConnectionHandler>,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        loop {
            let accepted = self.listener.socket.accept();
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            match accepted {
                Ok(connection) => {
                    last_error = None;
                    self.serve(connection);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    if last_error != Some(error.kind()) {
                        warn!(target: LISTENER_TARGET, %error, "accept failed");
                    }
                    last_error = Some(error.kind());
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        debug!(target: LISTENER_TARGET, "socket listener stopped");
    }

    fn serve(&self, connection: ConnectionStream) {
        let handler = Arc::clone(&self.handler);
        let active = self.tracker.enter();
        let peer = connection.peer().to_owned();
        let spawned = thread::Builder::new()
            .name("switchboardd-conn".to_owned())
            .spawn(move || {
                let _active = active;
                handler.serve(connection);
            });
        if let Err(error) = spawned {
            warn!(target: LISTENER_TARGET, %error, %peer, "dropped connection");
        }
    }
}

impl Drop for AcceptLoop {
    fn drop(&mut self) {
        #[cfg(unix)]
        remove_socket_file(&self.listener.endpoint);
    }
}

#[cfg(unix)]
fn remove_socket_file(endpoint: &SocketEndpoint) {
    if let Some(path) = endpoint.unix_path()
        && let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            %error,
            %path,
            "failed to remove unix socket file"
        );
    }
}

/// Clears a leftover socket file, refusing live sockets and other files.
#[cfg(unix)]
fn claim_unix_path(path: &Path) -> Result<(), ListenerError> {
    let stale = |source| ListenerError::UnixStale {
        path: path.display().to_string(),
        source,
    };
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(stale(error)),
    };
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::UnixNotSocket {
            path: path.display().to_string(),
        });
    }
    if UnixStream::connect(path).is_ok() {
        return Err(ListenerError::UnixInUse {
            path: path.display().to_string(),
        });
    }
    fs::remove_file(path).map_err(stale)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::Mutex;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Instant;

    use rstest::rstest;

    use super::*;

    /// Answers each connection with one byte, then reports it.
    struct Acknowledge(Mutex<Sender<String>>);

    impl ConnectionHandler for Acknowledge {
        fn serve(&self, mut connection: ConnectionStream) {
            let _ = connection.write_all(b"!");
            let sender = self.0.lock().expect("sender lock");
            let _ = sender.send(connection.peer().to_owned());
        }
    }

    fn acknowledging() -> (Arc<Acknowledge>, Receiver<String>) {
        let (sender, receiver) = mpsc::channel();
        (Arc::new(Acknowledge(Mutex::new(sender))), receiver)
    }

    /// Holds every connection open until the test lets go.
    struct Stall(Mutex<Receiver<()>>);

    impl ConnectionHandler for Stall {
        fn serve(&self, _connection: ConnectionStream) {
            let _ = self.0.lock().expect("release lock").recv();
        }
    }

    fn read_ack(mut stream: impl Read) -> u8 {
        let mut byte = [0_u8; 1];
        stream.read_exact(&mut byte).expect("acknowledgement");
        byte[0]
    }

    fn tcp_address(endpoint: &SocketEndpoint) -> (String, u16) {
        match endpoint {
            SocketEndpoint::Tcp { host, port } => (host.clone(), *port),
            SocketEndpoint::Unix { .. } => panic!("expected tcp endpoint"),
        }
    }

    #[rstest]
    fn tcp_connections_are_served() {
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind tcp listener");
        let address = tcp_address(listener.endpoint());
        let (handler, served) = acknowledging();
        let handle = listener.start(handler).expect("start listener");

        for _ in 0..2 {
            let client = TcpStream::connect(address.clone()).expect("connect");
            assert_eq!(read_ack(client), b'!');
            let peer = served
                .recv_timeout(Duration::from_secs(2))
                .expect("connection served");
            assert!(peer.starts_with("tcp:127.0.0.1:"), "{peer}");
        }

        handle.stop(Duration::from_secs(1)).expect("stop listener");
    }

    #[rstest]
    fn port_zero_resolves_to_the_assigned_port() {
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let (host, port) = tcp_address(listener.endpoint());
        assert_eq!(host, "127.0.0.1");
        assert_ne!(port, 0);
    }

    #[rstest]
    fn wildcard_binds_wake_through_loopback() {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7000));
        assert_eq!(loopback(addr), SocketAddr::from((Ipv4Addr::LOCALHOST, 7000)));
        let addr = SocketAddr::from((Ipv4Addr::new(10, 0, 0, 1), 7000));
        assert_eq!(loopback(addr), addr);
    }

    #[rstest]
    fn idle_listener_stops_promptly() {
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let address = tcp_address(listener.endpoint());
        let (handler, _served) = acknowledging();
        let handle = listener.start(handler).expect("start listener");

        let started = Instant::now();
        handle.stop(Duration::from_secs(1)).expect("stop listener");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(TcpStream::connect(address).is_err(), "socket should be closed");
    }

    #[rstest]
    fn stop_waits_for_live_connections_then_gives_up() {
        let (release, held) = mpsc::channel::<()>();
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let address = tcp_address(listener.endpoint());
        let handle = listener
            .start(Arc::new(Stall(Mutex::new(held))))
            .expect("start listener");

        let _client = TcpStream::connect(address).expect("connect");
        // Give the accept loop time to hand the connection to a worker.
        thread::sleep(Duration::from_millis(100));

        let error = handle
            .stop(Duration::from_millis(50))
            .expect_err("connection still open");
        assert!(matches!(error, ListenerError::DrainTimeout { active: 1, .. }));
        drop(release);
    }

    #[rstest]
    fn stop_returns_once_connections_finish() {
        let (release, held) = mpsc::channel::<()>();
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let address = tcp_address(listener.endpoint());
        let handle = listener
            .start(Arc::new(Stall(Mutex::new(held))))
            .expect("start listener");

        let _client = TcpStream::connect(address).expect("connect");
        thread::sleep(Duration::from_millis(100));
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let _ = release.send(());
        });

        handle.stop(Duration::from_secs(5)).expect("drained");
        releaser.join().expect("releaser join");
    }

    #[cfg(unix)]
    fn unix_endpoint(path: &Path) -> SocketEndpoint {
        SocketEndpoint::unix(path.to_str().expect("utf8 path").to_owned())
    }

    #[cfg(unix)]
    #[rstest]
    fn stale_unix_sockets_are_replaced_and_removed_on_stop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("switchboardd.sock");
        drop(UnixListener::bind(&path).expect("bind stale listener"));
        assert!(path.exists(), "stale socket should remain");

        let listener = SocketListener::bind(&unix_endpoint(&path)).expect("bind over stale socket");
        let (handler, served) = acknowledging();
        let handle = listener.start(handler).expect("start listener");

        assert_eq!(read_ack(UnixStream::connect(&path).expect("connect")), b'!');
        assert_eq!(
            served.recv_timeout(Duration::from_secs(2)).expect("served"),
            "unix"
        );

        handle.stop(Duration::from_secs(1)).expect("stop listener");
        assert!(!path.exists(), "socket file should be removed on stop");
    }

    #[cfg(unix)]
    #[rstest]
    fn live_unix_sockets_are_not_taken_over() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("switchboardd.sock");
        let _existing = UnixListener::bind(&path).expect("bind existing listener");

        let error = SocketListener::bind(&unix_endpoint(&path)).expect_err("bind must fail");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }

    #[cfg(unix)]
    #[rstest]
    fn regular_files_are_not_replaced() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("not-a-socket");
        fs::write(&path, b"data").expect("write file");

        let error = SocketListener::bind(&unix_endpoint(&path)).expect_err("bind must fail");
        assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
        assert!(path.exists());
    }
}
