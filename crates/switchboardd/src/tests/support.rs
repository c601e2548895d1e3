//! Test harness utilities shared by the daemon suites.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use ortho_config::OrthoError;
use tempfile::TempDir;

use switchboard::ServiceRegistry;
use switchboard_config::{Config, SocketEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;

/// Loader that provisions a fresh socket for each test.
pub struct TestConfigLoader {
    socket: SocketEndpoint,
    _socket_dir: Option<TempDir>,
}

impl TestConfigLoader {
    /// Unix socket under a temporary directory.
    #[cfg(unix)]
    #[must_use]
    pub fn unix() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        let path = dir.path().join("run").join("switchboardd.sock");
        let path = path
            .to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned();
        Self {
            socket: SocketEndpoint::unix(path),
            _socket_dir: Some(dir),
        }
    }

    /// Loopback TCP socket on an OS-assigned port.
    #[must_use]
    pub fn tcp() -> Self {
        Self {
            socket: SocketEndpoint::tcp("127.0.0.1", 0),
            _socket_dir: None,
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: self.socket.clone(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unusable socket address.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("switchboardd"),
            OsString::from("--listen-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Endpoint announced by the most recent `listener_ready` event.
    pub fn ready_endpoint(&self) -> Option<SocketEndpoint> {
        self.events().into_iter().rev().find_map(|event| match event {
            HealthEvent::ListenerReady(endpoint) => Some(endpoint),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, registry: &ServiceRegistry) {
        let services = registry
            .service_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        self.record(HealthEvent::BootstrapSucceeded(services));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady(endpoint.clone()));
    }

    fn shutdown_started(&self) {
        self.record(HealthEvent::ShutdownStarted);
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed with the listed services.
    BootstrapSucceeded(Vec<String>),
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The listener is accepting connections.
    ListenerReady(SocketEndpoint),
    /// Shutdown began.
    ShutdownStarted,
}

/// Sends one request line to `endpoint` and returns the response line.
pub fn call(endpoint: &SocketEndpoint, request: &str) -> String {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            exchange(TcpStream::connect((host.as_str(), *port)).expect("connect over tcp"), request)
        }
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => exchange(
            std::os::unix::net::UnixStream::connect(path.as_std_path())
                .expect("connect over unix socket"),
            request,
        ),
        #[cfg(not(unix))]
        SocketEndpoint::Unix { .. } => panic!("unix sockets are unavailable here"),
    }
}

fn exchange<S: std::io::Read + Write>(mut stream: S, request: &str) -> String {
    stream
        .write_all(request.as_bytes())
        .expect("write request");
    stream.write_all(b"\n").expect("write newline");
    stream.flush().expect("flush request");
    let mut line = String::new();
    BufReader::new(stream)
        .read_line(&mut line)
        .expect("read response");
    line.trim_end().to_owned()
}

/// Builds a request line for `/HPC/{service}/{method}` carrying `body`.
pub fn invoke_line(service: &str, method: &str, body: &str) -> String {
    format!(r#"{{"path":"/HPC/{service}/{method}","body":{body}}}"#)
}
