//! Listener factory and the bound listener set.
//!
//! # Responsibilities
//! - Open TCP or unix-domain listeners from configured addresses
//! - Own socket-file cleanup for unix sockets this process created
//! - Keep listeners in configured order for the serve loop
//!
//! # Design Decisions
//! - Cleanup is registered only after a successful bind, so a failed bind
//!   never removes a socket file owned by somebody else
//! - Dropping a [`ListenerSet`] closes every listener and runs its hooks

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::net::{TcpListener, UnixListener};

use crate::lifecycle::ShutdownHooks;
use crate::net::address::ListenAddress;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to a configured address.
    Bind { address: String, source: io::Error },
    /// Neither addresses nor socket activation were configured.
    NoListeners,
    /// Retrieving socket-activation descriptors failed.
    Activation(io::Error),
    /// Socket activation was requested but no descriptors were passed.
    NoActivationDescriptors,
    /// An exclusive extension provider produced no listener.
    ExclusiveUnavailable { provider: String },
    /// An extension provider failed while creating its listener.
    Extension { provider: String, reason: String },
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "failed to listen on {}: {}", address, source)
            }
            ListenerError::NoListeners => write!(f, "no web listen address or systemd socket flag specified"),
            ListenerError::Activation(e) => {
                write!(f, "failed to retrieve socket activation descriptors: {}", e)
            }
            ListenerError::NoActivationDescriptors => {
                write!(f, "no socket activation file descriptors found")
            }
            ListenerError::ExclusiveUnavailable { provider } => {
                write!(f, "could not create {} listener in exclusive mode", provider)
            }
            ListenerError::Extension { provider, reason } => {
                write!(f, "{} listener failed: {}", provider, reason)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Activation(e) => Some(e),
            _ => None,
        }
    }
}

/// A live listening socket.
#[derive(Debug)]
pub enum BoundListener {
    Tcp(TcpListener),
    Unix {
        listener: UnixListener,
        /// Socket file this process created and must remove.
        /// `None` for inherited sockets.
        owned_path: Option<PathBuf>,
    },
}

impl BoundListener {
    /// Wrap a unix listener whose socket file this process created.
    pub fn owned_unix(listener: UnixListener, path: impl Into<PathBuf>) -> Self {
        BoundListener::Unix {
            listener,
            owned_path: Some(path.into()),
        }
    }

    /// Human-readable local address for logs.
    pub fn describe(&self) -> String {
        match self {
            BoundListener::Tcp(l) => match l.local_addr() {
                Ok(addr) => format!("tcp://{}", addr),
                Err(_) => "tcp://<unknown>".to_string(),
            },
            BoundListener::Unix { listener, .. } => match listener.local_addr() {
                Ok(addr) => match addr.as_pathname() {
                    Some(path) => format!("unix://{}", path.display()),
                    None => "unix://<unnamed>".to_string(),
                },
                Err(_) => "unix://<unknown>".to_string(),
            },
        }
    }

    /// Local TCP address, if this is a TCP listener.
    pub fn tcp_addr(&self) -> Option<std::net::SocketAddr> {
        match self {
            BoundListener::Tcp(l) => l.local_addr().ok(),
            BoundListener::Unix { .. } => None,
        }
    }
}

/// Open a listener for a configured address.
pub async fn open_listener(address: &str) -> Result<BoundListener, ListenerError> {
    let bind_err = |source| ListenerError::Bind {
        address: address.to_string(),
        source,
    };

    let parsed = ListenAddress::parse(address);
    tracing::debug!(address = %parsed, "Opening listener");

    match parsed {
        ListenAddress::Tcp(addr) => {
            let listener = TcpListener::bind(addr.as_str()).await.map_err(bind_err)?;
            Ok(BoundListener::Tcp(listener))
        }
        ListenAddress::Unix(path) => {
            let listener = UnixListener::bind(&path).map_err(bind_err)?;
            Ok(BoundListener::owned_unix(listener, path))
        }
    }
}

/// Remove a unix socket file, tolerating a file that is already gone.
pub fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed unix socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Could not remove unix socket"
        ),
    }
}

/// The ordered set of listeners handed to the serve loop.
///
/// Holds the cleanup hooks for every socket file it owns.
#[derive(Debug, Default)]
pub struct ListenerSet {
    listeners: Vec<BoundListener>,
    hooks: ShutdownHooks,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener, registering socket-file removal when owned.
    pub fn push(&mut self, listener: BoundListener) {
        if let BoundListener::Unix {
            owned_path: Some(path),
            ..
        } = &listener
        {
            let path = path.clone();
            self.hooks
                .register(format!("remove {}", path.display()), move || {
                    remove_socket_file(&path)
                });
        }
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundListener> {
        self.listeners.iter()
    }

    /// TCP addresses of the set, in order.
    pub fn tcp_addrs(&self) -> Vec<std::net::SocketAddr> {
        self.listeners.iter().filter_map(BoundListener::tcp_addr).collect()
    }

    /// Split into listeners and the hooks that must outlive them.
    pub fn into_parts(self) -> (Vec<BoundListener>, ShutdownHooks) {
        let ListenerSet { listeners, hooks } = self;
        (listeners, hooks)
    }
}

impl From<BoundListener> for ListenerSet {
    fn from(listener: BoundListener) -> Self {
        let mut set = ListenerSet::new();
        set.push(listener);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_tcp_listener_on_ephemeral_port() {
        let listener = open_listener("127.0.0.1:0").await.unwrap();
        let addr = listener.tcp_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(listener.describe().starts_with("tcp://127.0.0.1:"));
    }

    #[tokio::test]
    async fn bind_failure_names_the_address() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = open_listener(&address).await.unwrap_err();
        match err {
            ListenerError::Bind { address: a, .. } => assert_eq!(a, address),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dropping_set_removes_owned_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.sock");
        let address = path.to_str().unwrap().to_string();

        let mut set = ListenerSet::new();
        set.push(open_listener(&address).await.unwrap());
        assert!(path.exists());

        drop(set);
        assert!(!path.exists());
    }

    #[test]
    fn removing_missing_socket_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        remove_socket_file(&dir.path().join("gone.sock"));
    }
}
