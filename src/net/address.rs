//! Listen address classification.
//!
//! An address names a unix-domain socket if and only if it is an absolute
//! path ending in one of [`UNIX_SOCKET_SUFFIXES`]. Everything else is handed
//! to the TCP resolver as `host:port`.

use std::fmt;
use std::path::PathBuf;

/// File suffixes that mark an absolute path as a unix socket.
pub const UNIX_SOCKET_SUFFIXES: &[&str] = &[".sock", ".socket"];

/// A classified listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddress {
    /// `host:port`, with an empty host already expanded to all interfaces.
    Tcp(String),
    /// Filesystem path of a unix-domain socket.
    Unix(PathBuf),
}

impl ListenAddress {
    /// Classify a configured address string.
    pub fn parse(address: &str) -> Self {
        if is_unix_socket_path(address) {
            return ListenAddress::Unix(PathBuf::from(address));
        }

        // `:9633` listens on every interface, like the Go and C resolvers.
        if address.starts_with(':') {
            return ListenAddress::Tcp(format!("0.0.0.0{}", address));
        }

        ListenAddress::Tcp(address.to_string())
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddress::Tcp(addr) => write!(f, "tcp://{}", addr),
            ListenAddress::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Returns true when `address` should be bound as a unix socket.
pub fn is_unix_socket_path(address: &str) -> bool {
    address.starts_with('/')
        && UNIX_SOCKET_SUFFIXES
            .iter()
            .any(|suffix| address.ends_with(suffix))
}
