//! systemd socket activation.
//!
//! The service manager passes listening sockets starting at descriptor 3 and
//! describes them through `LISTEN_PID` and `LISTEN_FDS`. Descriptors meant for
//! another process (pid mismatch) are ignored. The variables are removed after
//! a successful hand-over so child processes do not inherit them.

use std::io;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use socket2::{Domain, Socket, Type};
use tokio::net::{TcpListener, UnixListener};

use crate::net::listener::{BoundListener, ListenerError};

/// First inherited descriptor, per `sd_listen_fds(3)`.
pub const LISTEN_FDS_START: RawFd = 3;

const LISTEN_PID: &str = "LISTEN_PID";
const LISTEN_FDS: &str = "LISTEN_FDS";
const LISTEN_FDNAMES: &str = "LISTEN_FDNAMES";

/// Socket-activation environment as seen by this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationEnv {
    pub pid: Option<String>,
    pub fds: Option<String>,
}

impl ActivationEnv {
    pub fn from_process() -> Self {
        Self {
            pid: std::env::var(LISTEN_PID).ok(),
            fds: std::env::var(LISTEN_FDS).ok(),
        }
    }

    /// Number of descriptors addressed to `current_pid`.
    ///
    /// Missing variables or a pid for another process mean zero descriptors.
    /// Malformed values, negative counts and counts that run past the
    /// descriptor range are an error.
    pub fn descriptor_count(&self, current_pid: u32) -> io::Result<RawFd> {
        let (Some(pid), Some(fds)) = (self.pid.as_deref(), self.fds.as_deref()) else {
            return Ok(0);
        };

        let pid: u32 = pid.trim().parse().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("invalid {}: {}", LISTEN_PID, e))
        })?;
        if pid != current_pid {
            tracing::debug!(listen_pid = pid, current_pid, "Socket activation addressed to another process");
            return Ok(0);
        }

        let invalid = |reason: String| {
            io::Error::new(io::ErrorKind::InvalidData, format!("invalid {}: {}", LISTEN_FDS, reason))
        };
        let count: RawFd = fds.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
        if count < 0 {
            return Err(invalid(format!("negative count {}", count)));
        }
        if LISTEN_FDS_START.checked_add(count).is_none() {
            return Err(invalid(format!("count {} exceeds the descriptor range", count)));
        }
        Ok(count)
    }
}

/// Take ownership of the listeners passed by the service manager.
pub fn listeners() -> Result<Vec<BoundListener>, ListenerError> {
    let env = ActivationEnv::from_process();
    let count = env
        .descriptor_count(std::process::id())
        .map_err(ListenerError::Activation)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut listeners = Vec::new();
    for fd in LISTEN_FDS_START..LISTEN_FDS_START + count {
        // SAFETY: the service manager hands descriptors 3..3+LISTEN_FDS to
        // this pid; nothing else in the process claims them.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        listeners.push(adopt(owned).map_err(ListenerError::Activation)?);
    }

    std::env::remove_var(LISTEN_PID);
    std::env::remove_var(LISTEN_FDS);
    std::env::remove_var(LISTEN_FDNAMES);

    tracing::debug!(count = listeners.len(), "Adopted socket activation descriptors");
    Ok(listeners)
}

/// Turn an inherited descriptor into a tokio listener.
fn adopt(fd: OwnedFd) -> io::Result<BoundListener> {
    let socket = Socket::from(fd);
    socket.set_cloexec(true)?;
    socket.set_nonblocking(true)?;

    if socket.r#type()? != Type::STREAM {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "inherited descriptor is not a stream socket",
        ));
    }

    let local = socket.local_addr()?;
    if local.as_socket().is_some() {
        let std_listener: std::net::TcpListener = socket.into();
        return Ok(BoundListener::Tcp(TcpListener::from_std(std_listener)?));
    }
    if local.domain() == Domain::UNIX {
        let std_listener: std::os::unix::net::UnixListener = socket.into();
        // The service manager owns the socket file.
        return Ok(BoundListener::Unix {
            listener: UnixListener::from_std(std_listener)?,
            owned_path: None,
        });
    }

    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "inherited descriptor has an unsupported address family",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pid: Option<&str>, fds: Option<&str>) -> ActivationEnv {
        ActivationEnv {
            pid: pid.map(String::from),
            fds: fds.map(String::from),
        }
    }

    #[test]
    fn missing_variables_mean_no_descriptors() {
        assert_eq!(env(None, None).descriptor_count(42).unwrap(), 0);
        assert_eq!(env(Some("42"), None).descriptor_count(42).unwrap(), 0);
    }

    #[test]
    fn descriptors_for_other_pid_are_ignored() {
        assert_eq!(env(Some("41"), Some("2")).descriptor_count(42).unwrap(), 0);
    }

    #[test]
    fn descriptors_for_this_pid_are_counted() {
        assert_eq!(env(Some("42"), Some("2")).descriptor_count(42).unwrap(), 2);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = env(Some("abc"), Some("1")).descriptor_count(42).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = env(Some("42"), Some("many")).descriptor_count(42).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn out_of_range_counts_are_errors() {
        for fds in ["18446744073709551615", "2147483647", "-1"] {
            let err = env(Some("42"), Some(fds)).descriptor_count(42).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{fds}");
        }
    }

    #[tokio::test]
    async fn adopts_tcp_listener_descriptor() {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        let fd: OwnedFd = std_listener.into();

        let adopted = adopt(fd).unwrap();
        assert_eq!(adopted.tcp_addr(), Some(addr));
    }

    #[tokio::test]
    async fn inherited_unix_socket_is_not_owned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activated.sock");
        let std_listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        let fd: OwnedFd = std_listener.into();

        match adopt(fd).unwrap() {
            BoundListener::Unix { owned_path, .. } => assert!(owned_path.is_none()),
            other => panic!("expected unix listener, got {other:?}"),
        }
    }
}
