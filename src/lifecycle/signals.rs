//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers before any accept loop starts
//! - Resolve to the signal that arrived first
//!
//! Once registered, tokio keeps the handlers installed for the rest of the
//! process, so the default "terminate immediately" action no longer applies
//! and the serve loop gets to run its cleanup hooks.

use std::fmt;
use tokio::signal::unix::{signal, Signal, SignalKind};

/// A termination request delivered by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Installed SIGINT/SIGTERM listeners.
pub struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl TerminationSignals {
    /// Install the handlers. Fails only if the runtime cannot register them.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination signal.
    pub async fn recv(&mut self) -> TerminationSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
        }
    }
}
