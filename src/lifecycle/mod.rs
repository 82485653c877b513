//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (helper.rs):
//!     Parse flags → Validate → Register collectors → Select listeners
//!
//! Shutdown (shutdown.rs):
//!     Trigger / signal / listener error → Stop accept loops → Run hooks
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop serving, clean up, exit non-zero
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then handler, then listeners
//! - Cleanup hooks belong to the listener set and run exactly once

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownHooks};
pub use signals::{TerminationSignal, TerminationSignals};
