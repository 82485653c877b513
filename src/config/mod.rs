//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → args.rs (clap flags, exporter-specific defaults)
//!     → HelperConfig (immutable, passed by value)
//!     → validation.rs (semantic checks)
//!     → listener selection / router / logging
//! ```
//!
//! # Design Decisions
//! - Config is immutable once parsed; no process-wide flag state
//! - All fields have defaults so embedders can build configs in code

pub mod args;
pub mod schema;
pub mod validation;

pub use args::HelperArgs;
pub use schema::{
    HelperConfig, ListenerConfig, LogConfig, LogFormat, LogLevel, OverlayConfig, WebConfig,
    DEFAULT_LISTEN_ADDRESS,
};
pub use validation::{validate_config, ValidationError};
