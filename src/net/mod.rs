//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig + extension providers
//!     → selection.rs (priority order, fail fast)
//!         → provider.rs / overlay.rs (extension listeners)
//!         → activation.rs (inherited systemd sockets)
//!         → listener.rs (TCP / unix factory, address.rs classifies)
//!     → ListenerSet (ordered listeners + socket cleanup hooks)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Listeners open sequentially so error priority follows configuration order
//! - A failed startup never leaves a listener open or a socket file behind

pub mod activation;
pub mod address;
pub mod listener;
pub mod overlay;
pub mod provider;
pub mod selection;

pub use address::ListenAddress;
pub use listener::{open_listener, BoundListener, ListenerError, ListenerSet};
pub use overlay::{OverlayNetwork, OverlayProvider, TunnelNetwork};
pub use provider::ListenerProvider;
pub use selection::select_listeners;
