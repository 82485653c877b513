//! Pluggable extension listener providers.

use async_trait::async_trait;

use crate::net::listener::{BoundListener, ListenerError};

/// A source of listeners on a non-standard transport (e.g. an overlay network).
///
/// A provider's flags are a `clap::Args` struct parsed next to the helper's
/// (see [`ExporterHelper::try_parse_with`](crate::ExporterHelper::try_parse_with));
/// the provider is built from them and registered with
/// [`ExporterHelper::with_provider`](crate::ExporterHelper::with_provider).
#[async_trait]
pub trait ListenerProvider: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this provider must be the sole listener when selected.
    fn is_only_listener(&self) -> bool;

    /// Try to produce a listener.
    ///
    /// `Ok(None)` means the transport is unavailable, which is not an error
    /// unless the provider is exclusive. `Err` is always fatal.
    async fn create_listener(&self) -> Result<Option<BoundListener>, ListenerError>;
}
