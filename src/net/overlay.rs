//! Overlay-network listener provider.
//!
//! # Responsibilities
//! - Check that the configured identity file is usable
//! - Load the JSON identity (controller URL and key material)
//! - Bind the configured service through an [`OverlayNetwork`]
//!
//! # Design Decisions
//! - A missing identity file means "overlay unavailable", not an error
//! - A present but broken identity, or a failed service bind, is fatal
//! - The transport is a trait so embedders can plug in their own SDK; the
//!   shipped [`TunnelNetwork`] binds the service where a local tunneler
//!   delivers it

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::UnixListener;

use crate::config::OverlayConfig;
use crate::net::listener::{BoundListener, ListenerError};
use crate::net::provider::ListenerProvider;

const PROVIDER_NAME: &str = "overlay";

/// Enrolled overlay identity.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayIdentity {
    /// Controller API URL.
    #[serde(rename = "ztAPI")]
    pub controller_url: String,
    pub id: IdentityMaterial,
}

/// Key material of an identity. Values are PEM or `file://` references.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityMaterial {
    pub cert: String,
    pub key: String,
    #[serde(default)]
    pub ca: Option<String>,
}

impl OverlayIdentity {
    /// Read and parse an identity file.
    pub async fn load(path: &Path) -> Result<Self, String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("reading identity {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("parsing identity {}: {}", path.display(), e))
    }
}

/// Transport that binds an overlay service for this process.
#[async_trait]
pub trait OverlayNetwork: Send + Sync {
    async fn listen(&self, identity: &OverlayIdentity, service: &str) -> io::Result<BoundListener>;
}

/// Binds services on the socket directory of a local overlay tunneler.
///
/// The tunneler terminates the overlay connection for `service` and forwards
/// it to `<socket_dir>/<service>.sock`.
#[derive(Debug, Clone)]
pub struct TunnelNetwork {
    socket_dir: PathBuf,
}

impl TunnelNetwork {
    pub fn new(socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: socket_dir.into(),
        }
    }

    pub fn socket_path(&self, service: &str) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", service))
    }
}

#[async_trait]
impl OverlayNetwork for TunnelNetwork {
    async fn listen(&self, identity: &OverlayIdentity, service: &str) -> io::Result<BoundListener> {
        let path = self.socket_path(service);
        tracing::debug!(
            controller = %identity.controller_url,
            path = %path.display(),
            "Binding overlay service on tunneler socket"
        );
        let listener = UnixListener::bind(&path)?;
        Ok(BoundListener::owned_unix(listener, path))
    }
}

/// [`ListenerProvider`] for the overlay network.
pub struct OverlayProvider {
    config: OverlayConfig,
    network: Arc<dyn OverlayNetwork>,
}

impl OverlayProvider {
    pub fn new(config: OverlayConfig, network: Arc<dyn OverlayNetwork>) -> Self {
        Self { config, network }
    }

    /// Provider using the local tunneler configured in `config`.
    pub fn with_tunnel(config: OverlayConfig) -> Self {
        let network = Arc::new(TunnelNetwork::new(config.tunnel_dir.clone()));
        Self::new(config, network)
    }

    fn failure(&self, reason: String) -> ListenerError {
        ListenerError::Extension {
            provider: PROVIDER_NAME.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl ListenerProvider for OverlayProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_only_listener(&self) -> bool {
        self.config.only
    }

    async fn create_listener(&self) -> Result<Option<BoundListener>, ListenerError> {
        let path = &self.config.identity_file;
        match tokio::fs::metadata(path).await {
            Ok(meta) if !meta.is_dir() => {}
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Identity file likely not accessible - ignoring");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Identity file likely not accessible - ignoring");
                return Ok(None);
            }
        }

        let identity = OverlayIdentity::load(path).await.map_err(|e| self.failure(e))?;
        let service = self.config.service_name.as_str();

        let listener = self
            .network
            .listen(&identity, service)
            .await
            .map_err(|e| self.failure(format!("error binding service {}: {}", service, e)))?;

        tracing::info!(service = %service, listener = %listener.describe(), "Listening for requests");
        Ok(Some(listener))
    }
}
