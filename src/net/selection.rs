//! Listener selection.
//!
//! Turns a [`ListenerConfig`] plus the registered extension providers into
//! the [`ListenerSet`] the serve loop runs on. Sources are consulted in a
//! fixed priority order and the first decisive one wins:
//!
//! ```text
//! exclusive provider?  → exactly its listener, or fail
//! nothing configured?  → NoListeners
//! socket activation?   → inherited descriptors only
//! otherwise            → addresses in order, then every other provider
//! ```

use crate::config::ListenerConfig;
use crate::net::activation;
use crate::net::listener::{open_listener, ListenerError, ListenerSet};
use crate::net::provider::ListenerProvider;

/// Select and open the listeners to serve on.
///
/// Opening is sequential. On any error the partially built set is dropped,
/// which closes its listeners and removes socket files it created.
pub async fn select_listeners(
    config: &ListenerConfig,
    providers: &[&dyn ListenerProvider],
) -> Result<ListenerSet, ListenerError> {
    if let Some(provider) = providers.iter().find(|p| p.is_only_listener()) {
        tracing::info!(provider = provider.name(), "Listening on exclusive extension listener");
        return match provider.create_listener().await? {
            Some(listener) => Ok(ListenerSet::from(listener)),
            None => Err(ListenerError::ExclusiveUnavailable {
                provider: provider.name().to_string(),
            }),
        };
    }

    if !config.systemd_socket && config.listen_addresses.is_empty() {
        return Err(ListenerError::NoListeners);
    }

    if config.systemd_socket {
        tracing::info!("Listening on systemd activated listeners instead of port listeners");
        let inherited = activation::listeners()?;
        if inherited.is_empty() {
            return Err(ListenerError::NoActivationDescriptors);
        }
        let mut set = ListenerSet::new();
        for listener in inherited {
            set.push(listener);
        }
        return Ok(set);
    }

    let mut set = ListenerSet::new();
    for address in &config.listen_addresses {
        set.push(open_listener(address).await?);
    }

    for provider in providers {
        match provider.create_listener().await? {
            Some(listener) => set.push(listener),
            None => tracing::debug!(provider = provider.name(), "Extension listener unavailable, skipping"),
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::listener::BoundListener;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Provider that counts calls and yields a TCP listener when `available`.
    struct StubProvider {
        only: bool,
        available: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ListenerProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_only_listener(&self) -> bool {
            self.only
        }

        async fn create_listener(&self) -> Result<Option<BoundListener>, ListenerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Ok(None);
            }
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            Ok(Some(BoundListener::Tcp(listener)))
        }
    }

    fn stub(only: bool, available: bool) -> (StubProvider, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = StubProvider {
            only,
            available,
            calls: calls.clone(),
        };
        (provider, calls)
    }

    fn addresses(list: &[&str]) -> ListenerConfig {
        ListenerConfig {
            listen_addresses: list.iter().map(|s| s.to_string()).collect(),
            systemd_socket: false,
        }
    }

    #[tokio::test]
    async fn unavailable_exclusive_provider_is_fatal() {
        let (exclusive, exclusive_calls) = stub(true, false);
        let (other, other_calls) = stub(false, true);

        let err = select_listeners(&addresses(&["127.0.0.1:0"]), &[&exclusive, &other])
            .await
            .unwrap_err();

        assert!(matches!(err, ListenerError::ExclusiveUnavailable { .. }));
        assert_eq!(exclusive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exclusive_provider_is_the_only_listener() {
        let (exclusive, _) = stub(true, true);
        let (other, other_calls) = stub(false, true);

        let set = select_listeners(&addresses(&["127.0.0.1:0", "127.0.0.1:0"]), &[&other, &exclusive])
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn nothing_configured_is_no_listeners() {
        let err = select_listeners(&addresses(&[]), &[]).await.unwrap_err();
        assert!(matches!(err, ListenerError::NoListeners));
    }

    #[tokio::test]
    async fn non_exclusive_providers_do_not_count_as_configuration() {
        let (other, calls) = stub(false, true);
        let err = select_listeners(&addresses(&[]), &[&other]).await.unwrap_err();
        assert!(matches!(err, ListenerError::NoListeners));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn addresses_then_available_providers() {
        let (available, available_calls) = stub(false, true);
        let (unavailable, unavailable_calls) = stub(false, false);

        let set = select_listeners(
            &addresses(&["127.0.0.1:0", "127.0.0.1:0"]),
            &[&available, &unavailable],
        )
        .await
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(available_calls.load(Ordering::SeqCst), 1);
        assert_eq!(unavailable_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_address_skips_providers() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let taken_addr = taken.local_addr().unwrap().to_string();
        let (provider, calls) = stub(false, true);

        let err = select_listeners(&addresses(&["127.0.0.1:0", taken_addr.as_str()]), &[&provider])
            .await
            .unwrap_err();

        assert!(matches!(err, ListenerError::Bind { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
