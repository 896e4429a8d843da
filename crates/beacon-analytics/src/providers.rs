//! Custom data providers for measurement-protocol hits.
//!
//! Providers are registered by name in a [`ProviderRegistry`]; settings list
//! the names to apply. The list is resolved once and then shared by every
//! request for the lifetime of the tracker.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use beacon_core::{TrackingError, TrackingResult};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::TrackingRequest;

pub const CLIENT_IP_PROVIDER: &str = "client_ip";
pub const USER_AGENT_PROVIDER: &str = "user_agent";

/// Extra key/value pairs merged into a measurement-protocol payload
pub trait CustomDataProvider: Send + Sync {
    fn provide(&self, request: &TrackingRequest) -> BTreeMap<String, String>;
}

impl<F> CustomDataProvider for F
where
    F: Fn(&TrackingRequest) -> BTreeMap<String, String> + Send + Sync,
{
    fn provide(&self, request: &TrackingRequest) -> BTreeMap<String, String> {
        self(request)
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CustomDataProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `client_ip` (`uip`) and `user_agent` (`ua`) overrides
    pub fn with_builtins() -> Self {
        Self::new()
            .with(CLIENT_IP_PROVIDER, |request: &TrackingRequest| {
                request
                    .remote_addr
                    .map(|ip| BTreeMap::from([("uip".to_string(), ip.to_string())]))
                    .unwrap_or_default()
            })
            .with(USER_AGENT_PROVIDER, |request: &TrackingRequest| {
                request
                    .user_agent()
                    .map(|ua| BTreeMap::from([("ua".to_string(), ua.to_string())]))
                    .unwrap_or_default()
            })
    }

    pub fn register(&mut self, name: impl Into<String>, provider: impl CustomDataProvider + 'static) {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    pub fn with(mut self, name: impl Into<String>, provider: impl CustomDataProvider + 'static) -> Self {
        self.register(name, provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomDataProvider>> {
        self.providers.get(name).cloned()
    }
}

/// The configured providers, resolved on first use
pub struct CustomDataProviders {
    names: Vec<String>,
    registry: ProviderRegistry,
    resolved: OnceCell<Vec<Arc<dyn CustomDataProvider>>>,
}

impl CustomDataProviders {
    pub fn new(names: Vec<String>, registry: ProviderRegistry) -> Self {
        Self {
            names,
            registry,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve every configured name, or fail on the first unknown one.
    ///
    /// Concurrent first calls may both resolve; only one list is published.
    pub fn resolve(&self) -> TrackingResult<&[Arc<dyn CustomDataProvider>]> {
        self.resolved
            .get_or_try_init(|| {
                let providers = self
                    .names
                    .iter()
                    .map(|name| {
                        self.registry.get(name).ok_or_else(|| {
                            TrackingError::ProviderResolution { name: name.clone() }
                        })
                    })
                    .collect::<TrackingResult<Vec<_>>>()?;
                info!("Resolved {} custom data providers", providers.len());
                Ok::<_, TrackingError>(providers)
            })
            .map(Vec::as_slice)
    }

    /// Merge every provider's fields into `params`, later providers winning
    pub fn apply(
        &self,
        request: &TrackingRequest,
        params: &mut BTreeMap<String, String>,
    ) -> TrackingResult<()> {
        for provider in self.resolve()? {
            let fields = provider.provide(request);
            debug!("Custom data provider added {} fields", fields.len());
            params.extend(fields);
        }
        Ok(())
    }
}
