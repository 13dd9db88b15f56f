//! Public facade wiring whitelist, prober, cache, selector and
//! dispatcher into one entry point.

use crate::{
    cache::{KvStore, MemoryStore, SelectionCache, SledStore},
    config::AppConfig,
    dispatch::Dispatcher,
    errors::{GatewayError, StoreError},
    probe::Prober,
    rpc_http::RpcHttpClient,
    selector::Selector,
    types::ChainId,
    whitelist::{Whitelist, WhitelistData, WhitelistError},
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Failure to assemble a gateway from its configuration.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Whitelist(#[from] WhitelistError),

    #[error("cache store initialization failed: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client initialization failed: {0}")]
    Http(String),
}

/// The RPC selection gateway.
///
/// One instance serves every chain in its whitelist; it is cheap to share
/// behind an `Arc` and all operations take `&self`.
pub struct RpcGateway {
    selector: Arc<Selector>,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway").finish_non_exhaustive()
    }
}

impl RpcGateway {
    /// Builds a gateway straight from configuration, resolving the
    /// whitelist and cache store per [`RpcGatewayBuilder`] rules.
    ///
    /// # Errors
    ///
    /// See [`BuildError`].
    pub fn from_config(config: AppConfig) -> Result<Self, BuildError> {
        RpcGatewayBuilder::new(config).build()
    }

    /// Dispatches one JSON-RPC call for a chain, returning the upstream
    /// `result` value verbatim.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoEndpoints`] when the chain has no usable
    /// endpoints; [`GatewayError::AllEndpointsFailed`] when every ranked
    /// endpoint was tried and failed.
    pub async fn send(
        &self,
        chain_id: ChainId,
        method: &str,
        params: &Value,
    ) -> Result<Value, GatewayError> {
        self.dispatcher.send(chain_id, method, params).await
    }

    /// Current ordered endpoint list for a chain, probing if needed.
    pub async fn ranked_list(&self, chain_id: ChainId) -> Vec<String> {
        self.selector.ranked_list(chain_id).await
    }

    /// Chains known to the whitelist.
    #[must_use]
    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.selector.whitelist().chain_ids()
    }

    /// Whether the selection cache is operating in disabled mode.
    #[must_use]
    pub fn cache_disabled(&self) -> bool {
        self.selector.cache().is_disabled()
    }
}

/// Assembles an [`RpcGateway`], with injection points for hosts and tests.
///
/// Resolution order for the whitelist: an injected [`Whitelist`], then
/// the inline `gateway.rpcs` table, then the `whitelist_path` document.
/// For the store: an injected [`KvStore`], then sled under
/// `server.cache_dir`, then process memory.
pub struct RpcGatewayBuilder {
    config: AppConfig,
    store: Option<Arc<dyn KvStore>>,
    whitelist: Option<Whitelist>,
}

impl RpcGatewayBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config, store: None, whitelist: None }
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    /// # Errors
    ///
    /// See [`BuildError`].
    pub fn build(self) -> Result<RpcGateway, BuildError> {
        let Self { config, store, whitelist } = self;
        config.validate().map_err(BuildError::Config)?;

        let whitelist = match (whitelist, &config.gateway.rpcs) {
            (Some(provided), _) => provided,
            (None, Some(inline)) => {
                Whitelist::from_rpc_data(WhitelistData { rpcs: inline.clone() })
            }
            (None, None) => Whitelist::from_file(&config.gateway.whitelist_path)?,
        };

        let store: Arc<dyn KvStore> = match (store, &config.server.cache_dir) {
            (Some(provided), _) => provided,
            (None, Some(dir)) => Arc::new(SledStore::open(dir)?),
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let disabled = config.cache_disabled();
        let cache = Arc::new(SelectionCache::new(
            store,
            config.gateway.cache_key.clone(),
            config.cache_ttl(),
            disabled,
        ));

        let http = RpcHttpClient::new().map_err(|e| BuildError::Http(e.to_string()))?;
        let prober = Prober::new(http.clone(), config.probe_timeout());
        let selector = Arc::new(Selector::new(Arc::new(whitelist), prober, cache));
        let dispatcher =
            Dispatcher::new(Arc::clone(&selector), http, config.request_timeout());

        info!(
            chains = selector.whitelist().chain_ids().len(),
            cache_disabled = disabled,
            "gateway assembled"
        );
        Ok(RpcGateway { selector, dispatcher })
    }
}
