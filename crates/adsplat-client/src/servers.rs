//! Cached server list, loaded through the `list` endpoint.

use std::sync::Arc;

use adsplat_shared::constants::{KEY_SERVER_DATA, KEY_SERVER_DATA_TIMESTAMP};
use adsplat_shared::{ProjectRecord, ServerRecord};
use adsplat_store::KvStore;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionGate;
use crate::single_flight::{CacheInfo, CacheSpec, Loader, SingleFlightCache};
use crate::transport::{Reply, Transport};

const LIST_ENDPOINT: &str = "list";

struct ServerListLoader {
    transport: Arc<Transport>,
}

#[async_trait]
impl Loader<ServerRecord> for ServerListLoader {
    async fn load(&self) -> Result<Vec<ServerRecord>, ClientError> {
        match self.transport.call(LIST_ENDPOINT, Map::new()).await {
            Reply::List(items) => Ok(parse_servers(items)),
            Reply::Empty { failure, .. } => Err(ClientError::NoData {
                endpoint: LIST_ENDPOINT,
                failure,
            }),
            Reply::Envelope(_) => Err(ClientError::UnexpectedShape(LIST_ENDPOINT)),
        }
    }
}

/// Keep the entries that parse as server records; drop the rest.
fn parse_servers(items: Vec<Value>) -> Vec<ServerRecord> {
    let total = items.len();
    let servers: Vec<ServerRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(error = %e, "Skipping malformed server record");
                None
            }
        })
        .collect();

    debug!(total, kept = servers.len(), "parsed server list");
    servers
}

/// Read access to the server list.
#[derive(Clone)]
pub struct ServerCache {
    cache: SingleFlightCache<ServerRecord>,
}

impl ServerCache {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KvStore>,
        session: Arc<SessionGate>,
        transport: Arc<Transport>,
    ) -> Self {
        let spec = CacheSpec {
            name: "servers",
            value_key: KEY_SERVER_DATA,
            timestamp_key: KEY_SERVER_DATA_TIMESTAMP,
            ttl: config.server_cache_ttl,
        };
        Self {
            cache: SingleFlightCache::new(
                spec,
                store,
                session,
                Arc::new(ServerListLoader { transport }),
            ),
        }
    }

    pub(crate) fn coordinator(&self) -> &SingleFlightCache<ServerRecord> {
        &self.cache
    }

    pub async fn get(&self, force_refresh: bool) -> Arc<Vec<ServerRecord>> {
        self.cache.get(force_refresh).await
    }

    pub async fn refresh(&self) -> Arc<Vec<ServerRecord>> {
        self.cache.get(true).await
    }

    /// Refresh after a mutation elsewhere (server or project added/removed).
    pub async fn on_data_changed(&self) {
        debug!("server data changed, refreshing");
        self.refresh().await;
    }

    pub async fn server_by_id(&self, server_id: &str) -> Option<ServerRecord> {
        self.get(false)
            .await
            .iter()
            .find(|s| s.server_id == server_id)
            .cloned()
    }

    pub async fn project_by_id(&self, project_id: &str) -> Option<ProjectRecord> {
        self.get(false)
            .await
            .iter()
            .find_map(|s| s.project(project_id))
            .cloned()
    }

    pub fn cached(&self) -> Arc<Vec<ServerRecord>> {
        self.cache.cached()
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.cache_info()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}
