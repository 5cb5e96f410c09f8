//! Console state: the session gate, transport and both caches wired together
//! over one store.

use std::sync::Arc;

use adsplat_shared::MenuNode;
use adsplat_store::{KvStore, MemoryStore};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::invoke::Invoker;
use crate::menu::MenuService;
use crate::notify::{BusyIndicator, Feedback, Notifier};
use crate::router::{Navigator, RouteRegistry, RouteTable};
use crate::servers::ServerCache;
use crate::session::SessionGate;
use crate::transport::{Reply, Transport};

/// Host-provided collaborators. Anything left unset is either absent
/// (invoker, notifier, busy indicator, navigator) or an in-process default
/// (store, route registry).
#[derive(Default)]
pub struct Collaborators {
    store: Option<Arc<dyn KvStore>>,
    invoker: Option<Arc<dyn Invoker>>,
    notifier: Option<Arc<dyn Notifier>>,
    busy: Option<Arc<dyn BusyIndicator>>,
    router: Option<Arc<dyn RouteRegistry>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn busy(mut self, busy: Arc<dyn BusyIndicator>) -> Self {
        self.busy = Some(busy);
        self
    }

    pub fn router(mut self, router: Arc<dyn RouteRegistry>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }
}

/// Central client state.
pub struct Console {
    pub config: ClientConfig,
    pub session: Arc<SessionGate>,
    pub transport: Arc<Transport>,
    pub servers: ServerCache,
    pub menus: MenuService,
}

impl Console {
    pub fn new(config: ClientConfig, parts: Collaborators) -> Self {
        let store = parts
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KvStore>);
        let router = parts
            .router
            .unwrap_or_else(|| Arc::new(RouteTable::new()) as Arc<dyn RouteRegistry>);
        let feedback = Feedback::new(parts.notifier, parts.busy);

        let session = Arc::new(SessionGate::new(
            &config,
            Arc::clone(&store),
            feedback.clone(),
            parts.navigator,
        ));
        let transport = Arc::new(Transport::new(
            &config,
            parts.invoker,
            Arc::clone(&session),
            feedback,
        ));
        let servers = ServerCache::new(
            &config,
            Arc::clone(&store),
            Arc::clone(&session),
            Arc::clone(&transport),
        );
        let menus = MenuService::new(&config, store, Arc::clone(&session), servers.clone(), router);

        info!(
            remote = transport.is_available(),
            signed_in = session.is_authorized(),
            "console ready"
        );

        Self {
            config,
            session,
            transport,
            servers,
            menus,
        }
    }

    /// Store the token and rebuild the menu from fresh server data.
    pub async fn sign_in(&self, token: &str) -> Result<Arc<Vec<MenuNode>>, ClientError> {
        self.session.set_token(token)?;
        Ok(self.menus.reload().await)
    }

    pub fn sign_out(&self) -> Option<JoinHandle<()>> {
        self.session.sign_out()
    }

    /// Call a backend endpoint through the transport envelope.
    pub async fn call(&self, name: &str, args: Map<String, Value>) -> Reply {
        self.transport.call(name, args).await
    }

    /// Refresh server data, and with it the menu, after a mutation.
    pub async fn on_data_changed(&self) {
        self.servers.on_data_changed().await;
    }
}
