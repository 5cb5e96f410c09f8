//! Navigation menu derived from the server list.
//!
//! The tree is rebuilt from scratch on every load: home, one node per server
//! (its projects, then an "add project" action), then the page-capture tool.
//! Server nodes are registered with the route registry once a build is kept.

use std::sync::Arc;

use adsplat_shared::constants::{KEY_MENU_DATA, KEY_MENU_DATA_TIMESTAMP};
use adsplat_shared::{MenuNode, ServerRecord};
use adsplat_store::KvStore;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::router::RouteRegistry;
use crate::servers::ServerCache;
use crate::session::SessionGate;
use crate::single_flight::{CacheSpec, Loader, SingleFlightCache};

pub const HOME_ID: &str = "welcome";
pub const TRAILING_ID: &str = "page-capture";

pub fn home_node() -> MenuNode {
    MenuNode::leaf(HOME_ID, "Home", "/welcome").with_icon("Grid")
}

pub fn trailing_node() -> MenuNode {
    MenuNode::leaf(TRAILING_ID, "Page Capture", "/page-capture").with_icon("CloudDownload")
}

/// The menu shown before any server data is available.
pub fn skeleton() -> Vec<MenuNode> {
    vec![home_node(), trailing_node()]
}

pub fn build_menu(servers: &[ServerRecord]) -> Vec<MenuNode> {
    let mut menu = vec![home_node()];
    menu.extend(
        servers
            .iter()
            .filter(|s| s.is_complete())
            .map(server_node),
    );
    menu.push(trailing_node());
    menu
}

fn server_node(server: &ServerRecord) -> MenuNode {
    let sid = &server.server_id;

    let mut children: Vec<MenuNode> = server
        .project_list
        .iter()
        .filter(|p| p.is_complete())
        .map(|p| {
            MenuNode::leaf(
                p.project_id.clone(),
                p.project_name.clone(),
                format!("/project/{sid}/{}", p.project_id),
            )
            .with_parent(sid.clone())
        })
        .collect();

    children.push(
        MenuNode::leaf(format!("add_{sid}"), "Add project", format!("/project_form/{sid}"))
            .with_parent(sid.clone()),
    );

    MenuNode::leaf(sid.clone(), server.server_name.clone(), format!("/project/{sid}"))
        .with_icon("Platform")
        .with_children(children)
}

/// The server-derived nodes of a built menu.
pub fn server_nodes(menu: &[MenuNode]) -> Vec<MenuNode> {
    menu.iter()
        .filter(|n| n.id != HOME_ID && n.id != TRAILING_ID)
        .cloned()
        .collect()
}

struct MenuLoader {
    servers: ServerCache,
    router: Arc<dyn RouteRegistry>,
}

#[async_trait]
impl Loader<MenuNode> for MenuLoader {
    async fn load(&self) -> Result<Vec<MenuNode>, ClientError> {
        let servers = self.servers.get(false).await;
        if servers.is_empty() {
            return Err(ClientError::NoServerData);
        }

        let menu = build_menu(&servers);
        info!(nodes = menu.len(), "built menu");
        Ok(menu)
    }

    fn on_kept(&self, menu: &[MenuNode]) {
        self.router.register_paths(&server_nodes(menu));
    }
}

/// The menu cache. Invalidated whenever the server cache is cleared or
/// force-refreshed.
#[derive(Clone)]
pub struct MenuService {
    cache: SingleFlightCache<MenuNode>,
    servers: ServerCache,
}

impl MenuService {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KvStore>,
        session: Arc<SessionGate>,
        servers: ServerCache,
        router: Arc<dyn RouteRegistry>,
    ) -> Self {
        let spec = CacheSpec {
            name: "menus",
            value_key: KEY_MENU_DATA,
            timestamp_key: KEY_MENU_DATA_TIMESTAMP,
            ttl: config.menu_cache_ttl,
        };
        let loader = Arc::new(MenuLoader {
            servers: servers.clone(),
            router: Arc::clone(&router),
        });
        let cache = SingleFlightCache::new(spec, store, session, loader);
        servers.coordinator().add_dependent(&cache);

        let hydrated = server_nodes(&cache.cached());
        if !hydrated.is_empty() {
            debug!(servers = hydrated.len(), "registering routes for cached menu");
            router.register_paths(&hydrated);
        }

        Self { cache, servers }
    }

    /// The current menu tree, building it if needed.
    pub async fn menus(&self) -> Arc<Vec<MenuNode>> {
        or_skeleton(self.cache.get(false).await)
    }

    /// Rebuild from freshly loaded server data.
    pub async fn reload(&self) -> Arc<Vec<MenuNode>> {
        self.cache.clear();
        self.servers.refresh().await;
        self.menus().await
    }

    /// Reset to the skeleton and drop the server data as well.
    pub fn clear(&self) {
        self.cache.clear();
        self.servers.clear();
        debug!("menus cleared");
    }

    /// The menu as it stands, without loading.
    pub fn current(&self) -> Arc<Vec<MenuNode>> {
        or_skeleton(self.cache.cached())
    }
}

fn or_skeleton(menu: Arc<Vec<MenuNode>>) -> Arc<Vec<MenuNode>> {
    if menu.is_empty() {
        Arc::new(skeleton())
    } else {
        menu
    }
}
