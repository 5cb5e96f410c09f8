//! # adsplat-client
//!
//! Headless console client. Opens the local store, wires the backend bridge
//! when `ADSPLAT_BACKEND_URL` is set, and prints the navigation menu as JSON.
//! Setting `ADSPLAT_TOKEN` signs in first.

use std::sync::Arc;

use adsplat_client_lib::router::{PathNavigator, RouteTable};
use adsplat_client_lib::{init_tracing, ClientConfig, Collaborators, Console, HttpInvoker};
use adsplat_shared::constants::APP_NAME;
use adsplat_store::SqliteStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {APP_NAME} client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let store = match &config.data_dir {
        Some(dir) => SqliteStore::open_in_dir(dir)?,
        None => SqliteStore::new()?,
    };
    if let Some(path) = store.path() {
        info!(path = %path.display(), "Opened store");
    }

    let router = Arc::new(RouteTable::new());
    let mut parts = Collaborators::new()
        .store(Arc::new(store))
        .router(router.clone())
        .navigator(Arc::new(PathNavigator::new("/welcome")));
    if let Some(url) = &config.backend_url {
        parts = parts.invoker(Arc::new(HttpInvoker::new(url.clone())));
    }

    let console = Console::new(config, parts);

    let menu = match std::env::var("ADSPLAT_TOKEN") {
        Ok(token) if !token.trim().is_empty() => console.sign_in(&token).await?,
        _ => console.menus.menus().await,
    };

    info!(routes = router.paths().len(), "Menu ready");
    println!("{}", serde_json::to_string_pretty(&*menu)?);

    Ok(())
}
