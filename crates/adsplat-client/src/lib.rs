pub mod config;
pub mod error;
pub mod invoke;
pub mod menu;
pub mod notify;
pub mod router;
pub mod servers;
pub mod session;
pub mod single_flight;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, Failure, InvokeError};
pub use invoke::{HttpInvoker, Invoker};
pub use menu::MenuService;
pub use servers::ServerCache;
pub use session::SessionGate;
pub use state::{Collaborators, Console};
pub use transport::{EndpointKind, Reply, Transport};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("adsplat_client_lib=debug,adsplat_client=debug,adsplat_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
