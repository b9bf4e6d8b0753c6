//! `vigil-console` -- live monitoring console.
//!
//! Keeps a local cache of monitors and groups in sync with the monitoring
//! server over its push channel and logs changes as they arrive. Type
//! `reconnect` on stdin to retry after the connection gave up, `status` to
//! print the connection state.
//!
//! # Environment variables
//!
//! | Variable                       | Required | Default                     | Description                         |
//! |--------------------------------|----------|-----------------------------|-------------------------------------|
//! | `VIGIL_WS_URL`                 | yes      | --                          | Push endpoint, e.g. `ws://host:5000/ws` |
//! | `VIGIL_API_BASE_URL`           | no       | `http://localhost:5000/api` | REST base URL                       |
//! | `VIGIL_STORE_URL`              | no       | `sqlite://vigil-cache.db`   | Local cache; empty disables it      |
//! | `VIGIL_RECONNECT_MAX_ATTEMPTS` | no       | `5`                         | Automatic reconnect attempts        |
//! | `VIGIL_RECONNECT_DELAY_MS`     | no       | `3000`                      | Delay between attempts              |
//! | `VIGIL_RECONNECT_BACKOFF`      | no       | `fixed`                     | `fixed` or `exponential`            |
//! | `VIGIL_WIPE_ON_DISCONNECT`     | no       | `true`                      | Clear cached monitors on disconnect |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_console::app;
use vigil_console::config::ConsoleConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_console=info,vigil_sync=info,vigil_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConsoleConfig::from_env()?;

    tracing::info!(
        ws_url = %config.ws_url,
        api_base_url = %config.api_base_url,
        store = config.store_url.as_deref().unwrap_or("<none>"),
        "Starting vigil-console",
    );

    app::run(config).await
}
