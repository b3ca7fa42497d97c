use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use roomdav_app::app::api::routes;
use roomdav_app::config::ConfigHandler;
use roomdav_app::service_handler::ServiceHandler;
use roomdav_core::config::{HostMode, load_config};
use roomdav_host::memory::MemoryHost;
use roomdav_host::nextcloud::NextcloudHost;
use roomdav_service::calendar::CalendarSharingService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting roomdav calendar bridge");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let service_account = config.bridge.service_account.clone();
    let service = match config.host.mode {
        HostMode::Memory => {
            tracing::warn!("Using the in-memory host backend, state is not persisted");
            CalendarSharingService::with_backend(Arc::new(MemoryHost::new()), &service_account)
        }
        HostMode::Nextcloud => {
            let base_url = config
                .host
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("host.base_url is required in nextcloud mode"))?;
            let password = config.host.service_password.as_deref().ok_or_else(|| {
                anyhow::anyhow!("host.service_password is required in nextcloud mode")
            })?;
            CalendarSharingService::with_backend(
                Arc::new(NextcloudHost::new(base_url, &service_account, password)),
                &service_account,
            )
        }
    };

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .hoop(ServiceHandler {
            service: Arc::new(service),
        })
        .push(routes()?);

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
