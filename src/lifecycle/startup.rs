//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the configured record store
//! - Bind the listener
//! - Install the metrics exporter when enabled
//!
//! Any error here is fatal; nothing has been served yet.

use std::io;
use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::store::{self, StoreError};

/// Reasons the service could not come up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open book store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),
}

/// Bring up every subsystem in order and return a server ready to run.
pub async fn start(config: ServiceConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let store = store::open_store(&config.storage)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(
            address = %local_addr,
            backend = store.backend(),
            "Server running on http://{}",
            local_addr
        );
    }

    Ok((HttpServer::new(config, store), listener))
}
