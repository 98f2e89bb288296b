use std::sync::Arc;

use clap::Parser;
use tokio::net::UdpSocket;

use cachedns::clock::SystemClock;
use cachedns::resolver::cache::SharedCache;
use cachedns::resolver::run_forever;
use cachedns::settings::{Args, ConfigurationFailure, Settings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = match Settings::from_args(&args) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let socket = match UdpSocket::bind(settings.bind_addr).await {
        Ok(socket) => socket,
        Err(err) => {
            let err = ConfigurationFailure::BindFailure(err.to_string());
            tracing::error!(error = %err, addr = %settings.bind_addr, "could not bind listening socket");
            std::process::exit(1);
        }
    };

    tracing::info!(
        bind_addr = %settings.bind_addr,
        upstream_addr = %settings.upstream_addr,
        "listening",
    );

    let clock = Arc::new(SystemClock);
    let cache = SharedCache::new(clock.clone());
    let shutdown = Box::pin(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    run_forever(socket, settings.upstream_addr, cache, clock, shutdown).await;
}
