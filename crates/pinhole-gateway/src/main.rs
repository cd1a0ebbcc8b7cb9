mod cli;

use crate::cli::{GeneratorArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use pinhole_cache::ExpiringCache;
use pinhole_gateway::{App, AppState};
use pinhole_generator::{Generator, HashGenerator, Snowflake, SnowflakeSettings};
use pinhole_redirector::{RedirectorService, RedirectorSettings};
use pinhole_shortener::{ShortenerService, ShortenerSettings};
use pinhole_storage::{InMemoryRepository, MySqlRepository, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_json);

    info!(
        port = config.port,
        base_url = %config.base_url(),
        generator = %config.generator,
        storage_backend = %config.storage,
        "starting pinhole"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            with_generator(&config, Arc::new(InMemoryRepository::new())).await?;
        }
        StorageBackendArg::Mysql => {
            let database_url = config.mysql_url()?;
            let repository = MySqlRepository::connect(&database_url)
                .await
                .context("failed to connect to mysql")?;
            repository.migrate().await.context("failed to migrate mysql schema")?;
            with_generator(&config, Arc::new(repository)).await?;
        }
    }

    info!("server shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn with_generator<R: Repository>(config: &CLI, repository: Arc<R>) -> anyhow::Result<()> {
    match config.generator {
        GeneratorArg::Hash => {
            let generator = HashGenerator::content(config.short_code_length)?;
            run_server(config, repository, generator).await
        }
        GeneratorArg::Random => {
            let generator = HashGenerator::random(config.short_code_length)?;
            run_server(config, repository, generator).await
        }
        GeneratorArg::Snowflake => {
            let settings = SnowflakeSettings::builder()
                .machine_id(config.machine_id)
                .build();
            run_server(config, repository, Snowflake::new(settings)?).await
        }
    }
}

async fn run_server<R: Repository, G: Generator>(
    config: &CLI,
    repository: Arc<R>,
    generator: G,
) -> anyhow::Result<()> {
    let cache = Arc::new(ExpiringCache::new(config.cache_ttl()));

    let shortener = ShortenerService::new(
        Arc::clone(&repository),
        generator,
        Arc::clone(&cache),
        ShortenerSettings::builder().base_url(config.base_url()).build(),
    );
    let redirector = RedirectorService::new(repository, cache, RedirectorSettings::builder().build());
    let state = AppState::new(Arc::new(shortener), Arc::new(redirector));

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
