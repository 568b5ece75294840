//! Ferrogate S3 Server - an S3-compatible gateway in front of striped storage
//! clusters.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8080 ACCESS_KEY=ak SECRET_KEY=sk ferrogate-s3-server
//! ```
//!
//! See [`GatewayConfig::from_env`] for every environment variable. Logging
//! is controlled by `LOG_LEVEL` (overridden by `RUST_LOG`) and `LOG_FORMAT`
//! (`text` or `json`).

mod handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use ferrogate_s3_auth::{
    Authenticator, CachedCredentialProvider, Credential, StaticCredentialProvider, TokenKey,
};
use ferrogate_s3_core::{GatewayConfig, GatewayS3};
use ferrogate_s3_http::middleware::access_log::{BusMessage, ChannelMessageBus, MessageBus};
use ferrogate_s3_http::middleware::auth::identity_of;
use ferrogate_s3_http::service::{S3HttpConfig, S3HttpService};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::GatewayHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Undelivered access records kept before new ones are dropped.
const ACCESS_LOG_BUFFER: usize = 4096;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise the `LOG_LEVEL` config value. Output is
/// JSON when `LOG_FORMAT=json`.
fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// The credential configured by `ACCESS_KEY` / `SECRET_KEY`.
fn static_credential(config: &GatewayConfig) -> Credential {
    Credential::new(config.access_key.clone(), config.secret_key.clone())
}

/// Build the [`S3HttpConfig`] from the gateway configuration.
fn build_http_config(
    config: &GatewayConfig,
    credentials: Arc<CachedCredentialProvider>,
    message_bus: Option<Arc<dyn MessageBus>>,
) -> Result<S3HttpConfig> {
    let mut authenticator =
        Authenticator::new(credentials).with_domains(config.s3_domains.clone());
    if let Some(encoded) = &config.sts_encryption_key {
        let raw = BASE64_STANDARD
            .decode(encoded.trim())
            .context("STS_ENCRYPTION_KEY is not valid base64")?;
        let key = TokenKey::from_slice(&raw).context("STS_ENCRYPTION_KEY must be 32 bytes")?;
        authenticator = authenticator.with_token_key(key);
    }

    let mut http_config = S3HttpConfig::new(Arc::new(authenticator));
    http_config.domains.clone_from(&config.s3_domains);
    http_config.virtual_hosting = config.s3_virtual_hosting;
    http_config.skip_signature_validation = config.skip_signature_validation;
    http_config.max_concurrent_requests = config.max_concurrent_requests;
    http_config.request_timeout = Duration::from_secs(config.request_timeout_secs);
    http_config.disabled_operations.clone_from(&config.disabled_operations);
    http_config.fallback_identity = identity_of(&static_credential(config));
    http_config.message_bus = message_bus;
    Ok(http_config)
}

/// Drain the in-process bus. Records were already logged under the
/// `access_log` target when they were produced.
fn spawn_bus_consumer(mut receiver: mpsc::Receiver<BusMessage>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            trace!(topic = %message.topic, bytes = message.payload.len(), "bus message delivered");
        }
    })
}

/// Periodically evict expired credential cache entries.
fn spawn_credential_sweeper(
    credentials: Arc<CachedCredentialProvider>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let evicted = credentials.sweep();
            if evicted > 0 {
                trace!(evicted, "credential cache swept");
            }
        }
    })
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: ferrogate_s3_http::dispatch::S3Handler>(
    listener: TcpListener,
    service: S3HttpService<H>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.for_connection(peer_addr);
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained");

    Ok(())
}

/// Query the health endpoint of a running gateway.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /_health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    // Handle --health-check flag for container health checks.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level, &config.log_format)?;

    info!(
        gateway_listen = %config.gateway_listen,
        s3_domains = ?config.s3_domains,
        s3_virtual_hosting = config.s3_virtual_hosting,
        skip_signature_validation = config.skip_signature_validation,
        clusters = ?config.cluster_ids,
        version = VERSION,
        "starting Ferrogate S3 Server",
    );

    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
    let credentials = Arc::new(CachedCredentialProvider::new(
        Arc::new(StaticCredentialProvider::new(vec![static_credential(&config)])),
        cache_ttl,
    ));
    let sweeper = spawn_credential_sweeper(Arc::clone(&credentials), cache_ttl);

    let (bus, bus_receiver) = ChannelMessageBus::new(ACCESS_LOG_BUFFER);
    let consumer = spawn_bus_consumer(bus_receiver);

    let http_config = build_http_config(&config, credentials, Some(Arc::new(bus)))?;
    let (gateway, workers) = GatewayS3::new(config.clone()).context("failed to start gateway")?;
    let gateway = Arc::new(gateway);
    let service = S3HttpService::new(GatewayHandler(Arc::clone(&gateway)), http_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    let result = serve(listener, service).await;

    gateway.shutdown(workers).await;
    sweeper.abort();
    consumer.abort();
    info!("gateway stopped");
    result
}
