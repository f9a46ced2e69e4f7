//! Kube Sync Agent
//!
//! Reconciles deployment unit volumes into PersistentVolumes and claims,
//! and watches the pods the agent owns.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kube_sync_agent::domain::ports::ReplyPublisherRef;
use kube_sync_agent::{
    AgentConfig, AgentMetrics, ApiServer, ApiServerConfig, Error, HttpReplyPublisher,
    KubePodEventSource, KubeVolumeApi, LogReplyPublisher, PodCache, PodWatcher, Result,
    SyncHandler, VolumeReconciler,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Kube Sync Agent - deployment unit volumes and owned pod state
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file; flags below override its values
    #[arg(long, env = "SYNC_AGENT_CONFIG")]
    config: Option<String>,

    /// Namespace to watch and to create claims in by default
    #[arg(long, env = "SYNC_AGENT_NAMESPACE")]
    namespace: Option<String>,

    /// Label key marking pods owned by this agent
    #[arg(long, env = "SYNC_AGENT_OWNERSHIP_LABEL")]
    ownership_label: Option<String>,

    /// REST API bind address
    #[arg(long, env = "API_ADDR")]
    api_addr: Option<String>,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR")]
    health_addr: Option<String>,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Origin endpoint replies are posted to
    #[arg(long, env = "REPLY_URL")]
    reply_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Resolve the effective configuration
    fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_file(path)?,
            None => AgentConfig::default(),
        };

        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(label) = &self.ownership_label {
            config.ownership_label = label.clone();
        }
        if let Some(addr) = &self.api_addr {
            config.api_addr = addr.clone();
        }
        if let Some(addr) = &self.health_addr {
            config.health_addr = addr.clone();
        }
        if let Some(addr) = &self.metrics_addr {
            config.metrics_addr = addr.clone();
        }
        if let Some(url) = &self.reply_url {
            config.reply_url = Some(url.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = args.agent_config()?;

    info!("Starting Kube Sync Agent");
    info!("  Version: {}", kube_sync_agent::VERSION);
    info!("  Namespace: {}", config.namespace);
    info!("  Ownership label: {}", config.ownership_label);
    info!("  REST API: {}", config.api_addr);

    let client = kube::Client::try_default().await?;
    info!("Connected to Kubernetes API");

    let registry = prometheus::Registry::new();
    let metrics = AgentMetrics::register(&registry)?;

    // Start pod watcher
    let cache = PodCache::with_metrics(metrics.clone());
    let watch = PodWatcher::new(cache.clone(), config.ownership_label.clone())
        .start(KubePodEventSource::new(client.clone(), &config.namespace));

    let reconciler =
        VolumeReconciler::new(Arc::new(KubeVolumeApi::new(client))).with_metrics(metrics);

    let publisher: ReplyPublisherRef = match &config.reply_url {
        Some(url) => {
            info!("  Reply endpoint: {}", url);
            Arc::new(HttpReplyPublisher::new(url.clone(), config.reply_timeout())?)
        }
        None => Arc::new(LogReplyPublisher),
    };

    let handler = Arc::new(SyncHandler::new(
        reconciler,
        cache.clone(),
        publisher,
        config.namespace.clone(),
    ));

    // Start health server
    let health_addr = config.health_socket_addr()?;
    let watch_token = watch.cancellation_token();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(health_addr, watch_token).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = config.metrics_socket_addr()?;
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_addr, registry).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Create and run API server
    let api_config = ApiServerConfig {
        rest_addr: config.api_socket_addr()?,
    };
    let api_server = Arc::new(ApiServer::new(api_config, handler, cache));

    let server = api_server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        server.shutdown();
    });

    api_server.run().await?;

    watch.stop();
    watch.join().await?;

    info!("Agent shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Liveness always answers; readiness fails once the pod watcher has stopped
async fn run_health_server(addr: SocketAddr, watch_token: CancellationToken) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(move |_conn| {
        let watch_token = watch_token.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let watching = !watch_token.is_cancelled();
                async move {
                    let (status, body) = match req.uri().path() {
                        "/healthz" | "/livez" => (StatusCode::OK, "ok"),
                        "/readyz" if watching => (StatusCode::OK, "ok"),
                        "/readyz" => (StatusCode::SERVICE_UNAVAILABLE, "pod watcher stopped"),
                        _ => (StatusCode::NOT_FOUND, "not found"),
                    };
                    let mut response = Response::new(Body::from(body));
                    *response.status_mut() = status;
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: SocketAddr, registry: prometheus::Registry) -> Result<()> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                async move {
                    let response = match req.uri().path() {
                        "/metrics" => {
                            let encoder = TextEncoder::new();
                            let mut buffer = Vec::new();
                            match encoder.encode(&registry.gather(), &mut buffer) {
                                Ok(()) => {
                                    let mut response = Response::new(Body::from(buffer));
                                    if let Ok(value) = HeaderValue::from_str(encoder.format_type()) {
                                        response.headers_mut().insert(CONTENT_TYPE, value);
                                    }
                                    response
                                }
                                Err(e) => {
                                    error!("Failed to encode metrics: {}", e);
                                    let mut response = Response::new(Body::from("encode error"));
                                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                    response
                                }
                            }
                        }
                        _ => {
                            let mut response = Response::new(Body::from("not found"));
                            *response.status_mut() = StatusCode::NOT_FOUND;
                            response
                        }
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
