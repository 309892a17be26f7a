//! FlowSim - packet pipeline simulator
//!
//! Runs the scheduler, the tick loop and the command/snapshot API.
//!
//! # Usage
//!
//! ```bash
//! # Recurring batches against a local ingestion API
//! cargo run --release -- --autostart
//!
//! # Offline single batch with the imaging sensor failing
//! cargo run --release -- --stub --fail-source imx477 --mode single_batch --autostart
//! ```
//!
//! # Environment Variables
//!
//! - `FLOWSIM_CONFIG`: Path to a TOML config file (default: `./flowsim.toml`)
//! - `FLOWSIM_CORS_ORIGINS`: Comma-separated CORS origins for the API
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use axum::Router;
use flowsim::api::{create_app, ApiState};
use flowsim::config::{defaults, SimConfig, TransportKind};
use flowsim::pipeline::{PipelineScheduler, PipelineStore, StageAdvancer, TickLoop};
use flowsim::transport::{HttpTransport, StubTransport, Transport};
use flowsim::types::{RunMode, SensorKind};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "flowsim")]
#[command(about = "Concurrent sensor packet pipeline simulator")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides FLOWSIM_CONFIG and ./flowsim.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the API bind address (default: "127.0.0.1:8090")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Run mode: single_batch or recurring
    #[arg(long)]
    mode: Option<RunMode>,

    /// Use the in-process stub transport instead of HTTP
    #[arg(long)]
    stub: bool,

    /// Make the stub transport fail for one sensor (implies --stub)
    #[arg(long, value_name = "SENSOR")]
    fail_source: Option<SensorKind>,

    /// Start a run as soon as the server is up
    #[arg(long, env = "FLOWSIM_AUTOSTART")]
    autostart: bool,

    /// Seed for reproducible sensor readings and latencies
    #[arg(long, env = "FLOWSIM_SEED")]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    TickLoop,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::TickLoop => write!(f, "TickLoop"),
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Resolve the config file and apply CLI overrides.
fn load_config(args: &CliArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimConfig::load(),
    };

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(mode) = args.mode {
        config.scheduler.mode = mode;
    }
    if args.stub || args.fail_source.is_some() {
        config.transport.kind = TransportKind::Stub;
    }
    if args.seed.is_some() {
        config.scheduler.seed = args.seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_transport(config: &SimConfig, fail_source: Option<SensorKind>) -> Result<Arc<dyn Transport>> {
    match config.transport.kind {
        TransportKind::Http => {
            let transport = HttpTransport::new(&config.transport.base_url, config.transport.timeout())
                .context("Failed to build HTTP transport")?;
            info!("📡 Transport: HTTP → {}", config.transport.base_url);
            Ok(Arc::new(transport))
        }
        TransportKind::Stub => {
            let mut stub = StubTransport::accepting();
            if let Some(kind) = fail_source {
                stub = stub.failing_for(kind);
                info!("📡 Transport: stub ({} endpoint failing)", kind);
            } else {
                info!("📡 Transport: stub (all endpoints accept)");
            }
            Ok(Arc::new(stub))
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe the token and finish.
    while let Some(result) = task_set.join_next().await {
        if let Ok(Ok(task_name)) = result {
            info!("🔒 Supervisor: Task {} stopped", task_name);
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(&args)?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  FlowSim - sensor → ingestion → broker → notifier → frontend");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "⚙️  Mode: {} | tick {} Hz | batch every {} ms | latency {}-{} ms",
        config.scheduler.mode,
        config.advancer.tick_hz,
        config.scheduler.batch_interval_ms,
        config.transport.latency_min_ms,
        config.transport.latency_max_ms
    );

    let transport = build_transport(&config, args.fail_source)?;
    let transport_name = transport.name().to_string();

    // One store for the whole process, handed to every component.
    let store = PipelineStore::new(config.parameter.bound_deg);
    let scheduler = PipelineScheduler::new(store.clone(), transport, &config);
    let advancer = StageAdvancer::new(&config.advancer, config.layout.clone());

    let state = ApiState {
        store: store.clone(),
        scheduler: scheduler.clone(),
        default_mode: config.scheduler.mode,
        step_deg: config.parameter.step_deg,
        transport: transport_name,
    };
    let app = create_app(state, config.server.mock_ingest);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("✓ API listening on http://{}/api/v1", config.server.addr);
    if config.server.mock_ingest {
        info!("✓ Mock ingestion endpoints enabled");
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 2: Tick loop driving the stage advancer
    let tick_loop = TickLoop::new(
        store.clone(),
        advancer,
        config.advancer.tick_period(),
        cancel_token.clone(),
    )
    .with_status_every(config.advancer.status_log_every_ticks);
    task_set.spawn(async move {
        info!("[TickLoop] Task starting");
        let _stats = tick_loop.run().await;
        Ok(TaskName::TickLoop)
    });

    if args.autostart {
        scheduler.start(config.scheduler.mode);
    }

    let result = run_supervisor(&mut task_set, cancel_token).await;

    scheduler.stop();
    if !scheduler
        .wait_for_idle(Duration::from_millis(defaults::SHUTDOWN_DRAIN_MS))
        .await
    {
        warn!(
            "{} worker(s) still in flight at shutdown",
            scheduler.in_flight()
        );
    }

    info!("✓ FlowSim shutdown complete");
    result
}
