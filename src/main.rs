use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use request_limiter::config::{LimiterServiceConfig, RateLimiterConfig};
use request_limiter::ratelimit::RateLimiter;
use request_limiter::replay::replay_until;

/// How long in-flight work gets after shutdown before the runtime is dropped.
/// A pending stdin read sits on the blocking pool and never completes on its
/// own.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Admit or deny newline-delimited JSON requests read from stdin.
#[derive(Parser, Debug)]
#[command(name = "request-limiter", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum requests per address per period (<= 0 disables)
    #[arg(long, allow_negative_numbers = true)]
    request_limit: Option<i64>,

    /// Maximum request size per address per period (<= 0 disables)
    #[arg(long, allow_negative_numbers = true)]
    request_limit_in_bytes: Option<i64>,

    /// Window length in seconds
    #[arg(long)]
    period: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Command line values take precedence over file and environment.
    fn apply(&self, limiter: &mut RateLimiterConfig) {
        if let Some(limit) = self.request_limit {
            limiter.request_limit = limit;
        }
        if let Some(limit) = self.request_limit_in_bytes {
            limiter.request_limit_in_bytes = limit;
        }
        if let Some(period) = self.period {
            limiter.request_limit_period_in_seconds = period;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout carries decisions
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Request Limiter");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(&args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    info!("Request Limiter stopped");
    result
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let mut config = LimiterServiceConfig::load(args.config.as_deref())?;
    args.apply(&mut config.limiter);
    config.validate()?;
    info!(
        request_limit = config.limiter.request_limit,
        request_limit_in_bytes = config.limiter.request_limit_in_bytes,
        period_secs = config.limiter.request_limit_period_in_seconds,
        "Configuration loaded"
    );

    let limiter = RateLimiter::from_service_config(&config);
    info!(server = ?limiter.server_id(), "Rate limiter initialized");

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    let stats = replay_until(&limiter, input, output, shutdown_signal()).await?;
    info!(
        allowed = stats.allowed,
        denied = stats.denied,
        malformed = stats.malformed,
        "Replay finished"
    );
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
