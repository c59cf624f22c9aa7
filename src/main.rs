//! Module runtime binary.
//!
//! Runs one module on the in-process broker until a termination signal or
//! a `shutdown` command from core.
//!
//! ```text
//! module-runtime --descriptor module.json --config runtime.toml --log-level debug
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use module_runtime::config::load_config;
use module_runtime::lifecycle::signals::wait_for_termination;
use module_runtime::observability::{logging, metrics};
use module_runtime::{LocalBus, Module, RuntimeConfig, Severity, ShutdownStatus};

#[derive(Parser)]
#[command(name = "module-runtime")]
#[command(about = "Run a module attached to core over the in-process broker", long_about = None)]
struct Cli {
    /// Descriptor file (JSON or YAML). Defaults to module.json next to the binary.
    #[arg(short, long)]
    descriptor: Option<PathBuf>,

    /// Runtime config file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Module log level (debug, info, warn, error, fatal or 0-5).
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init(Severity::parse(&config.logging.level).unwrap_or_default());
    tracing::info!("module-runtime v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let bus = LocalBus::new();
    let exit_process = config.shutdown.exit_process;
    let mut builder = Module::builder(config).broker(Arc::new(bus.client("module")));
    if let Some(path) = &cli.descriptor {
        builder = builder.descriptor_path(path);
    }
    let module = builder.build()?;

    module.setup(true).await?;
    module.logger().info(format!("{} ready", module.name()));

    let mut shutdown_notice = module.subscribe_shutdown();
    let status = tokio::select! {
        signal = wait_for_termination() => {
            tracing::info!(signal, "Termination signal received");
            module.shutdown(exit_process).await
        }
        notice = shutdown_notice.recv() => notice.unwrap_or(ShutdownStatus::Ok),
    };

    tracing::info!(status = status.as_str(), "Shutdown complete");
    Ok(ExitCode::from(status.exit_code() as u8))
}
