use anyhow::{Context, Result};
use clap::Parser;
use proxy_probe::{
    logging, shutdown, BatchDriver, Config, HttpProbeExecutor, ProxyPool, ResultSink,
    RotationController, RotationPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Checks which identifiers exist on an identity endpoint, rotating through
/// proxies when throttled
#[derive(Parser)]
#[command(name = "proxy-probe")]
#[command(about = "Checks identifier existence through a rotating proxy pool")]
struct Cli {
    /// Single identifier to validate
    #[arg(short, long, conflicts_with = "file")]
    email: Option<String>,

    /// File with identifiers to validate, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Append valid identifiers to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delay in seconds between identifiers (can be 0 when using proxies)
    #[arg(short, long, default_value_t = proxy_probe::config::DEFAULT_DELAY_SECS)]
    delay: f64,

    /// File with proxies, one per line (scheme://host:port)
    #[arg(short, long)]
    proxy_file: Option<PathBuf>,

    /// Timeout in seconds for each attempt
    #[arg(short, long, env = "PROXY_PROBE_TIMEOUT_SECS", default_value_t = proxy_probe::probe::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Identity endpoint URL
    #[arg(long, env = "PROXY_PROBE_URL", default_value = proxy_probe::probe::DEFAULT_TARGET_URL)]
    url: String,

    /// Number of identifiers processed concurrently
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,

    /// Show debug information including endpoint responses
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            identifier: cli.email,
            identifier_file: cli.file,
            output: cli.output,
            proxy_file: cli.proxy_file,
            delay_secs: cli.delay,
            timeout_secs: cli.timeout,
            target_url: cli.url,
            concurrency: cli.concurrency,
            verbose: cli.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from(Cli::parse());
    logging::init(config.verbose)?;
    config.validate()?;

    let pool = match &config.proxy_file {
        Some(path) => ProxyPool::load(path)?,
        None => ProxyPool::direct_only(),
    };

    let executor = HttpProbeExecutor::with_config(config.probe_config())
        .context("failed to build HTTP client")?;
    let controller = Arc::new(RotationController::new(
        pool,
        Arc::new(executor),
        RotationPolicy::default(),
        config.timeout(),
    ));

    let identifiers = config.identifier_source()?.open()?;

    let cancel = CancellationToken::new();
    shutdown::cancel_on_ctrl_c(cancel.clone());

    let driver = BatchDriver::new(controller, config.batch_config());
    let summary = match &config.output {
        Some(path) => {
            let sink = ResultSink::open(path)
                .with_context(|| format!("cannot open output file {}", path.display()))?;
            driver.with_sink(sink).run(identifiers, &cancel).await?
        }
        None => driver.run(identifiers, &cancel).await?,
    };

    info!(
        "Done: {} valid, {} invalid, {} unresolved",
        summary.valid, summary.invalid, summary.unresolved
    );
    Ok(())
}
