// # dns-updater - DNS Updater Daemon
//
// Keeps every address record of one Cloudflare zone pointed at the host's
// current public IP.
//
// The daemon is responsible for:
// 1. Loading configuration (TOML file + environment variables)
// 2. Opening the log file
// 3. Building the IP resolver, the Cloudflare client and the ticker
// 4. Running the reconciliation engine until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Required
// - `CLOUDFLARE_API_TOKEN`: API token with Zone:DNS:Edit permission
// - `CLOUDFLARE_ZONE_ID`: Zone to reconcile
//
// ### Optional
// - `DNS_UPDATER_CONFIG`: TOML file (default `dns-updater.toml`, may be absent)
// - `DNS_UPDATER_INTERVAL_SECS`: Seconds between cycles (default 1800)
// - `DNS_UPDATER_IP_URL`: IP-echo endpoint (default Cloudflare trace)
// - `DNS_UPDATER_IP_VERSION`: v4, v6 or any (default v4)
// - `DNS_UPDATER_API_BASE`: Cloudflare API base URL
// - `DNS_UPDATER_RECORD_FILTER`: address or all (default address)
// - `DNS_UPDATER_MODE`: live or dry-run (default live)
// - `DNS_UPDATER_LOG_FILE`: Log file (default `dns_updater.log`)
// - `DNS_UPDATER_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DNS_UPDATER_LOG_CONSOLE`: Mirror log lines to stderr (default true)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=...
// export CLOUDFLARE_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export DNS_UPDATER_MODE=dry-run
//
// dns-updater
// ```

mod logging;
mod settings;

use anyhow::Result;
use dns_updater_cloudflare::CloudflareProvider;
use dns_updater_core::{IntervalTicker, ReconcileEngine, UpdaterConfig};
use dns_updater_ip_http::HttpIpResolver;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum UpdaterExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<UpdaterExitCode> for ExitCode {
    fn from(code: UpdaterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match settings::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return UpdaterExitCode::ConfigError.into();
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return UpdaterExitCode::ConfigError.into();
    }

    info!("DNS Updater started.");
    info!(
        "Zone {}, checking every {}s via {} [mode: {}]",
        config.credentials.zone_id,
        config.engine.interval_secs,
        config.ip_source.url,
        if config.provider.dry_run { "DRY-RUN" } else { "LIVE" }
    );

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return UpdaterExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return UpdaterExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(engine).await {
            error!("Daemon error: {:#}", e);
            UpdaterExitCode::RuntimeError
        } else {
            UpdaterExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the concrete resolver, provider and ticker into an engine
///
/// The daemon has no event consumer; the engine's log lines are the record.
fn build_engine(config: &UpdaterConfig) -> Result<ReconcileEngine> {
    let resolver = HttpIpResolver::from_config(&config.ip_source)?;
    let provider = CloudflareProvider::from_config(&config.credentials, &config.provider)?;
    let ticker = IntervalTicker::new(config.engine.interval());

    let (engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(provider),
        Box::new(ticker),
        config,
    )?;
    Ok(engine)
}

/// Run the engine until a shutdown signal arrives
async fn run_daemon(engine: ReconcileEngine) -> Result<()> {
    let shutdown = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    engine.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("DNS Updater stopped.");
    Ok(())
}

/// Install SIGTERM and SIGINT handlers
///
/// Handlers are registered before the returned future is polled, so a
/// failure to install them is reported at start-up.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "CTRL-C",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<&'static str>().await
            }
        }
    })
}
