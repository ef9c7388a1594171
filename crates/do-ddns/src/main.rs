// # do-ddns - DigitalOcean DDNS updater
//
// One invocation performs one reconciliation run and exits. Periodicity
// comes from an external scheduler (cron, systemd timer).
//
// This binary is a THIN integration layer: it reads the environment, sets
// up logging and the runtime, wires the plugins together and maps the
// outcome to an exit code. All DDNS logic lives in ddns-core.
//
// ## Configuration
//
// ### Required
// - `DO_DDNS_TOKEN`: DigitalOcean API token (fallback: `DIGITALOCEAN_TOKEN`)
// - `DO_DDNS_DOMAIN`: Zone managed by DigitalOcean (e.g., example.com)
// - `DO_DDNS_NAME`: Record name relative to the zone (`@` for the apex)
//
// ### Record
// - `DO_DDNS_TYPE`: Record type (only `A` is supported)
// - `DO_DDNS_TTL`: TTL for created/updated records (default: 300)
//
// ### Sources and state
// - `DO_DDNS_IP_SOURCE`: Public IP endpoint (default: https://api.ipify.org)
// - `DO_DDNS_API_BASE`: API base URL (default: https://api.digitalocean.com/v2)
// - `DO_DDNS_STATE_DIR`: Directory for the state cache and run lock (default: /var/tmp)
//
// ### Engine
// - `DO_DDNS_PER_PAGE`: Listing page size, 1-200 (default: 200)
// - `DO_DDNS_MAX_PAGES`: Listing page bound (default: 100)
// - `DO_DDNS_MAX_RETRIES`: Attempts per request, 1-10 (default: 5)
// - `DO_DDNS_TIMEOUT_SECS`: Whole-run deadline (default: 60)
// - `DO_DDNS_CLEANUP_DUPLICATES`: Delete non-canonical duplicates (default: false)
// - `DO_DDNS_USE_CACHE`: Skip the API when the cached IP matches (default: false)
// - `DO_DDNS_DRY_RUN`: Log mutations instead of sending them (also `DDNS_MODE=dry-run`)
//
// ### Logging
// - `DO_DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DO_DDNS_VERBOSE`: Shorthand for debug
//
// ## Exit Codes
//
// | Code | Meaning |
// |------|---------|
// | 0    | Success, or another run holds the lock |
// | 1    | Other runtime failure |
// | 2    | Missing or invalid configuration |
// | 3    | Public IP lookup failed or returned garbage |
// | 4    | Listing records failed |
// | 5    | Creating the record failed |
// | 6    | Updating the record failed |
// | 7    | Run deadline exceeded |
// | 130  | Interrupted by SIGINT/SIGTERM |
//
// ## Example
//
// ```bash
// export DO_DDNS_TOKEN=dop_v1_...
// export DO_DDNS_DOMAIN=example.com
// export DO_DDNS_NAME=home
//
// do-ddns
// ```

mod settings;

use ddns_core::{
    DdnsConfig, EngineEvent, FileStateStore, Reconciler, RequestClient, RunAction, RunReport,
    RunStatus, run_exclusive,
};
use ddns_ip_http::HttpIpSource;
use ddns_provider_digitalocean::DigitalOceanProvider;
use settings::Settings;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the ways a run can end
///
/// Each failed stage has its own code so the scheduler can alert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Record is current (or the run was skipped)
    Success = 0,
    /// Unexpected failure outside the named stages
    RuntimeError = 1,
    /// Configuration error
    ConfigError = 2,
    /// Public IP could not be resolved
    IpError = 3,
    /// Records could not be listed
    ListError = 4,
    /// Record could not be created
    CreateError = 5,
    /// Record could not be updated
    UpdateError = 6,
    /// Run deadline expired
    Timeout = 7,
    /// Terminated by a signal
    Interrupted = 130,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&ddns_core::Error> for DdnsExitCode {
    fn from(err: &ddns_core::Error) -> Self {
        use ddns_core::Error;

        match err {
            Error::Config(_) => DdnsExitCode::ConfigError,
            Error::IpSource(_) | Error::InvalidIp { .. } => DdnsExitCode::IpError,
            Error::List(_) | Error::Pagination(_) => DdnsExitCode::ListError,
            Error::Create(_) => DdnsExitCode::CreateError,
            Error::Update { .. } => DdnsExitCode::UpdateError,
            Error::Timeout(_) => DdnsExitCode::Timeout,
            _ => DdnsExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Logs go to stderr so stdout stays free for the scheduler
    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::RuntimeError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(settings.ddns)).into()
}

/// Wire the plugins together and run once under the lock and deadline
async fn run(config: DdnsConfig) -> DdnsExitCode {
    let reconciler = match build_reconciler(&config).await {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Startup failed: {}", e);
            return DdnsExitCode::from(&e);
        }
    };

    info!(
        record = %config.fqdn(),
        dry_run = config.engine.dry_run,
        use_cache = config.engine.use_cache,
        "Starting run"
    );

    let deadline = config.engine.run_timeout();

    // Dropping the run future on a signal releases the lock before we exit
    tokio::select! {
        result = run_exclusive(&reconciler, config.lock_file(), deadline) => match result {
            Ok(RunStatus::Skipped) => DdnsExitCode::Success,
            Ok(RunStatus::Completed(report)) => {
                log_report(&report);
                DdnsExitCode::Success
            }
            Err(e) => {
                error!("Run failed: {}", e);
                DdnsExitCode::from(&e)
            }
        },
        signal = wait_for_shutdown() => {
            warn!("Received {}, aborting run", signal);
            DdnsExitCode::Interrupted
        }
    }
}

/// Build the reconciler from the validated configuration
async fn build_reconciler(config: &DdnsConfig) -> ddns_core::Result<Reconciler> {
    // The IP endpoint is public: same retry policy, no bearer token
    let engine = &config.engine;
    let ip_client = RequestClient::new(engine.retry_policy(), engine.http_timeout())
        .map_err(|e| ddns_core::Error::config(format!("Failed to build HTTP client: {}", e)))?;
    let ip_source = HttpIpSource::new(config.ip_source.url.clone(), ip_client);

    let provider = DigitalOceanProvider::from_config(config)?;
    let state_store = FileStateStore::new(config.state_file()).await?;

    let (reconciler, events) = Reconciler::new(
        Box::new(ip_source),
        Box::new(provider),
        Box::new(state_store),
        config,
    )?;
    tokio::spawn(log_events(events));

    Ok(reconciler)
}

/// Drain engine events so the channel never fills
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Engine event");
    }
}

fn log_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    match &report.action {
        RunAction::Created { id } => {
            info!(ip = %report.ip, ?id, "{}Record created", prefix)
        }
        RunAction::Updated { id, previous } => {
            info!(ip = %report.ip, id, previous = %previous, "{}Record updated", prefix)
        }
        RunAction::Unchanged { id } => info!(ip = %report.ip, id, "Record already current"),
        RunAction::CacheHit => info!(ip = %report.ip, "Cached IP unchanged, API not contacted"),
    }

    if !report.cleanup.deleted.is_empty() {
        info!(ids = ?report.cleanup.deleted, "{}Duplicates removed", prefix);
    }
    if report.cleanup.is_partial() {
        warn!(
            failed = ?report.cleanup.failed,
            "Some duplicates could not be removed; they will be retried next run"
        );
    }
}

/// Wait for SIGTERM or SIGINT
///
/// If the handlers cannot be installed the run proceeds without them.
#[cfg(unix)]
async fn wait_for_shutdown() -> &'static str {
    let handlers = signal(SignalKind::terminate())
        .and_then(|term| signal(SignalKind::interrupt()).map(|int| (term, int)));

    match handlers {
        Ok((mut sigterm, mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            }
        }
        Err(e) => {
            warn!("Failed to set up signal handlers: {}", e);
            std::future::pending().await
        }
    }
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to wait for CTRL-C: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
