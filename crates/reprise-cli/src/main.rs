// SPDX-License-Identifier: GPL-3.0-or-later

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use reprise_application::{
    AppState, ReconciliationEngine, ReconciliationError, ReconciliationReport, ReportPresenter,
};
use reprise_auth::{authenticate, DeezerAuth, SpotifyAuth, TokenCache};
use reprise_config::{load as load_config, AppConfig, DEFAULT_CONFIG_FILE};
use reprise_deezer::{DeezerClient, QuotaRetryPolicy};
use reprise_spotify::{SpotifyClient, SpotifyError};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Reconcile your Spotify favorites against the Deezer catalog.
#[derive(Debug, Parser)]
#[command(name = "reprise", version, about)]
struct Cli {
    /// Launch the graphical interface instead of the command line one.
    #[arg(short = 'g', long)]
    gui: bool,

    /// Log at debug level regardless of configuration.
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Cli,
    Gui,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.gui {
            RunMode::Gui
        } else {
            RunMode::Cli
        }
    }
}

#[derive(Debug)]
enum RunOutcome {
    Completed(ReconciliationReport),
    GuiNotImplemented,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Path::new(DEFAULT_CONFIG_FILE);
    let config_file = config_path.exists().then_some(config_path);
    let config = load_config(config_file).context("failed to load configuration")?;
    logging::init(&config.telemetry, cli.debug)?;
    logging::config_loaded(config_file);

    let state = AppState::new(config);
    state.on_start();

    match dispatch(cli.mode(), &state).await? {
        RunOutcome::GuiNotImplemented => {
            warn!(target: "cli", "the graphical interface is not implemented yet, nothing to do");
        }
        RunOutcome::Completed(report) => {
            for line in ReportPresenter::summary(&report) {
                info!(target: "cli", "{}", line);
            }
        }
    }

    Ok(())
}

async fn dispatch(mode: RunMode, state: &AppState) -> Result<RunOutcome> {
    info!(target: "cli", ?mode, "starting");
    match mode {
        RunMode::Gui => Ok(RunOutcome::GuiNotImplemented),
        RunMode::Cli => run_cli(&state.config).await.map(RunOutcome::Completed),
    }
}

async fn run_cli(config: &AppConfig) -> Result<ReconciliationReport> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let callback_timeout = Duration::from_secs(config.http.callback_timeout_secs);

    let spotify_auth = SpotifyAuth::from_config(&config.spotify, http.clone())?;
    let spotify_cache = TokenCache::new("spotify", &config.spotify.token_cache_path);
    let spotify_token = authenticate(
        &spotify_auth,
        &spotify_cache,
        &config.spotify.oauth,
        callback_timeout,
    )
    .await
    .context("Spotify authorization failed")?;

    let deezer_auth = DeezerAuth::from_config(&config.deezer, http)?;
    let deezer_cache = TokenCache::new("deezer", &config.deezer.token_cache_path);
    let deezer_token = authenticate(
        &deezer_auth,
        &deezer_cache,
        &config.deezer.oauth,
        callback_timeout,
    )
    .await
    .context("Deezer authorization failed")?;

    let deezer = deezer_client(config, deezer_token)?;
    match deezer.current_user().await {
        Ok(user) => info!(target: "cli", user = %user.name, "Deezer token accepted"),
        Err(e) if e.is_auth_error() => {
            return Err(forget_rejected_token(&deezer_cache, "Deezer", e));
        }
        Err(e) => warn!(target: "cli", error = %e, "could not verify the Deezer token"),
    }

    let engine = ReconciliationEngine::new(spotify_client(config, spotify_token)?, deezer)
        .with_page_size(config.reconciliation.page_size);

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown(cancel.clone()));
    let outcome = fetch_and_reconcile(
        &engine,
        config.reconciliation.result_limit,
        &cancel,
        &spotify_cache,
    )
    .await;
    signal_task.abort();

    outcome
}

async fn fetch_and_reconcile(
    engine: &ReconciliationEngine<SpotifyClient, DeezerClient>,
    result_limit: i64,
    cancel: &CancellationToken,
    spotify_cache: &TokenCache,
) -> Result<ReconciliationReport> {
    let tracks = match engine.fetch(result_limit, cancel).await {
        Ok(tracks) => tracks,
        Err(ReconciliationError::Cancelled) => {
            return Ok(ReconciliationReport::cancelled_before_matching())
        }
        Err(e) if is_rejected_token(&e) => {
            return Err(forget_rejected_token(spotify_cache, "Spotify", e))
        }
        Err(e) => return Err(anyhow::Error::new(e).context("failed to fetch Spotify favorites")),
    };

    for line in ReportPresenter::track_table(&tracks) {
        info!(target: "cli", "{}", line);
    }

    Ok(engine.reconcile(tracks, cancel).await)
}

fn is_rejected_token(error: &ReconciliationError) -> bool {
    matches!(
        error.source_error::<SpotifyError>(),
        Some(SpotifyError::Unauthorized(_))
    )
}

/// Remove a cached token the service refused, so the next run authorizes again.
fn forget_rejected_token<E>(cache: &TokenCache, service: &str, error: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let path = cache.path().display();
    let hint = match cache.clear() {
        Ok(()) => format!("removed {path}, run again to authorize"),
        Err(e) => {
            warn!(target: "cli", service, error = %e, "failed to remove rejected token");
            format!("delete {path} and run again to authorize")
        }
    };
    anyhow::Error::new(error).context(format!("{service} rejected the cached token; {hint}"))
}

fn spotify_client(config: &AppConfig, token: String) -> Result<SpotifyClient> {
    SpotifyClient::builder(token)
        .base_url(config.spotify.api_base_url.clone())
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build Spotify client")
}

fn deezer_client(config: &AppConfig, token: String) -> Result<DeezerClient> {
    let deezer = &config.deezer;
    DeezerClient::builder()
        .base_url(deezer.api_base_url.clone())
        .access_token(token)
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .min_request_interval(Duration::from_millis(deezer.min_request_interval_ms))
        .quota_retry_policy(QuotaRetryPolicy {
            backoff: Duration::from_secs(deezer.quota_backoff_secs),
            max_retries: deezer.max_quota_retries,
        })
        .build()
        .context("failed to build Deezer client")
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    match shutdown_signal().await {
        Ok(()) => {
            info!(target: "cli", "shutdown signal received, stopping the run");
            cancel.cancel();
        }
        Err(e) => warn!(target: "cli", error = %e, "could not install signal handlers"),
    }
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
