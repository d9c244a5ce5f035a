// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use chrono::Local;
use reprise_config::TelemetryConfig;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Event, Subscriber};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

type FileLayer<S> = fmt_layer::Layer<S, DefaultFields, LineFormat, Mutex<File>>;

/// `2024-01-31 18:04:05,123 | deezer - WARN: message key=value`
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "{} | {} - {}: ",
            Local::now().format(TIMESTAMP_FORMAT),
            metadata.target(),
            metadata.level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `--debug` wins over `RUST_LOG`, which wins over the configured level.
pub fn env_filter(configured_level: &str, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Plain-text layer for the log file; escape codes only belong on a terminal.
fn file_layer<S>(file: File) -> FileLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt_layer::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
}

/// Install the global subscriber: every line goes to the log file, and to stderr when enabled.
pub fn init(telemetry: &TelemetryConfig, debug: bool) -> Result<()> {
    let file = open_log_file(Path::new(&telemetry.log_file))
        .with_context(|| format!("failed to open log file {}", telemetry.log_file))?;

    let console_layer = telemetry.console.then(|| {
        fmt_layer::layer()
            .event_format(LineFormat)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter(&telemetry.log_level, debug))
        .with(file_layer(file))
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// Reported once the subscriber exists, since configuration is read before it.
pub fn config_loaded(config_file: Option<&Path>) {
    match config_file {
        Some(path) => info!(target: "config", file = %path.display(), "configuration loaded"),
        None => info!(target: "config", "configuration loaded from defaults and environment"),
    }
}
