// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Subscriber setup for hosts embedding the engine.
//!
//! The engine itself only emits through `tracing` (walk traces under
//! `cucumber::walk`, debug blocks under `cucumber::debug`, reconnect
//! warnings under `cucumber::reconnect`); this module turns a small YAML
//! config into a process-wide subscriber that routes those targets
//! somewhere useful. `trace_walk` force-enables the walk target so the
//! per-call `verbose` option is visible without touching the base filter.

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use fastrace::collector::{Config, ConsoleReporter};
use serde::Deserialize;
use serde_json::json;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{Event, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{
        self, FmtContext, FormatEvent, FormatFields,
        format::{JsonFields, Writer},
        writer::BoxMakeWriter,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
};

#[derive(Debug, Deserialize, Clone)]
struct LoggerConfig {
    logger: EngineLogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum Output {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum RotationFreq {
    Minutely,
    Hourly,
    Daily,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
struct EngineLogFile {
    path: String,
    #[serde(default)]
    rotation: Option<RotationFreq>,
}

/// Logging configuration for a host process.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineLogConfig {
    /// Base filter, e.g. `info` or `cucumber_rs=debug`.
    level: String,
    output: Output,
    /// Include the event target in every line.
    #[serde(default)]
    show_target: bool,
    /// Force `cucumber::walk=debug` on top of the base filter.
    #[serde(default)]
    trace_walk: bool,
    #[serde(default)]
    file: Option<EngineLogFile>,
}

/// One JSON object per event: timestamp, level, optional target, the
/// message, and remaining structured fields under `fields`.
struct WalkFormatter {
    show_target: bool,
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl FieldCollector {
    fn put(&mut self, name: &str, value: serde_json::Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl tracing::field::Visit for FieldCollector {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.put(field.name(), json!(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.put(field.name(), json!(value));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.put(field.name(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.put(field.name(), json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.put(field.name(), json!(value));
    }
}

impl<S, N> FormatEvent<S, N> for WalkFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let mut line = serde_json::Map::new();
        line.insert("ts".to_string(), json!(Utc::now().to_rfc3339()));
        line.insert(
            "level".to_string(),
            json!(event.metadata().level().to_string()),
        );
        if self.show_target {
            line.insert("target".to_string(), json!(event.metadata().target()));
        }
        line.insert("message".to_string(), json!(visitor.message));
        if !visitor.fields.is_empty() {
            line.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        writeln!(writer, "{}", serde_json::Value::Object(line))
    }
}

/// Install the process-wide subscriber from a YAML config file. The
/// returned guard must stay alive for the non-blocking writer to flush.
pub fn init_logger(config_path: &str) -> Result<WorkerGuard> {
    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read logger config {config_path}"))?;
    let config: LoggerConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse logger config {config_path}"))?;
    let config = config.logger;

    let (writer, guard) = make_writer(&config)?;

    fastrace::set_reporter(ConsoleReporter, Config::default());
    let compat_layer = fastrace_tracing::FastraceCompatLayer::new();

    let mut env_filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level from config or env")?;
    if config.trace_walk {
        env_filter = env_filter.add_directive(
            "cucumber::walk=debug"
                .parse()
                .context("bad walk-trace directive")?,
        );
    }

    let json_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .event_format(WalkFormatter { show_target: config.show_target })
        .fmt_fields(JsonFields::default());

    let subscriber = Registry::default()
        .with(env_filter)
        .with(compat_layer)
        .with(json_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the global subscriber")?;

    Ok(guard)
}

fn make_writer(cfg: &EngineLogConfig) -> Result<(BoxMakeWriter, WorkerGuard)> {
    Ok(match cfg.output {
        Output::Stdout => {
            let (w, g) = tracing_appender::non_blocking(std::io::stdout());
            (BoxMakeWriter::new(w), g)
        },
        Output::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (BoxMakeWriter::new(w), g)
        },
        Output::File => {
            let fcfg = cfg
                .file
                .as_ref()
                .context("logger.file is required for output=file")?;
            let path = PathBuf::from(&fcfg.path);
            let rotation = match fcfg.rotation.clone().unwrap_or(RotationFreq::Never)
            {
                RotationFreq::Minutely => Rotation::MINUTELY,
                RotationFreq::Hourly => Rotation::HOURLY,
                RotationFreq::Daily => Rotation::DAILY,
                RotationFreq::Never => Rotation::NEVER,
            };

            let appender = RollingFileAppender::new(
                rotation,
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_default(),
            );
            let (w, g) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(w), g)
        },
    })
}

/// Dump diagnostic text (a JSON projection, a debug block) to a file,
/// creating parent directories as needed.
pub async fn save_dump<P: AsRef<Path>, C: AsRef<[u8]>>(
    file_name: P,
    content: C,
) -> Result<()> {
    if let Some(parent_dir) = file_name.as_ref().parent() {
        tokio::fs::create_dir_all(parent_dir)
            .await
            .context("Failed to create directory for the file")?;
    }

    let mut file = File::create(&file_name)
        .await
        .context("Failed to create file")?;
    file.write_all(content.as_ref())
        .await
        .context("Failed to write content to file")?;

    Ok(())
}
