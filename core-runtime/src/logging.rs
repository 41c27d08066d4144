//! # Logging Infrastructure
//!
//! Structured logging built on `tracing`, with an optional bridge that
//! forwards events to a host-provided [`LoggerSink`] (OSLog, Logcat, files).
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::logging::{self, LoggingConfig, LogFormat};
//!
//! logging::init(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level("debug"),
//! );
//!
//! tracing::info!(query = "added", "first page refreshed");
//! ```
//!
//! Initialization is process-global and idempotent in practice: a second
//! `init` call logs a warning to stderr instead of panicking.

use crate::error::{Error, Result};
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format for console logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output for development
    Pretty,
    /// Single-line JSON for log aggregation
    Json,
    /// Single-line human-readable output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Configuration for the logging subsystem.
pub struct LoggingConfig {
    /// Console output format
    pub format: LogFormat,
    /// Default level for core crates when no explicit filter is given
    pub level: String,
    /// Full filter directive string, overriding the default per-crate filter
    pub filter: Option<String>,
    /// Optional host sink receiving every log entry
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span open/close events in console output
    pub enable_spans: bool,
    /// Show the emitting module path
    pub display_target: bool,
    /// Show thread ids and names
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl std::fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    /// Sets the console output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the default level for core crates (`trace` through `error`).
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets a full filter directive string (same syntax as `RUST_LOG`).
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Installs a host sink that receives every log entry.
    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Enables span open/close events in console output.
    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.enable_spans = enabled;
        self
    }

    /// Shows or hides the emitting module path.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.display_target = enabled;
        self
    }

    /// Shows or hides thread ids and names.
    pub fn with_thread_info(mut self, enabled: bool) -> Self {
        self.display_thread_info = enabled;
        self
    }
}

/// Builds the level filter for the subscriber.
///
/// An explicit `filter` wins. Otherwise core crates log at the configured
/// level while chatty transport dependencies are capped at `warn`.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Some(ref directives) = config.filter {
        return EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));
    }

    let directives = format!(
        "warn,core_runtime={level},core_catalog={level},core_sync={level},\
         core_progress={level},core_service={level},provider_bookshelf={level},\
         bridge_native={level},h2=warn,hyper=warn,reqwest=warn,sqlx=warn",
        level = config.level
    );

    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes global logging, reporting failures to stderr.
///
/// Convenience wrapper around [`try_init`] for hosts that do not care about
/// double-initialization (tests, examples).
pub fn init(config: LoggingConfig) {
    if let Err(err) = try_init(config) {
        eprintln!("Failed to initialize logging: {err}");
    }
}

/// Initializes global logging.
///
/// # Errors
///
/// Returns [`Error::Internal`] when a global subscriber is already installed.
pub fn try_init(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config);
    let sink_layer = config
        .logger_sink
        .as_ref()
        .map(|sink| LoggerSinkLayer::new(Arc::clone(sink)));
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let install_error =
        |e: tracing_subscriber::util::TryInitError| Error::Internal(format!("{e}"));

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_span_events(span_events);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(sink_layer)
                .try_init()
                .map_err(install_error)?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_current_span(config.enable_spans)
                .with_span_list(config.enable_spans);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(sink_layer)
                .try_init()
                .map_err(install_error)?;
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_span_events(span_events);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(sink_layer)
                .try_init()
                .map_err(install_error)?;
        }
    }

    Ok(())
}

/// Layer forwarding `tracing` events to a host [`LoggerSink`].
///
/// Events below the sink's minimum level are dropped before any allocation
/// beyond field collection. Fields with sensitive names are redacted via
/// [`redact_if_sensitive`] before the entry leaves the core. Delivery is
/// spawned on the current Tokio runtime when one exists; otherwise the entry
/// is delivered inline.
struct LoggerSinkLayer {
    sink: Arc<dyn LoggerSink>,
}

impl LoggerSinkLayer {
    fn new(sink: Arc<dyn LoggerSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = tracing_level_to_log_level(metadata.level());
        if level < self.sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let mut entry = LogEntry::new(
            level,
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        entry.fields = visitor.fields;

        let sink = Arc::clone(&self.sink);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink delivery failed: {err}");
                }
            });
        } else if let Err(err) = futures::executor::block_on(sink.log(entry)) {
            eprintln!("LoggerSink delivery failed: {err}");
        }
    }
}

fn tracing_level_to_log_level(level: &tracing::Level) -> LogLevel {
    if *level == tracing::Level::ERROR {
        LogLevel::Error
    } else if *level == tracing::Level::WARN {
        LogLevel::Warn
    } else if *level == tracing::Level::INFO {
        LogLevel::Info
    } else if *level == tracing::Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

/// Collects event fields into a [`LogEntry`].
#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &tracing::field::Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            // Host sinks may persist entries; sensitive fields never cross raw.
            let value = redact_if_sensitive(field.name(), &value);
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl tracing::field::Visit for SinkVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.record_value(field, value.to_string());
    }
}

/// Field names whose values must never reach logs verbatim.
const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "password",
    "secret",
    "authorization",
    "api_key",
    "cookie",
];

/// Redacts a field value when its name marks it as sensitive.
///
/// Token-like fields are replaced entirely; email-like fields keep the first
/// character and the domain.
pub fn redact_if_sensitive(field: &str, value: &str) -> String {
    let lowered = field.to_ascii_lowercase();
    if SENSITIVE_FIELDS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return "[REDACTED]".to_string();
    }
    if lowered.contains("email") {
        return redact_email(value);
    }
    value.to_string()
}

fn redact_email(value: &str) -> String {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let mut redacted = String::new();
            if let Some(first) = local.chars().next() {
                redacted.push(first);
            }
            format!("{redacted}***@{domain}")
        }
        _ => "[REDACTED]".to_string(),
    }
}

/// Reduces a filesystem path to its final component for logging.
pub fn strip_path(value: &str) -> String {
    std::path::Path::new(value)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestLoggerSink {
        min_level: LogLevel,
        entries: Mutex<Vec<LogEntry>>,
    }

    impl TestLoggerSink {
        fn new(min_level: LogLevel) -> Self {
            Self {
                min_level,
                entries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> bridge_traits::error::Result<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            self.min_level
        }
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.filter.is_none());
        assert!(config.logger_sink.is_none());
        if cfg!(debug_assertions) {
            assert_eq!(config.format, LogFormat::Pretty);
        } else {
            assert_eq!(config.format, LogFormat::Json);
        }
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level("trace")
            .with_filter("core_sync=debug")
            .with_spans(true)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, "trace");
        assert_eq!(config.filter.as_deref(), Some("core_sync=debug"));
        assert!(config.enable_spans);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_build_filter_prefers_explicit_directives() {
        let config = LoggingConfig::default().with_filter("core_sync=trace");
        let filter = build_filter(&config);
        assert!(format!("{filter}").contains("core_sync"));
    }

    #[test]
    fn test_build_filter_caps_transport_noise() {
        let config = LoggingConfig::default().with_level("debug");
        let filter = build_filter(&config);
        let rendered = format!("{filter}");
        assert!(rendered.contains("sqlx"));
        assert!(rendered.contains("core_progress"));
    }

    #[test]
    fn test_logger_sink_layer_forwards_events() {
        let sink = Arc::new(TestLoggerSink::new(LogLevel::Trace));
        let layer = LoggerSinkLayer::new(sink.clone() as Arc<dyn LoggerSink>);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(item_id = "li_9", page = 2u32, "status resolved");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "status resolved");
        assert_eq!(entries[0].fields.get("item_id"), Some(&"li_9".to_string()));
        assert_eq!(entries[0].fields.get("page"), Some(&"2".to_string()));
    }

    #[test]
    fn test_logger_sink_layer_redacts_sensitive_fields() {
        let sink = Arc::new(TestLoggerSink::new(LogLevel::Trace));
        let layer = LoggerSinkLayer::new(sink.clone() as Arc<dyn LoggerSink>);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(token = "abc123", item_id = "li_9", "session refreshed");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].fields.get("token"),
            Some(&"[REDACTED]".to_string())
        );
        assert_eq!(entries[0].fields.get("item_id"), Some(&"li_9".to_string()));
    }

    #[test]
    fn test_logger_sink_layer_respects_min_level() {
        let sink = Arc::new(TestLoggerSink::new(LogLevel::Warn));
        let layer = LoggerSinkLayer::new(sink.clone() as Arc<dyn LoggerSink>);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("dropped");
            tracing::error!("kept");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
        assert_eq!(entries[0].level, LogLevel::Error);
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(
            tracing_level_to_log_level(&tracing::Level::ERROR),
            LogLevel::Error
        );
        assert_eq!(
            tracing_level_to_log_level(&tracing::Level::TRACE),
            LogLevel::Trace
        );
    }

    #[test]
    fn test_redact_token_fields() {
        assert_eq!(redact_if_sensitive("api_token", "abc123"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("page", "2"), "2");
    }

    #[test]
    fn test_redact_email_keeps_domain() {
        assert_eq!(
            redact_if_sensitive("user_email", "alice@example.com"),
            "a***@example.com"
        );
        assert_eq!(redact_if_sensitive("email", "not-an-email"), "[REDACTED]");
    }

    #[test]
    fn test_strip_path_keeps_file_name() {
        assert_eq!(strip_path("/data/app/library.db"), "library.db");
        assert_eq!(strip_path("library.db"), "library.db");
    }
}
