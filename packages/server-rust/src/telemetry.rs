//! Tracing subscriber setup, named loggers and runtime log-level control.
//!
//! The server has three named loggers, each mapped onto a tracing target:
//! `request` (`calc::request`), `stack` (`calc::stack`) and `independent`
//! (`calc::independent`). Their levels live in [`LogLevels`], which
//! rebuilds the global `EnvFilter` through a `reload` handle whenever a
//! level changes.
//!
//! With a log directory configured, each logger also writes its own file
//! (`requests.log`, `stack.log`, `independent.log`). The console then keeps
//! request and general output only.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use calc_core::{INDEPENDENT_TARGET, STACK_TARGET};
use metrics_exporter_prometheus::PrometheusBuilder;
use parking_lot::RwLock;
use tracing::level_filters::LevelFilter;
use tracing::{info, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Layer, Registry};

/// Tracing target of the per-request logger.
pub const REQUEST_TARGET: &str = "calc::request";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the log-level endpoints and filter reloads.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Error: missing query parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("Error: unknown logger: {0}")]
    UnknownLogger(String),
    #[error("Error: unknown log level: {0}")]
    UnknownLevel(String),
    #[error("failed to apply log filter: {0}")]
    Filter(String),
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// A named logger whose level can be changed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logger {
    Request,
    Stack,
    Independent,
}

impl Logger {
    pub const ALL: [Self; 3] = [Self::Request, Self::Stack, Self::Independent];

    #[must_use]
    pub fn target(self) -> &'static str {
        match self {
            Self::Request => REQUEST_TARGET,
            Self::Stack => STACK_TARGET,
            Self::Independent => INDEPENDENT_TARGET,
        }
    }

    #[must_use]
    pub fn default_level(self) -> LevelFilter {
        match self {
            Self::Request | Self::Stack => LevelFilter::INFO,
            Self::Independent => LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Request => "request-logger",
            Self::Stack => "stack-logger",
            Self::Independent => "independent-logger",
        }
    }

    /// File this logger writes inside the log directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Request => "requests.log",
            Self::Stack => "stack.log",
            Self::Independent => "independent.log",
        }
    }

    /// Whether events with `target` belong to this logger.
    fn owns(self, target: &str) -> bool {
        target.starts_with(self.target())
    }
}

impl fmt::Display for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Logger {
    type Err = TelemetryError;

    /// Accepts both the short (`stack`) and the long (`stack-logger`) form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let short = lowered.strip_suffix("-logger").unwrap_or(&lowered);
        match short {
            "request" => Ok(Self::Request),
            "stack" => Ok(Self::Stack),
            "independent" => Ok(Self::Independent),
            _ => Err(TelemetryError::UnknownLogger(s.to_string())),
        }
    }
}

/// Parses a level name (`ERROR`, `warn`, `Info`, `DEBUG`, `trace`, `off`).
///
/// # Errors
///
/// Returns [`TelemetryError::UnknownLevel`] for anything else, including
/// the numeric forms `LevelFilter` would otherwise accept.
pub fn parse_level(raw: &str) -> Result<LevelFilter, TelemetryError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "OFF" => Ok(LevelFilter::OFF),
        "ERROR" => Ok(LevelFilter::ERROR),
        "WARN" => Ok(LevelFilter::WARN),
        "INFO" => Ok(LevelFilter::INFO),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "TRACE" => Ok(LevelFilter::TRACE),
        _ => Err(TelemetryError::UnknownLevel(raw.to_string())),
    }
}

/// Upper-case name of a level, as reported by the log-level endpoints.
#[must_use]
pub fn level_name(level: LevelFilter) -> &'static str {
    match level.into_level() {
        None => "OFF",
        Some(tracing::Level::ERROR) => "ERROR",
        Some(tracing::Level::WARN) => "WARN",
        Some(tracing::Level::INFO) => "INFO",
        Some(tracing::Level::DEBUG) => "DEBUG",
        Some(tracing::Level::TRACE) => "TRACE",
    }
}

// ---------------------------------------------------------------------------
// LogLevels
// ---------------------------------------------------------------------------

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Current level of every named logger, plus the filter for everything else.
pub struct LogLevels {
    default_directive: String,
    levels: RwLock<HashMap<Logger, LevelFilter>>,
    handle: Option<FilterHandle>,
}

impl LogLevels {
    /// Levels that are tracked but not wired to a subscriber.
    #[must_use]
    pub fn detached(default_directive: impl Into<String>) -> Self {
        Self {
            default_directive: default_directive.into(),
            levels: RwLock::new(
                Logger::ALL
                    .into_iter()
                    .map(|logger| (logger, logger.default_level()))
                    .collect(),
            ),
            handle: None,
        }
    }

    /// Current level of `logger`.
    #[must_use]
    pub fn level(&self, logger: Logger) -> LevelFilter {
        self.levels
            .read()
            .get(&logger)
            .copied()
            .unwrap_or_else(|| logger.default_level())
    }

    /// Sets the level of `logger` and reloads the subscriber filter.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Filter`] if the rebuilt filter cannot be
    /// parsed or installed. The previous level is kept in that case.
    pub fn set_level(&self, logger: Logger, level: LevelFilter) -> Result<LevelFilter, TelemetryError> {
        let mut levels = self.levels.write();
        let previous = levels.insert(logger, level);
        let applied = Self::build_filter(&self.default_directive, &levels).and_then(|filter| {
            match &self.handle {
                Some(handle) => handle
                    .reload(filter)
                    .map_err(|e| TelemetryError::Filter(e.to_string())),
                None => Ok(()),
            }
        });
        if let Err(err) = applied {
            match previous {
                Some(previous) => levels.insert(logger, previous),
                None => levels.remove(&logger),
            };
            return Err(err);
        }
        drop(levels);

        info!(logger = logger.name(), level = level_name(level), "log level changed");
        Ok(level)
    }

    /// Filter directives for the current levels.
    #[must_use]
    pub fn directives(&self) -> String {
        Self::render_directives(&self.default_directive, &self.levels.read())
    }

    fn render_directives(default_directive: &str, levels: &HashMap<Logger, LevelFilter>) -> String {
        let mut directives = vec![default_directive.to_string()];
        for logger in Logger::ALL {
            let level = levels
                .get(&logger)
                .copied()
                .unwrap_or_else(|| logger.default_level());
            directives.push(format!(
                "{}={}",
                logger.target(),
                level_name(level).to_ascii_lowercase()
            ));
        }
        directives.join(",")
    }

    fn build_filter(
        default_directive: &str,
        levels: &HashMap<Logger, LevelFilter>,
    ) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(Self::render_directives(default_directive, levels))
            .map_err(|e| TelemetryError::Filter(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// The registry under the reloadable filter; file layers stack onto it.
type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;

/// Background writers of the per-logger files. Dropping this flushes them.
#[must_use = "dropping the guard stops the log file writers"]
pub struct LogFiles {
    _guards: Vec<WorkerGuard>,
}

/// One plain-text fmt layer per named logger, each writing
/// `<dir>/<logger file>` and seeing only that logger's events.
///
/// Spans pass every filter so lines keep their request context.
///
/// # Errors
///
/// Fails if the directory or a log file cannot be created.
pub fn file_layers<S>(dir: &Path) -> anyhow::Result<(Vec<BoxedLayer<S>>, LogFiles)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)?;
    let mut layers = Vec::with_capacity(Logger::ALL.len());
    let mut guards = Vec::with_capacity(Logger::ALL.len());

    for logger in Logger::ALL {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(logger.file_name())
            .build(dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter_fn(move |metadata| {
                    metadata.is_span() || logger.owns(metadata.target())
                }))
                .boxed(),
        );
        guards.push(guard);
    }

    Ok((layers, LogFiles { _guards: guards }))
}

/// Whether the console shows an event. Stack and independent events go to
/// their files only once files are enabled.
fn console_shows(metadata: &Metadata<'_>, files_enabled: bool) -> bool {
    !files_enabled || metadata.is_span() || !is_file_only(metadata.target())
}

fn is_file_only(target: &str) -> bool {
    Logger::Stack.owns(target) || Logger::Independent.owns(target)
}

/// Installs the global subscriber: a reloadable `EnvFilter` over a plain
/// or JSON console layer, plus the per-logger files when `log_dir` is set.
/// Returns the level table bound to the filter and the file writer guard.
///
/// # Errors
///
/// Fails if `default_directive` is not a valid filter, the log files
/// cannot be created, or a global subscriber is already installed.
pub fn init_tracing(
    format: LogFormat,
    default_directive: &str,
    log_dir: Option<&Path>,
) -> anyhow::Result<(Arc<LogLevels>, Option<LogFiles>)> {
    let mut levels = LogLevels::detached(default_directive);
    let filter = LogLevels::build_filter(default_directive, &levels.levels.read())?;
    let (filter, handle) = reload::Layer::new(filter);
    levels.handle = Some(handle);

    let files_enabled = log_dir.is_some();
    let (json, plain) = match format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(filter_fn(move |m| console_shows(m, files_enabled))),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_filter(filter_fn(move |m| console_shows(m, files_enabled))),
            ),
        ),
    };

    let (files, guard) = match log_dir {
        Some(dir) => {
            let (layers, guard) = file_layers::<FilteredRegistry>(dir)?;
            (layers, Some(guard))
        }
        None => (Vec::new(), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(files)
        .with(json)
        .with(plain)
        .try_init()?;

    if let Some(dir) = log_dir {
        info!("Writing logger files to {}", dir.display());
    }
    Ok((Arc::new(levels), guard))
}

/// Starts the Prometheus scrape endpoint and installs it as the global
/// `metrics` recorder.
///
/// # Errors
///
/// Fails if the listener cannot be bound or a recorder is already installed.
pub fn install_prometheus_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Prometheus metrics exporter listening on {addr}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_names_parse_in_both_forms() {
        assert_eq!("stack".parse::<Logger>().unwrap(), Logger::Stack);
        assert_eq!("Stack-Logger".parse::<Logger>().unwrap(), Logger::Stack);
        assert_eq!(
            "request-logger".parse::<Logger>().unwrap(),
            Logger::Request
        );
        assert_eq!(
            "independent".parse::<Logger>().unwrap(),
            Logger::Independent
        );
        let err = "audit".parse::<Logger>().unwrap_err();
        assert_eq!(err.to_string(), "Error: unknown logger: audit");
    }

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("Off").unwrap(), LevelFilter::OFF);
        assert!(parse_level("3").is_err());
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn level_names_are_upper_case() {
        assert_eq!(level_name(LevelFilter::INFO), "INFO");
        assert_eq!(level_name(LevelFilter::OFF), "OFF");
        assert_eq!(level_name(LevelFilter::TRACE), "TRACE");
    }

    #[test]
    fn defaults_per_logger() {
        let levels = LogLevels::detached("info");
        assert_eq!(levels.level(Logger::Request), LevelFilter::INFO);
        assert_eq!(levels.level(Logger::Stack), LevelFilter::INFO);
        assert_eq!(levels.level(Logger::Independent), LevelFilter::DEBUG);
        assert_eq!(
            levels.directives(),
            "info,calc::request=info,calc::stack=info,calc::independent=debug"
        );
    }

    #[test]
    fn set_level_updates_directives() {
        let levels = LogLevels::detached("warn");
        let applied = levels.set_level(Logger::Stack, LevelFilter::TRACE).unwrap();
        assert_eq!(applied, LevelFilter::TRACE);
        assert_eq!(levels.level(Logger::Stack), LevelFilter::TRACE);
        assert!(levels.directives().contains("calc::stack=trace"));
    }

    #[test]
    fn each_logger_writes_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let (layers, files) = file_layers::<Registry>(dir.path()).unwrap();
        let subscriber = tracing_subscriber::registry().with(layers);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(target: REQUEST_TARGET, "request", number = 7_u64);
            let _entered = span.enter();
            tracing::info!(target: REQUEST_TARGET, "Incoming request | #7");
            tracing::info!(target: STACK_TARGET, "Stack size is 2");
            tracing::debug!(target: INDEPENDENT_TARGET, "Performing operation plus");
            tracing::info!(target: "calc_server::other", "unrelated");
        });
        drop(files);

        let read = |logger: Logger| {
            std::fs::read_to_string(dir.path().join(logger.file_name())).unwrap()
        };
        let requests = read(Logger::Request);
        let stack = read(Logger::Stack);
        let independent = read(Logger::Independent);

        assert!(requests.contains("Incoming request | #7"));
        assert!(!requests.contains("Stack size"));
        assert!(stack.contains("Stack size is 2"));
        assert!(stack.contains("number=7"));
        assert!(!stack.contains("Incoming request"));
        assert!(independent.contains("Performing operation plus"));
        assert!(!independent.contains("unrelated"));
    }

    #[test]
    fn stack_and_independent_are_file_only() {
        assert!(is_file_only(STACK_TARGET));
        assert!(is_file_only(INDEPENDENT_TARGET));
        assert!(!is_file_only(REQUEST_TARGET));
        assert!(!is_file_only("calc_server::network"));
    }

    #[test]
    fn invalid_default_directive_keeps_previous_level() {
        let levels = LogLevels::detached("calc=verbose");
        assert!(levels.set_level(Logger::Request, LevelFilter::ERROR).is_err());
        assert_eq!(levels.level(Logger::Request), LevelFilter::INFO);
    }
}
