//! Named loggers shared by the script loader, provider contexts and bridges.
//!
//! Every area of the crate owns a `LazyLock<Logger>` named `@identity-bridge/<area>`.
//! Records below the logger's level are dropped. A process-wide user handler can be
//! installed to forward records elsewhere (telemetry, test capture); it runs before
//! the default console/stdout output.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INSTANCES: LazyLock<Mutex<Vec<Weak<LoggerInner>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));
static USER_HANDLER: LazyLock<RwLock<Option<UserHandler>>> = LazyLock::new(|| RwLock::new(None));

pub type LogCallback = Arc<dyn Fn(&LogRecord) + Send + Sync + 'static>;

#[derive(Clone)]
struct UserHandler {
    callback: LogCallback,
    level: Option<LogLevel>,
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        let inner = Arc::new(LoggerInner {
            name: name.into(),
            log_level: AtomicU8::new(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
        });
        INSTANCES.lock().unwrap().push(Arc::downgrade(&inner));
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message.into(), None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into(), None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message.into(), None);
    }

    /// Logs a warning with a structured payload attached (an SDK response, an options object).
    pub fn warn_with(&self, message: impl Into<String>, detail: Value) {
        self.emit(LogLevel::Warn, message.into(), Some(detail));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into(), None);
    }

    fn emit(&self, level: LogLevel, message: String, detail: Option<Value>) {
        let record = LogRecord {
            level,
            logger: self.name().to_owned(),
            message,
            detail,
        };

        let user = USER_HANDLER.read().unwrap().clone();
        if let Some(handler) = user {
            let threshold = handler.level.unwrap_or_else(|| self.log_level());
            if level >= threshold && level != LogLevel::Silent {
                (handler.callback)(&record);
            }
        }

        if level < self.log_level() || level == LogLevel::Silent {
            return;
        }
        write_record(&record);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.log_level())
            .finish()
    }
}

/// A single emitted log line as seen by user handlers.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    pub detail: Option<Value>,
}

impl LogRecord {
    pub fn render(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} {}", self.message, detail),
            None => self.message.clone(),
        }
    }
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn write_record(record: &LogRecord) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let line = format!("[{}]  {}: {}", now, record.logger, record.render());
    match record.level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn write_record(record: &LogRecord) {
    use wasm_bindgen::JsValue;

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let line = JsValue::from_str(&format!("[{}]  {}: {}", now, record.logger, record.render()));
    match record.level {
        LogLevel::Warn => web_sys::console::warn_1(&line),
        LogLevel::Error => web_sys::console::error_1(&line),
        LogLevel::Debug => web_sys::console::debug_1(&line),
        _ => web_sys::console::log_1(&line),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Verbose,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "Invalid log level \"{level}\""),
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the level of every live logger and of loggers created afterwards.
pub fn set_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    let mut instances = INSTANCES.lock().unwrap();
    instances.retain(|weak| match weak.upgrade() {
        Some(inner) => {
            inner.log_level.store(level as u8, Ordering::SeqCst);
            true
        }
        None => false,
    });
}

/// Parses `level` (`"debug"`, `"warn"`, ...) and applies it with [`set_log_level`].
pub fn set_log_level_str(level: &str) -> Result<(), LogError> {
    set_log_level(level.parse()?);
    Ok(())
}

/// Installs (or clears, with `None`) the process-wide user handler.
///
/// When `level` is set it overrides each logger's own threshold for the handler.
pub fn set_user_log_handler<F>(callback: Option<F>, level: Option<LogLevel>)
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    *USER_HANDLER.write().unwrap() = callback.map(|callback| UserHandler {
        callback: Arc::new(callback),
        level,
    });
}

#[cfg(test)]
pub(crate) static TEST_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_logging() {
        set_log_level(LogLevel::Info);
        set_user_log_handler(None::<fn(&LogRecord)>, None);
    }

    fn capture(name: &'static str) -> Arc<Mutex<Vec<LogRecord>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        set_user_log_handler(
            Some(move |record: &LogRecord| {
                if record.logger == name {
                    sink.lock().unwrap().push(record.clone());
                }
            }),
            None,
        );
        records
    }

    #[test]
    fn records_below_level_are_dropped() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(|err| err.into_inner());
        reset_logging();
        let logger = Logger::new("@identity-bridge/level-test");
        let records = capture("@identity-bridge/level-test");

        set_log_level_str("warn").unwrap();
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");

        let levels: Vec<_> = records.lock().unwrap().iter().map(|r| r.level).collect();
        assert_eq!(levels, [LogLevel::Warn, LogLevel::Error]);
        reset_logging();
    }

    #[test]
    fn user_handler_level_overrides_logger_level() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(|err| err.into_inner());
        reset_logging();
        let logger = Logger::new("@identity-bridge/override-test");
        logger.set_log_level(LogLevel::Silent);

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        set_user_log_handler(
            Some(move |record: &LogRecord| {
                if record.logger == "@identity-bridge/override-test" {
                    sink.lock().unwrap().push(record.render());
                }
            }),
            Some(LogLevel::Debug),
        );

        logger.debug("hello");
        logger.warn_with("payload", serde_json::json!({"a": 1}));

        assert_eq!(
            records.lock().unwrap().as_slice(),
            ["hello".to_string(), "payload {\"a\":1}".to_string()]
        );
        reset_logging();
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
        assert!(matches!(
            "loud".parse::<LogLevel>(),
            Err(LogError::InvalidLogLevel(level)) if level == "loud"
        ));
    }
}
