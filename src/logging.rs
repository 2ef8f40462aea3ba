//! Kernel log output.
//!
//! The kernel formats its own log lines and hands them to every open
//! [`LoggingConnection`]. Lines logged before the first connection is
//! created are buffered by the kernel and replayed to it. The settings
//! functions in this module are process-wide and affect every connection.

use std::fmt;
use std::os::raw::{c_char, c_void};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::ffi::{self, cast_string, kinds, CallbackRegistry, Owned, Token};
use crate::types::{LogCategory, LogLevel, LoggingOptions};

/// Target used for kernel lines forwarded to the `log` crate.
pub const KERNEL_LOG_TARGET: &str = "bitcoinkernel::kernel";

type LogFn = dyn Fn(&str) + Send + Sync;

static REGISTRY: LazyLock<CallbackRegistry<Box<LogFn>>> =
    LazyLock::new(|| CallbackRegistry::new("logging"));

/// Receives kernel log lines until dropped.
///
/// # Example
///
/// ```no_run
/// use bitcoinkernel::{LoggingConnection, LoggingOptions};
///
/// # fn example() -> bitcoinkernel::Result<()> {
/// // Print raw lines
/// let _raw = LoggingConnection::new(|line| print!("{line}"))?;
///
/// // Or route them through the `log` crate
/// let _forwarded = LoggingConnection::forward_to_log(LoggingOptions::default())?;
/// # Ok(())
/// # }
/// ```
pub struct LoggingConnection {
    inner: Owned<kinds::LoggingConnection>,
}

impl LoggingConnection {
    /// Connect `callback` to the kernel logger.
    ///
    /// The callback runs on whichever kernel thread logged the line. The
    /// line includes its trailing newline.
    pub fn new<F>(callback: F) -> Result<Self>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let api = ffi::try_api()?;
        let token = REGISTRY.register(Box::new(callback));
        let ptr = unsafe {
            api.btck_logging_connection_create(Some(log_bridge), token.as_user_data(), Some(destroy_bridge))
        };
        if ptr.is_null() {
            REGISTRY.remove(token);
            return Err(Error::Internal("failed to create logging connection".to_string()));
        }
        Ok(Self {
            inner: unsafe { Owned::from_raw(ptr) },
        })
    }

    /// Apply `options` and re-emit every kernel line through the `log`
    /// crate under [`KERNEL_LOG_TARGET`], at the level the line carries.
    ///
    /// Lines that do not match the expected layout are emitted verbatim at
    /// `info`.
    pub fn forward_to_log(options: LoggingOptions) -> Result<Self> {
        let parser = LogParser::new(options)?;
        set_logging_options(options)?;
        Self::new(move |line| parser.forward(line))
    }

    /// Disconnect. Dropping the connection does the same.
    pub fn disconnect(mut self) {
        self.inner.release();
    }
}

impl fmt::Debug for LoggingConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConnection")
            .field("connected", &!self.inner.is_released())
            .finish()
    }
}

unsafe impl Send for LoggingConnection {}
unsafe impl Sync for LoggingConnection {}

unsafe extern "C" fn destroy_bridge(user_data: *mut c_void) {
    REGISTRY.unregister(Token::from_user_data(user_data));
}

unsafe extern "C" fn log_bridge(user_data: *mut c_void, message: *const c_char, message_len: usize) {
    let message = cast_string(message, message_len);
    REGISTRY.dispatch(user_data, "log line", |callback| callback(&message));
}

/// Set the layout of kernel log lines.
pub fn set_logging_options(options: LoggingOptions) -> Result<()> {
    let api = ffi::try_api()?;
    unsafe { api.btck_logging_set_options(options.to_native()) };
    Ok(())
}

/// Set the minimum level logged for `category`.
///
/// [`LogCategory::All`] sets the global level. Categories below `info` must
/// also be enabled with [`enable_log_category`] to produce output.
pub fn set_log_level(category: LogCategory, level: LogLevel) -> Result<()> {
    let api = ffi::try_api()?;
    unsafe { api.btck_logging_set_level_category(category.into(), level.into()) };
    Ok(())
}

/// Enable debug and trace output for `category`.
pub fn enable_log_category(category: LogCategory) -> Result<()> {
    let api = ffi::try_api()?;
    unsafe { api.btck_logging_enable_category(category.into()) };
    Ok(())
}

/// Disable debug and trace output for `category`.
pub fn disable_log_category(category: LogCategory) -> Result<()> {
    let api = ffi::try_api()?;
    unsafe { api.btck_logging_disable_category(category.into()) };
    Ok(())
}

/// Permanently stop kernel logging and drop buffered lines.
///
/// Must not be called while a [`LoggingConnection`] exists.
pub fn disable_logging() -> Result<()> {
    let api = ffi::try_api()?;
    unsafe { api.btck_logging_disable() };
    Ok(())
}

/// A kernel log line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// ISO 8601 time the line was logged, when `log_timestamps` is set.
    pub timestamp: Option<String>,
    /// Name of the logging thread, when `log_threadnames` is set.
    pub thread: Option<String>,
    /// Source file, when `log_sourcelocations` is set.
    pub file: Option<String>,
    /// Line in [`file`](Self::file).
    pub line: Option<u32>,
    /// Function that logged the line.
    pub function: Option<String>,
    /// Category name such as `validation`, when
    /// `always_print_category_levels` is set.
    pub category: Option<String>,
    /// Severity. Lines without a category level are `Info`.
    pub level: log::Level,
    /// The text after all prefixes, without the trailing newline.
    pub message: String,
}

/// Parses lines formatted with a given set of [`LoggingOptions`].
///
/// The kernel layout is
/// `[timestamp] [[thread]] [[file:line] [function]] [[category:level]] message`
/// where each bracketed part is only present when its option is set.
#[derive(Debug, Clone)]
pub struct LogParser {
    pattern: Regex,
}

impl LogParser {
    /// Build a parser for lines laid out according to `options`.
    ///
    /// Only the prefixes enabled in `options` are expected, and all of them
    /// must be present for a line to match. `log_time_micros` needs no
    /// separate handling since fractional seconds are always accepted.
    pub fn new(options: LoggingOptions) -> Result<Self> {
        let mut pattern = String::from("^");
        if options.log_timestamps {
            pattern.push_str(r"(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?)\s+");
        }
        if options.log_threadnames {
            pattern.push_str(r"\[(?P<thread>[^\]]+)\]\s+");
        }
        if options.log_sourcelocations {
            pattern.push_str(r"\[(?P<file>[^\]]+):(?P<line>\d+)\]\s+\[(?P<function>[^\]]+)\]\s+");
        }
        if options.always_print_category_levels {
            pattern.push_str(r"\[(?P<category>[^:\]]+):(?P<level>[^\]]+)\]\s+");
        }
        pattern.push_str(r"(?P<message>.*)$");

        let pattern = Regex::new(&pattern).map_err(|e| Error::Internal(format!("log pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Split `line` into its parts, or `None` if it does not match.
    pub fn parse(&self, line: &str) -> Option<LogEntry> {
        let caps = self.pattern.captures(line.trim())?;
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        let line_number = match caps.name("line") {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };

        Some(LogEntry {
            timestamp: text("timestamp"),
            thread: text("thread"),
            file: text("file"),
            line: line_number,
            function: text("function"),
            category: text("category"),
            level: caps.name("level").map_or(log::Level::Info, |m| parse_level(m.as_str())),
            message: caps.name("message").map_or("", |m| m.as_str()).trim().to_string(),
        })
    }

    fn forward(&self, line: &str) {
        match self.parse(line) {
            Some(entry) => match &entry.category {
                Some(category) => {
                    log::log!(target: KERNEL_LOG_TARGET, entry.level, "[{}] {}", category, entry.message)
                }
                None => log::log!(target: KERNEL_LOG_TARGET, entry.level, "{}", entry.message),
            },
            None => log::info!(target: KERNEL_LOG_TARGET, "{}", line.trim_end()),
        }
    }
}

fn parse_level(level: &str) -> log::Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "warning" | "warn" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn all_options() -> LoggingOptions {
        LoggingOptions {
            log_timestamps: true,
            log_time_micros: true,
            log_threadnames: true,
            log_sourcelocations: true,
            always_print_category_levels: true,
        }
    }

    #[test]
    fn test_parse_full_line() {
        let parser = LogParser::new(all_options()).unwrap();
        let entry = parser
            .parse(
                "2025-03-14T09:26:53.589793Z [initload] [src/validation.cpp:4521] \
                 [LoadBlockIndex] [validation:debug] Loaded 1 block index entries\n",
            )
            .unwrap();

        assert_eq!(entry.timestamp.as_deref(), Some("2025-03-14T09:26:53.589793Z"));
        assert_eq!(entry.thread.as_deref(), Some("initload"));
        assert_eq!(entry.file.as_deref(), Some("src/validation.cpp"));
        assert_eq!(entry.line, Some(4521));
        assert_eq!(entry.function.as_deref(), Some("LoadBlockIndex"));
        assert_eq!(entry.category.as_deref(), Some("validation"));
        assert_eq!(entry.level, log::Level::Debug);
        assert_eq!(entry.message, "Loaded 1 block index entries");
    }

    #[test]
    fn test_parse_default_layout() {
        let parser = LogParser::new(LoggingOptions::default()).unwrap();
        let entry = parser
            .parse("2025-03-14T09:26:53Z Using 16 MiB for in-memory UTXO set\n")
            .unwrap();

        assert_eq!(entry.timestamp.as_deref(), Some("2025-03-14T09:26:53Z"));
        assert_eq!(entry.thread, None);
        assert_eq!(entry.line, None);
        assert_eq!(entry.level, log::Level::Info);
        assert_eq!(entry.message, "Using 16 MiB for in-memory UTXO set");
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        let parser = LogParser::new(all_options()).unwrap();
        assert!(parser.parse("just a message").is_none());
    }

    #[test]
    fn test_parse_without_timestamp() {
        let options = LoggingOptions {
            log_timestamps: false,
            always_print_category_levels: true,
            ..LoggingOptions::default()
        };
        let parser = LogParser::new(options).unwrap();
        let entry = parser.parse("[blockstorage:warning] Low disk space").unwrap();
        assert_eq!(entry.category.as_deref(), Some("blockstorage"));
        assert_eq!(entry.level, log::Level::Warn);
        assert_eq!(entry.message, "Low disk space");
    }

    #[test]
    fn test_level_names() {
        assert_eq!(parse_level("trace"), log::Level::Trace);
        assert_eq!(parse_level("DEBUG"), log::Level::Debug);
        assert_eq!(parse_level("info"), log::Level::Info);
        assert_eq!(parse_level("warning"), log::Level::Warn);
        assert_eq!(parse_level("error"), log::Level::Error);
        assert_eq!(parse_level("chatty"), log::Level::Info);
    }

    #[test]
    fn test_log_bridge_delivers_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = REGISTRY.register(Box::new(move |line: &str| sink.lock().unwrap().push(line.to_string())));

        for line in ["first\n", "second\n"] {
            unsafe { log_bridge(token.as_user_data(), line.as_ptr() as *const c_char, line.len()) };
        }
        assert_eq!(*seen.lock().unwrap(), vec!["first\n", "second\n"]);

        unsafe { destroy_bridge(token.as_user_data()) };
        assert!(!REGISTRY.contains(token));
    }
}
