//! Logging for the cvx toolchain.
//!
//! Library crates never print directly. Anything meant for the user goes
//! through a [`LogSink`] handle passed down by the caller; the CLI hands in a
//! [`Logger`], tests hand in a [`RecordingSink`].

use colored::Colorize;
use indicatif::ProgressBar;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Severity attached to a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        }
    }
}

/// An event destined for the error-tracking side channel rather than the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub message: String,
    pub level: DiagnosticLevel,
}

impl DiagnosticEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: DiagnosticLevel::Warning,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: DiagnosticLevel::Error,
        }
    }
}

/// Output channel threaded through every core operation.
pub trait LogSink {
    /// Detail shown only at `-v` and above.
    fn verbose(&self, message: &str);
    /// Plain user-facing message.
    fn message(&self, message: &str);
    /// Something the user should look at, but not an error.
    fn warning(&self, message: &str);
    /// Record an event for the diagnostics side channel.
    fn capture(&self, event: DiagnosticEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn verbose(&self, _message: &str) {}
    fn message(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn capture(&self, _event: DiagnosticEvent) {}
}

/// A single line captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Verbose(String),
    Message(String),
    Warning(String),
    Diagnostic(DiagnosticEvent),
}

/// Keeps every record in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::Warning(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn verbose_lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::Verbose(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<DiagnosticEvent> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::Diagnostic(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn verbose(&self, message: &str) {
        self.records
            .lock()
            .push(LogRecord::Verbose(message.to_string()));
    }

    fn message(&self, message: &str) {
        self.records
            .lock()
            .push(LogRecord::Message(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.records
            .lock()
            .push(LogRecord::Warning(message.to_string()));
    }

    fn capture(&self, event: DiagnosticEvent) {
        self.records.lock().push(LogRecord::Diagnostic(event));
    }
}

/// Terminal logger: stderr output gated by verbosity, plus a per-run log file.
#[derive(Debug)]
pub struct Logger {
    verbosity: u8,
    no_stdout: bool,
    log_file: Option<PathBuf>,
    spinner: Mutex<Option<ProgressBar>>,
}

impl Logger {
    /// Create a logger that only writes to the terminal.
    pub fn new(verbosity: u8, no_stdout: bool) -> Self {
        Logger {
            verbosity,
            no_stdout,
            log_file: None,
            spinner: Mutex::new(None),
        }
    }

    /// Create a logger writing to `cvx.log` in the user config directory.
    ///
    /// The log file is truncated on each run.
    pub fn init(verbosity: u8, no_stdout: bool) -> Result<Self, String> {
        let config_dir = get_config_dir()?;
        fs::create_dir_all(&config_dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        Ok(Self::new(verbosity, no_stdout).with_log_file(config_dir.join("cvx.log")))
    }

    /// Attach a log file, truncating anything already there.
    pub fn with_log_file(mut self, log_file: PathBuf) -> Self {
        if log_file.exists() {
            let _ = fs::remove_file(&log_file);
        }
        self.log_file = Some(log_file);
        self
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    fn write_to_log(&self, message: &str) {
        let Some(ref log_path) = self.log_file else {
            return;
        };
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(file, "[{}] {}", timestamp, message);
        }
    }

    fn console(&self, line: &str) {
        if self.no_stdout {
            return;
        }
        self.suspend_spinner(|| eprintln!("{}", line));
    }

    fn suspend_spinner<F: FnOnce()>(&self, f: F) {
        let guard = self.spinner.lock();
        match guard.as_ref() {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    /// Informational message (console at `-v`, always to file).
    pub fn info(&self, message: &str) {
        self.write_to_log(&format!("INFO {}", message));
        if self.verbosity >= 1 {
            self.console(message);
        }
    }

    /// Debug message (console at `-v`, always to file).
    pub fn debug(&self, message: &str) {
        self.write_to_log(&format!("DEBUG {}", message));
        if self.verbosity >= 1 {
            self.console(&format!("{} {}", "DEBUG:".blue().bold(), message));
        }
    }

    pub fn warn(&self, message: &str) {
        self.write_to_log(&format!("WARN {}", message));
        self.console(&format!("{} {}", "warning:".yellow().bold(), message));
    }

    pub fn error(&self, message: &str) {
        self.write_to_log(&format!("ERROR {}", message));
        self.console(&format!("{} {}", "Error:".red().bold(), message));
    }

    pub fn success(&self, message: &str) {
        self.write_to_log(&format!("SUCCESS {}", message));
        self.console(&format!("{} {}", "\u{2714}".green().bold(), message));
    }

    /// Step trace, shown at `-vv`.
    pub fn step(&self, message: &str) {
        if self.verbosity >= 2 {
            self.console(&format!("TRACE: {}", message));
        }
        self.write_to_log(&format!("STEP: {}", message));
    }

    /// Start a spinner (suppressed in verbose mode).
    pub fn spinner_start(&self, message: &str) {
        if self.verbosity > 0 || self.no_stdout {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner.set_message(message.to_string());

        *self.spinner.lock() = Some(spinner);
    }

    pub fn spinner_success(&self, message: &str) {
        self.spinner_stop();
        self.success(message);
    }

    pub fn spinner_error(&self, message: &str) {
        self.spinner_stop();
        self.write_to_log(&format!("ERROR {}", message));
        if !self.no_stdout {
            eprintln!("  {} {}", "✗".red().bold(), message);
        }
    }

    pub fn spinner_stop(&self) {
        if let Some(spinner) = self.spinner.lock().take() {
            spinner.finish_and_clear();
        }
    }

    /// Print the log file path to the user.
    pub fn show_log_path(&self) {
        match self.log_path() {
            Some(path) => eprintln!("Log file: {}", path.display()),
            None => eprintln!("Log file location not available"),
        }
    }
}

impl LogSink for Logger {
    fn verbose(&self, message: &str) {
        self.debug(message);
    }

    fn message(&self, message: &str) {
        self.write_to_log(&format!("INFO {}", message));
        self.console(message);
    }

    fn warning(&self, message: &str) {
        self.warn(message);
    }

    fn capture(&self, event: DiagnosticEvent) {
        self.write_to_log(&format!(
            "DIAGNOSTIC [{}] {}",
            event.level.as_str(),
            event.message
        ));
    }
}

/// The cvx config directory (`~/.config/cvx`, or the platform config dir on Windows).
pub fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("cvx");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("cvx");

    Ok(config_dir)
}
