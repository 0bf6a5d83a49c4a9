//! # Console Output
//!
//! This module controls how results reach the terminal.
//!
//! ## Respecting User Preferences
//!
//! [`OutputConfig`] respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Serialized output
//!
//! Workers never print directly. Each one fills a [`Report`] with its
//! lines, and the [`Console`] writes a finished report while holding its
//! [`PrintLock`]. Lines from one repository therefore stay together, and the
//! lock is held only while printing, never while git runs.
//!
//! The lock is always present. Pooled batches use [`SharedLock`]; the
//! sequential path swaps in [`NoLock`] through [`Console::with_lock`].

use std::env;
use std::sync::{Arc, Mutex, PoisonError};

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the appropriate string based on color configuration.
///
/// When colors are enabled, returns the emoji. When disabled, returns
/// the plain text alternative.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// How a line should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub tone: Tone,
    pub text: String,
}

/// Lines produced while working on one item, printed as a unit.
#[derive(Debug, Clone, Default)]
pub struct Report {
    lines: Vec<Line>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tone: Tone, text: impl Into<String>) {
        self.lines.push(Line {
            tone,
            text: text.into(),
        });
    }

    pub fn plain(&mut self, text: impl Into<String>) {
        self.push(Tone::Plain, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Tone::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Tone::Success, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(Tone::Warning, text);
    }

    pub fn danger(&mut self, text: impl Into<String>) {
        self.push(Tone::Danger, text);
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Text of the most recent line, used as an outcome's summary message.
    pub fn last_text(&self) -> Option<&str> {
        self.lines.last().map(|l| l.text.as_str())
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }
}

/// Destination for rendered lines.
pub trait Sink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

/// Keeps rendered lines in memory. Used by tests and by callers that want
/// to post-process output.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Sink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Mutual exclusion around a burst of printing.
pub trait PrintLock: Send + Sync {
    fn hold(&self, emit: &mut dyn FnMut());
}

/// A real mutex shared by every worker of a pooled batch.
#[derive(Debug, Default)]
pub struct SharedLock(Mutex<()>);

impl PrintLock for SharedLock {
    fn hold(&self, emit: &mut dyn FnMut()) {
        let _guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        emit();
    }
}

/// Stand-in used when only one thread prints.
#[derive(Debug, Default)]
pub struct NoLock;

impl PrintLock for NoLock {
    fn hold(&self, emit: &mut dyn FnMut()) {
        emit();
    }
}

/// Shared, cloneable handle to the output stream.
#[derive(Clone)]
pub struct Console {
    sink: Arc<dyn Sink>,
    lock: Arc<dyn PrintLock>,
    config: OutputConfig,
}

impl Console {
    pub fn stdout(config: OutputConfig) -> Self {
        Self::with_sink(Arc::new(StdoutSink), config)
    }

    pub fn with_sink(sink: Arc<dyn Sink>, config: OutputConfig) -> Self {
        Self {
            sink,
            lock: Arc::new(SharedLock::default()),
            config,
        }
    }

    /// Same sink and colors, different locking strategy.
    pub fn with_lock(&self, lock: Arc<dyn PrintLock>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            lock,
            config: self.config.clone(),
        }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Print every line of `report` without interleaving other output.
    pub fn emit(&self, report: &Report) {
        if report.is_empty() {
            return;
        }
        let rendered: Vec<String> = report.lines().iter().map(|l| self.render(l)).collect();
        self.lock.hold(&mut || {
            for line in &rendered {
                self.sink.write_line(line);
            }
        });
    }

    pub fn line(&self, tone: Tone, text: impl Into<String>) {
        let mut report = Report::new();
        report.push(tone, text);
        self.emit(&report);
    }

    pub fn plain(&self, text: impl Into<String>) {
        self.line(Tone::Plain, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.line(Tone::Success, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.line(Tone::Warning, text);
    }

    pub fn danger(&self, text: impl Into<String>) {
        self.line(Tone::Danger, text);
    }

    fn render(&self, line: &Line) -> String {
        if !self.config.use_color {
            return line.text.clone();
        }
        let styled = style(&line.text).force_styling(true);
        let styled = match line.tone {
            Tone::Plain => return line.text.clone(),
            Tone::Info => styled.cyan(),
            Tone::Success => styled.green(),
            Tone::Warning => styled.yellow(),
            Tone::Danger => styled.red().bold(),
        };
        styled.to_string()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
