//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted output with colored module prefixes
//! - `debug!` macro, only active with `--verbose`
//!
//! All output goes to stderr. Stdout is reserved for the URL line printed
//! by the command-line flows, so scripts can read it without filtering.
//!
//! # Example
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//! debug!("watch"; "raw notify: {:?}", event.kind);
//! ```

use clap::ColorChoice;
use crossterm::tty::IsTty;
use owo_colors::OwoColorize;
use std::{
    io::{Write, stderr},
    sync::atomic::{AtomicBool, Ordering},
    time::SystemTime,
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Whether log lines are styled (set by --color)
static COLOR: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Apply the `--color` choice.
///
/// `Auto` only colors when stderr is a terminal, so the daemon's log file
/// stays free of escape sequences.
pub fn init_color(choice: ColorChoice) {
    let enabled = match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => stderr().is_tty(),
    };
    COLOR.store(enabled, Ordering::SeqCst);
    owo_colors::set_override(enabled);
}

/// Check if styled output is enabled
pub fn is_color() -> bool {
    COLOR.load(Ordering::SeqCst)
}

/// `error:` label for the final failure line
pub fn error_label() -> String {
    if is_color() {
        "error:".bright_red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let color = is_color();
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower, color);
    let timestamp = format!("[{}]", now());
    let timestamp = if color {
        timestamp.dimmed().to_string()
    } else {
        timestamp
    };

    let mut stderr = stderr().lock();
    writeln!(stderr, "{timestamp} {prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str, color: bool) -> String {
    let prefix = format!("[{module}]");
    if !color {
        return prefix;
    }
    match module_lower {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "control" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

/// Current UTC wall-clock time formatted as HH:MM:SS
fn now() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format_clock(secs)
}

fn format_clock(secs: u64) -> String {
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

// ============================================================================
// Tests
// ============================================================================
