//! Diagnostics for args-to-schema
//!
//! Everything user-facing goes to stderr; stdout stays free for machine-readable output.
//! Every message is also appended to a per-run log file when one is configured.

use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOG_FILE_NAME: &str = "argschema.log";

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);

/// Get the current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Set the verbosity level: 0 = warnings and errors, 1 = debug (-v), 2 = trace (-vv)
pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Initialize the logger
///
/// When `log_dir` is given, `argschema.log` is created there, truncating the previous run.
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> Result<(), String> {
    set_verbosity(verbosity);

    let Some(log_dir) = log_dir else {
        return Ok(());
    };

    fs::create_dir_all(log_dir).map_err(|e| format!("Failed to create log directory: {}", e))?;
    let log_file = log_dir.join(LOG_FILE_NAME);

    // Truncate log file on each run (overwrite instead of append)
    fs::write(&log_file, "").map_err(|e| format!("Failed to create log file: {}", e))?;

    let mut guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *guard = Some(log_file);

    Ok(())
}

/// Write to log file
fn write_to_log(message: &str) {
    if let Ok(guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] {}", timestamp, message);
            }
        }
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

/// Log a warning message (to both file and console)
pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

/// Log an error message (to both file and console)
pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Log a success message
pub fn success(message: &str) {
    write_to_log(&format!("SUCCESS {}", message));
    eprintln!("{} {}", "\u{2714}".green().bold(), message);
}

/// Log a step message (console at -vv only)
pub fn step(message: &str) {
    if get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
    write_to_log(&format!("STEP: {}", message));
}

/// Print a block of output verbatim to stderr, and to the log file
pub fn plain(message: &str) {
    write_to_log(message);
    eprintln!("{}", message);
}

/// Get the log file path, if logging to a file
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}
