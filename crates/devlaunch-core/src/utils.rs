use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Create a directory and its parents. Succeeds if it already exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

/// Join an argv vector into a single display/shell string.
pub fn command_line(argv: &[String]) -> String {
    argv.join(" ")
}

/// Pretty CLI output helpers using the `colored` crate.
pub mod ui {
    use colored::Colorize;

    /// Print an indented detail line
    pub fn info(msg: &str) {
        println!("  {}", msg);
    }

    /// Print a "start" action (green)
    pub fn started(name: &str, detail: &str) {
        println!("  {} {} {}", "start".green(), name, detail);
    }

    /// Print a "skip" action (yellow)
    pub fn skipped(name: &str, reason: &str) {
        println!("  {} {} ({})", "skip".yellow(), name, reason);
    }

    /// Print a port status line
    pub fn port(name: &str, port: u16, open: bool) {
        let state = if open { "true".green() } else { "false".red() };
        println!("  Port {} ({}) open: {}", port, name, state);
    }

    /// Print a section header (bold)
    pub fn section(title: &str) {
        println!("\n{}", title.bold());
    }

    /// Print a warning (yellow)
    pub fn warn(msg: &str) {
        println!("  {} {}", "warn".yellow(), msg);
    }

    /// Print an error (red)
    pub fn error(msg: &str) {
        eprintln!("  {} {}", "error".red(), msg);
    }
}
