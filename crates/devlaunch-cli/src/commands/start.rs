use anyhow::{Context, Result};
use colored::Colorize;
use devlaunch_core::config::{DevlaunchConfig, LaunchPlan};
use devlaunch_core::launcher::{self, LaunchOptions};
use devlaunch_core::process::LaunchMode;
use devlaunch_core::utils::ui;
use std::path::{Path, PathBuf};

use super::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    let root = resolve_root(cli.root.as_deref())?;
    let config = load_config(&root, cli.config.as_deref())?;
    let plan = LaunchPlan::standard(&root, &config)?;

    let mode = LaunchMode::select(cli.no_new_console);
    let options = LaunchOptions {
        mode,
        wait: cli.wait,
    };

    println!("{}", "Starting development servers...".bold());
    let mut report = launcher::launch(&plan, &options)?;

    ui::section("Summary of launched processes");
    if report.services.is_empty() {
        ui::warn("No new processes started.");
    }
    for line in report.summary_lines() {
        println!("{}", line);
    }

    println!();
    match mode {
        LaunchMode::NewConsole => {
            println!("Check the new console windows for live output.");
        }
        LaunchMode::Detached => {
            println!("Logs are in {}", plan.log_dir.display());
        }
    }
    println!(
        "To stop them: use Task Manager or `taskkill /PID <pid> /F` on Windows, or `kill <pid>` on Unix."
    );

    Ok(())
}

fn resolve_root(root: Option<&Path>) -> Result<PathBuf> {
    let root = match root {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };
    let root = std::path::absolute(&root)
        .with_context(|| format!("Cannot resolve project root {}", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Project root {} not found", root.display());
    }
    Ok(root)
}

fn load_config(root: &Path, explicit: Option<&Path>) -> Result<DevlaunchConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file {} not found", path.display());
            }
            DevlaunchConfig::load_file(path)
        }
        None => DevlaunchConfig::load(root),
    }
}
