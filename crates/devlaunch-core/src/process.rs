use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::config::LaunchTarget;
use crate::tools;
use crate::utils::{command_line, ui};

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// How a service process is attached to the user's screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// A new visible terminal window running the command (Windows only).
    NewConsole,
    /// No terminal; stdout and stderr are appended to `<log_dir>/<name>.log`.
    Detached,
}

impl LaunchMode {
    /// New console windows are only opened on Windows, and only when not disabled.
    pub fn select(no_new_console: bool) -> Self {
        Self::for_platform(cfg!(windows), no_new_console)
    }

    fn for_platform(is_windows: bool, no_new_console: bool) -> Self {
        if is_windows && !no_new_console {
            LaunchMode::NewConsole
        } else {
            LaunchMode::Detached
        }
    }
}

/// A started service process.
#[derive(Debug)]
pub struct ServiceHandle {
    pub name: String,
    pub log_file: Option<PathBuf>,
    child: Child,
}

impl ServiceHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// True until the process has exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Force-kill and reap. Errors are ignored.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start `target` in the given mode.
///
/// Only spawn failures are reported; a command that exits later shows up in
/// its log file or as a closed port.
pub fn start_process(target: &LaunchTarget, mode: LaunchMode, log_dir: &Path) -> Result<ServiceHandle> {
    if target.command.is_empty() {
        anyhow::bail!("Service '{}' has an empty command", target.name);
    }

    let display = command_line(&target.command);
    ui::started(
        &target.name,
        &format!("{} (cwd={})", display, target.cwd.display()),
    );

    match mode {
        LaunchMode::NewConsole => {
            let child = console_command(target)
                .current_dir(&target.cwd)
                .spawn()
                .with_context(|| format!("Failed to start {} ({})", target.name, display))?;
            ui::info(&format!(
                "Launched {} in new console, PID={}",
                target.name,
                child.id()
            ));
            Ok(ServiceHandle {
                name: target.name.clone(),
                log_file: None,
                child,
            })
        }
        LaunchMode::Detached => {
            let log_path = target.log_file(log_dir);
            let mut log = open_log(&log_path, &target.name)?;
            let out_log = log
                .try_clone()
                .with_context(|| format!("Failed to duplicate handle for {}", log_path.display()))?;
            let err_log = log
                .try_clone()
                .with_context(|| format!("Failed to duplicate handle for {}", log_path.display()))?;

            let mut cmd = Command::new(resolve_program(&target.command[0]));
            cmd.args(&target.command[1..])
                .current_dir(&target.cwd)
                .stdin(Stdio::null())
                .stdout(Stdio::from(out_log))
                .stderr(Stdio::from(err_log));
            detach(&mut cmd);

            let child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    let _ = writeln!(log, "=== {} failed to start: {} ===", target.name, e);
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to start {} ({})", target.name, display)));
                }
            };
            ui::info(&format!(
                "Launched {}, PID={} (logs -> {})",
                target.name,
                child.id(),
                log_path.display()
            ));
            Ok(ServiceHandle {
                name: target.name.clone(),
                log_file: Some(log_path),
                child,
            })
        }
    }
}

/// Open a log file for appending and write a "starting" session header.
pub fn open_log(path: &Path, name: &str) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    writeln!(
        file,
        "=== {} starting {} ===",
        name,
        chrono::Local::now().to_rfc3339()
    )
    .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(file)
}

/// Prefer the resolved path so Windows `.cmd` shims (npm) can be spawned.
fn resolve_program(program: &str) -> PathBuf {
    tools::find_executable(program).unwrap_or_else(|| PathBuf::from(program))
}

#[cfg(windows)]
fn console_command(target: &LaunchTarget) -> Command {
    use std::os::windows::process::CommandExt;

    // `/k` keeps the window open after the command exits
    let mut cmd = Command::new("cmd");
    cmd.arg("/k")
        .arg(command_line(&target.command))
        .creation_flags(CREATE_NEW_CONSOLE);
    cmd
}

#[cfg(not(windows))]
fn console_command(target: &LaunchTarget) -> Command {
    let mut cmd = Command::new(resolve_program(&target.command[0]));
    cmd.args(&target.command[1..]);
    cmd
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // Own process group: Ctrl-C in the launcher's terminal does not reach the child
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
