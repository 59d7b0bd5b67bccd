//! Straight-line launch sequence: check tools, create the log directory, start
//! each target whose port is free, optionally re-probe, then hand the started
//! processes back for the summary.
//!
//! Every started process is owned by a [`StartedServices`] guard from the
//! moment it is spawned. If any later step fails the guard kills them all
//! before the error propagates.

use anyhow::Result;
use std::thread;

use crate::config::{LaunchPlan, LaunchTarget};
use crate::port::is_port_open;
use crate::process::{start_process, LaunchMode, ServiceHandle};
use crate::tools;
use crate::utils::{ensure_dir, ui};

#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    pub mode: LaunchMode,
    /// Pause after launching and report which ports are listening.
    pub wait: bool,
}

/// A target that was not started because its port was already open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedService {
    pub name: String,
    pub port: u16,
}

impl SkippedService {
    pub fn message(&self) -> String {
        format!(
            "Port {} appears to be in use; skipping {} start.",
            self.port, self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub name: String,
    pub port: u16,
    pub open: bool,
}

#[derive(Debug)]
pub struct LaunchReport {
    pub services: Vec<ServiceHandle>,
    pub skipped: Vec<SkippedService>,
    /// Only filled when [`LaunchOptions::wait`] is set.
    pub port_status: Vec<PortStatus>,
}

impl LaunchReport {
    /// One line per started service with its PID and current liveness.
    pub fn summary_lines(&mut self) -> Vec<String> {
        self.services
            .iter_mut()
            .map(|s| {
                let running = s.is_running();
                format!(" - {}: PID={} running={}", s.name, s.pid(), running)
            })
            .collect()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Kills every held process on drop unless released.
#[derive(Debug, Default)]
pub struct StartedServices {
    handles: Vec<ServiceHandle>,
}

impl StartedServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: ServiceHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Hand the processes over; they will no longer be killed on drop.
    pub fn release(mut self) -> Vec<ServiceHandle> {
        std::mem::take(&mut self.handles)
    }
}

impl Drop for StartedServices {
    fn drop(&mut self) {
        for handle in &mut self.handles {
            handle.kill();
        }
    }
}

/// Run the launch sequence described by `plan`.
///
/// A missing tool aborts before anything touches the filesystem. Any later
/// error kills what was already started, is printed, and is returned.
pub fn launch(plan: &LaunchPlan, options: &LaunchOptions) -> Result<LaunchReport> {
    tools::ensure_tools(&plan.required_tools)?;

    ui::section("Project");
    ui::info(&format!("Repo root: {}", plan.root.display()));
    for target in &plan.targets {
        ui::info(&format!("{} dir: {}", target.name, target.cwd.display()));
    }

    let mut started = StartedServices::new();
    let mut skipped = Vec::new();
    let mut port_status = Vec::new();

    match run_sequence(plan, options, &mut started, &mut skipped, &mut port_status) {
        Ok(()) => Ok(LaunchReport {
            services: started.release(),
            skipped,
            port_status,
        }),
        Err(e) => {
            ui::error(&format!("Error while starting services: {:#}", e));
            drop(started);
            Err(e)
        }
    }
}

fn run_sequence(
    plan: &LaunchPlan,
    options: &LaunchOptions,
    started: &mut StartedServices,
    skipped: &mut Vec<SkippedService>,
    port_status: &mut Vec<PortStatus>,
) -> Result<()> {
    ensure_dir(&plan.log_dir)?;

    ui::section("Starting services");
    for (i, target) in plan.targets.iter().enumerate() {
        // Stagger so the services do not race to bind at the same instant
        if i > 0 && !plan.stagger.is_zero() {
            thread::sleep(plan.stagger);
        }

        if let Some(port) = occupied_port(plan, target) {
            let skip = SkippedService {
                name: target.name.clone(),
                port,
            };
            ui::skipped(&target.name, &skip.message());
            skipped.push(skip);
            continue;
        }

        started.push(start_process(target, options.mode, &plan.log_dir)?);
    }

    if options.wait {
        thread::sleep(plan.report_delay);
        ui::section("Port status");
        for target in &plan.targets {
            if let Some(port) = target.port {
                let open = is_port_open(port, plan.probe_timeout);
                ui::port(&target.name, port, open);
                port_status.push(PortStatus {
                    name: target.name.clone(),
                    port,
                    open,
                });
            }
        }
    }

    Ok(())
}

fn occupied_port(plan: &LaunchPlan, target: &LaunchTarget) -> Option<u16> {
    target
        .port
        .filter(|&port| is_port_open(port, plan.probe_timeout))
}
