use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::port::{BACKEND_PORT, FRONTEND_PORT, PROBE_TIMEOUT};

/// Name of the optional config file looked up in the project root.
pub const CONFIG_FILE: &str = "devlaunch.toml";

#[derive(Debug, Serialize, Deserialize)]
pub struct DevlaunchConfig {
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default = "default_backend")]
    pub backend: ServiceConfig,
    #[serde(default = "default_frontend")]
    pub frontend: ServiceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Log directory, relative to the project root
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Pause between starting consecutive services
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
    /// Pause before re-probing ports when `--wait` is given
    #[serde(default = "default_report_delay_ms")]
    pub report_delay_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_required_tools")]
    pub required_tools: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            stagger_ms: default_stagger_ms(),
            report_delay_ms: default_report_delay_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            required_tools: default_required_tools(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Working directory, relative to the project root
    pub dir: String,
    pub command: Vec<String>,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_stagger_ms() -> u64 {
    500
}

fn default_report_delay_ms() -> u64 {
    2000
}

fn default_probe_timeout_ms() -> u64 {
    PROBE_TIMEOUT.as_millis() as u64
}

fn default_required_tools() -> Vec<String> {
    vec!["node".to_string(), "npm".to_string()]
}

fn default_backend() -> ServiceConfig {
    ServiceConfig {
        dir: "server".to_string(),
        command: vec!["node".to_string(), "server.js".to_string()],
    }
}

fn default_frontend() -> ServiceConfig {
    ServiceConfig {
        dir: "client".to_string(),
        command: vec!["npm".to_string(), "run".to_string(), "dev".to_string()],
    }
}

impl Default for DevlaunchConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DevlaunchConfig {
    /// Load `devlaunch.toml` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_file(&dir.join(CONFIG_FILE))
    }

    /// Load a specific config file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::builtin());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: DevlaunchConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// The built-in backend/frontend layout.
    pub fn builtin() -> Self {
        Self {
            launcher: LauncherConfig::default(),
            backend: default_backend(),
            frontend: default_frontend(),
        }
    }
}

/// One service to start: name, working directory, argv, and the port that
/// marks it as already running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub name: String,
    pub cwd: PathBuf,
    pub command: Vec<String>,
    pub port: Option<u16>,
}

impl LaunchTarget {
    pub fn new(name: &str, cwd: PathBuf, command: Vec<String>, port: Option<u16>) -> Self {
        Self {
            name: name.to_string(),
            cwd,
            command,
            port,
        }
    }

    /// Log file used when this target runs detached.
    pub fn log_file(&self, log_dir: &Path) -> PathBuf {
        log_dir.join(format!("{}.log", self.name))
    }
}

/// Everything a single launcher run needs, resolved against a project root.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub root: PathBuf,
    pub log_dir: PathBuf,
    pub required_tools: Vec<String>,
    pub targets: Vec<LaunchTarget>,
    pub stagger: Duration,
    pub report_delay: Duration,
    pub probe_timeout: Duration,
}

impl LaunchPlan {
    /// Backend on port 3001 followed by frontend on port 5173.
    pub fn standard(root: &Path, config: &DevlaunchConfig) -> Result<Self> {
        let targets = vec![
            LaunchTarget::new(
                "backend",
                root.join(&config.backend.dir),
                config.backend.command.clone(),
                Some(BACKEND_PORT),
            ),
            LaunchTarget::new(
                "frontend",
                root.join(&config.frontend.dir),
                config.frontend.command.clone(),
                Some(FRONTEND_PORT),
            ),
        ];
        let launcher = &config.launcher;
        // connect_timeout rejects zero, which would read every port as closed
        if launcher.probe_timeout_ms == 0 {
            anyhow::bail!("probe_timeout_ms must be greater than zero");
        }
        Self::new(
            root,
            root.join(&launcher.log_dir),
            launcher.required_tools.clone(),
            targets,
        )
        .map(|plan| Self {
            stagger: Duration::from_millis(launcher.stagger_ms),
            report_delay: Duration::from_millis(launcher.report_delay_ms),
            probe_timeout: Duration::from_millis(launcher.probe_timeout_ms),
            ..plan
        })
    }

    /// Build a plan with default timings. Rejects duplicate names and empty commands.
    pub fn new(
        root: &Path,
        log_dir: PathBuf,
        required_tools: Vec<String>,
        targets: Vec<LaunchTarget>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(target.name.as_str()) {
                anyhow::bail!("Duplicate service name '{}'", target.name);
            }
            if target.command.is_empty() {
                anyhow::bail!("Service '{}' has an empty command", target.name);
            }
        }

        let defaults = LauncherConfig::default();
        Ok(Self {
            root: root.to_path_buf(),
            log_dir,
            required_tools,
            targets,
            stagger: Duration::from_millis(defaults.stagger_ms),
            report_delay: Duration::from_millis(defaults.report_delay_ms),
            probe_timeout: Duration::from_millis(defaults.probe_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Helper: write a devlaunch.toml and return the tempdir.
    fn write_config(toml_content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(toml_content.as_bytes()).unwrap();
        dir
    }

    // ── Defaults ──────────────────────────────────────────────────────

    #[test]
    fn missing_file_gives_builtin_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        assert_eq!(config.launcher.log_dir, "logs");
        assert_eq!(config.launcher.stagger_ms, 500);
        assert_eq!(config.launcher.report_delay_ms, 2000);
        assert_eq!(config.launcher.probe_timeout_ms, 500);
        assert_eq!(config.launcher.required_tools, vec!["node", "npm"]);
        assert_eq!(config.backend.dir, "server");
        assert_eq!(config.backend.command, vec!["node", "server.js"]);
        assert_eq!(config.frontend.dir, "client");
        assert_eq!(config.frontend.command, vec!["npm", "run", "dev"]);
    }

    #[test]
    fn empty_file_gives_builtin_layout() {
        let dir = write_config("");
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        assert_eq!(config.backend.command, vec!["node", "server.js"]);
        assert_eq!(config.frontend.command, vec!["npm", "run", "dev"]);
        assert_eq!(config.launcher.log_dir, "logs");
    }

    // ── Overrides ─────────────────────────────────────────────────────

    #[test]
    fn partial_launcher_section_keeps_other_defaults() {
        let dir = write_config(
            r#"
[launcher]
stagger_ms = 0
"#,
        );
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        assert_eq!(config.launcher.stagger_ms, 0);
        assert_eq!(config.launcher.report_delay_ms, 2000);
        assert_eq!(config.launcher.log_dir, "logs");
    }

    #[test]
    fn service_sections_override_commands() {
        let dir = write_config(
            r#"
[backend]
dir = "api"
command = ["node", "index.js"]

[frontend]
dir = "web"
command = ["npx", "vite"]
"#,
        );
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        assert_eq!(config.backend.dir, "api");
        assert_eq!(config.backend.command, vec!["node", "index.js"]);
        assert_eq!(config.frontend.dir, "web");
        assert_eq!(config.frontend.command, vec!["npx", "vite"]);
    }

    // ── Errors ────────────────────────────────────────────────────────

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = write_config("[launcher\nstagger_ms = ");
        let err = DevlaunchConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn service_without_command_is_an_error() {
        let dir = write_config(
            r#"
[backend]
dir = "server"
"#,
        );
        assert!(DevlaunchConfig::load(dir.path()).is_err());
    }

    // ── Plans ─────────────────────────────────────────────────────────

    #[test]
    fn standard_plan_uses_fixed_ports_and_order() {
        let root = Path::new("/project");
        let plan = LaunchPlan::standard(root, &DevlaunchConfig::builtin()).unwrap();

        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.targets[0].name, "backend");
        assert_eq!(plan.targets[0].cwd, root.join("server"));
        assert_eq!(plan.targets[0].port, Some(3001));
        assert_eq!(plan.targets[1].name, "frontend");
        assert_eq!(plan.targets[1].cwd, root.join("client"));
        assert_eq!(plan.targets[1].port, Some(5173));
        assert_eq!(plan.log_dir, root.join("logs"));
        assert_eq!(plan.stagger, Duration::from_millis(500));
        assert_eq!(plan.report_delay, Duration::from_millis(2000));
    }

    #[test]
    fn standard_plan_applies_launcher_timings() {
        let dir = write_config(
            r#"
[launcher]
log_dir = "var/log"
stagger_ms = 10
report_delay_ms = 20
probe_timeout_ms = 30
"#,
        );
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        let plan = LaunchPlan::standard(dir.path(), &config).unwrap();
        assert_eq!(plan.log_dir, dir.path().join("var/log"));
        assert_eq!(plan.stagger, Duration::from_millis(10));
        assert_eq!(plan.report_delay, Duration::from_millis(20));
        assert_eq!(plan.probe_timeout, Duration::from_millis(30));
    }

    #[test]
    fn standard_plan_rejects_empty_command() {
        let dir = write_config(
            r#"
[frontend]
dir = "client"
command = []
"#,
        );
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        let err = LaunchPlan::standard(dir.path(), &config).unwrap_err();
        assert_eq!(err.to_string(), "Service 'frontend' has an empty command");
    }

    #[test]
    fn standard_plan_rejects_zero_probe_timeout() {
        let dir = write_config(
            r#"
[launcher]
probe_timeout_ms = 0
"#,
        );
        let config = DevlaunchConfig::load(dir.path()).unwrap();
        let err = LaunchPlan::standard(dir.path(), &config).unwrap_err();
        assert_eq!(err.to_string(), "probe_timeout_ms must be greater than zero");
    }

    #[test]
    fn standard_plan_timeout_detects_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let plan = LaunchPlan::standard(Path::new("/project"), &DevlaunchConfig::builtin()).unwrap();
        assert!(crate::port::is_port_open(port, plan.probe_timeout));
    }

    #[test]
    fn plan_rejects_duplicate_names() {
        let root = Path::new("/project");
        let target = LaunchTarget::new("api", root.to_path_buf(), vec!["node".into()], None);
        let err = LaunchPlan::new(root, root.join("logs"), vec![], vec![target.clone(), target])
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate service name 'api'");
    }

    #[test]
    fn log_file_named_after_service() {
        let target = LaunchTarget::new("backend", PathBuf::from("server"), vec!["node".into()], None);
        assert_eq!(
            target.log_file(Path::new("/project/logs")),
            PathBuf::from("/project/logs/backend.log")
        );
    }
}
