pub mod start;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "devlaunch",
    version,
    about = "Start the backend (node server.js) and frontend (npm run dev) dev servers"
)]
pub struct Cli {
    /// Do not open new console windows; run detached with output appended to logs/<service>.log
    #[arg(long)]
    pub no_new_console: bool,

    /// After launching, wait briefly and report whether ports 3001 and 5173 are listening
    #[arg(long)]
    pub wait: bool,

    /// Project root containing server/ and client/ (default: current directory)
    #[arg(long, env = "DEVLAUNCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/devlaunch.toml, optional)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    start::run(&cli)
}
