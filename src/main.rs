//! reanchor - make the focused bspwm window the anchor of its desktop.
//!
//! Reorders the focused desktop's leaves so the focused window comes first,
//! keeping the root preselection and the old anchor's size, without a full
//! re-tile.
//!
//! # Examples
//!
//! ```bash
//! # Promote the focused window
//! reanchor
//!
//! # Show every bspc call that was made
//! reanchor -vv --trace
//! ```

mod bspc;
mod config;
mod deps;
#[cfg(test)]
mod emulator;
mod journal;
mod reflow;
mod tree;
mod types;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use bspc::{Bspc, ProcessRunner};
use config::{Config, Overrides};
use reflow::{Outcome, Reflow};

/// reanchor - promote the focused window to the anchor of its desktop
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/reanchor/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the temporary desktop leaves are parked on
    #[arg(long)]
    scratch_desktop: Option<String>,

    /// bspc executable to use
    #[arg(long)]
    bspc: Option<String>,

    /// Leave the new anchor at its natural size
    #[arg(long)]
    no_resize: bool,

    /// Do not re-apply the desktop's root preselection
    #[arg(long)]
    no_preselection: bool,

    /// Print the journal of issued commands as JSON to stderr
    #[arg(long)]
    trace: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            program: self.bspc.clone(),
            scratch_desktop: self.scratch_desktop.clone(),
            no_preselection: self.no_preselection,
            no_resize: self.no_resize,
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    }
    .apply_overrides(&cli.overrides());

    let search_path = std::env::var_os("PATH");
    let missing = deps::missing_programs(&config.dependencies.required, search_path.as_deref());
    if !missing.is_empty() {
        eprintln!("reanchor: missing required command(s): {}", missing.join(", "));
        std::process::exit(1);
    }

    let bspc = Bspc::new(ProcessRunner::new(config.control.program.clone()));
    let mut reflow = Reflow::new(bspc, config.reflow.clone());
    let result = reflow.run();
    log::debug!("{} command(s) journaled", reflow.journal().total());

    if cli.trace {
        match reflow.journal().to_json() {
            Ok(json) => eprintln!("{}", json),
            Err(e) => log::warn!("Failed to serialize journal: {}", e),
        }
    }

    match result? {
        Outcome::Reflowed(report) => {
            log::info!(
                "Desktop '{}' reordered: {}",
                report.desktop,
                report
                    .order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            if report.tolerated_failures > 0 {
                log::info!("{} non-essential call(s) failed", report.tolerated_failures);
            }
        }
        Outcome::NoFocusedDesktop => log::info!("No focused desktop"),
        Outcome::NoLeaves { desktop } => log::info!("Desktop '{}' has no windows", desktop),
        Outcome::NoFocusedNode { desktop } => {
            log::info!("No focused window on desktop '{}'", desktop)
        }
    }

    Ok(())
}
