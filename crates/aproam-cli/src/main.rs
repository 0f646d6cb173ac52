//! `aproam` – WiFi connectivity & roaming command line interface
//!
//! 1. `simulate` runs the connectivity manager against a scripted radio
//!    world on simulated time and prints every reconnect and roam.
//! 2. `config show` prints the effective `~/.aproam/config.toml` (passphrase
//!    redacted) after `APROAM_*` overrides.
//! 3. `config set-credentials` validates and provisions the network
//!    credentials the device joins with.
//!
//! **Ctrl-C** stops a running simulation after the current tick.

mod config;
mod scenario;
mod services;
mod simulate;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use aproam_link::{TickOutcome, load_credentials, store_credentials};
use aproam_types::{LinkError, LinkState, NetworkCredentials};

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "aproam", version, about = "WiFi connectivity and roaming manager")]
struct Cli {
    /// Config file to use instead of ~/.aproam/config.toml.
    #[arg(long, global = true, env = "APROAM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario file against the simulated radio.
    Simulate(SimulateArgs),
    /// Inspect or edit the config vault.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Scenario TOML file.
    scenario: PathBuf,
    /// Override the scenario's duration.
    #[arg(long)]
    duration_ms: Option<u64>,
    /// Override the scenario's tick period.
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Validate and store network credentials.
    SetCredentials {
        #[arg(long)]
        ssid: String,
        #[arg(long, default_value = "")]
        passphrase: String,
        /// Keep the stored hostname when omitted.
        #[arg(long)]
        hostname: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let _telemetry = aproam_runtime::init_tracing("aproam");

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this tick …".yellow().bold());
        shutdown_clone.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will abort immediately");
    }

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let result = match cli.command {
        Command::Simulate(args) => run_simulate(&args, &config_path, &shutdown),
        Command::Config(ConfigCommand::Show) => run_config_show(&config_path),
        Command::Config(ConfigCommand::SetCredentials {
            ssid,
            passphrase,
            hostname,
        }) => run_set_credentials(&config_path, ssid, passphrase, hostname),
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red().bold());
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run_simulate(
    args: &SimulateArgs,
    config_path: &std::path::Path,
    shutdown: &AtomicBool,
) -> Result<(), LinkError> {
    print_banner();

    let cfg = config::load_or_default(config_path)?;
    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(ms) = args.duration_ms {
        scenario.duration_ms = ms;
    }
    let tick_ms = args.tick_ms.unwrap_or(scenario.tick_ms);

    println!(
        "  Scenario {} – {} access point(s), {} event(s), {} ms",
        args.scenario.display().to_string().bold(),
        scenario.access_points.len(),
        scenario.events.len(),
        scenario.duration_ms
    );
    println!();

    let report = simulate::run(&scenario, &cfg, tick_ms, shutdown, print_outcome)?;

    println!();
    match report.bring_up_attempts {
        Some(n) => println!("  Bring-up: {} after {n} attempt(s)", "connected".green()),
        None => println!("  Bring-up: {}", "gave up".yellow()),
    }
    println!(
        "  {} ticks over {} ms, {} join(s), {} scan(s)",
        report.ticks, report.elapsed_ms, report.joins, report.scans
    );
    if report.events_pending > 0 {
        println!("  {} event(s) scheduled after the end of the run", report.events_pending);
    }
    for (label, count) in &report.outcomes {
        println!("    {:<20} {count}", label.dimmed());
    }
    println!("  Final link: {}", describe_link(&report.final_link));
    Ok(())
}

fn run_config_show(config_path: &std::path::Path) -> Result<(), LinkError> {
    let cfg = config::load_or_default(config_path)?;
    let exists = config_path.exists();
    println!(
        "  Config: {}{}",
        config_path.display().to_string().bold(),
        if exists { "" } else { " (not created yet, showing defaults)" }
    );
    let creds = load_credentials(&cfg)?;
    println!("  Network:  {}", creds.network_name().bold());
    println!(
        "  Key:      {}",
        if creds.passphrase().is_empty() { "<open>" } else { "<redacted>" }
    );
    println!("  Hostname: {}", creds.hostname().bold());
    println!();
    println!("{:#?}", cfg.policy);
    Ok(())
}

fn run_set_credentials(
    config_path: &std::path::Path,
    ssid: String,
    passphrase: String,
    hostname: Option<String>,
) -> Result<(), LinkError> {
    let mut cfg = config::load_from(config_path)?.unwrap_or_default();
    let hostname = match hostname {
        Some(h) => h,
        None => load_credentials(&cfg)?.hostname().to_string(),
    };
    let creds = NetworkCredentials::new(ssid, passphrase, hostname)?;
    store_credentials(&mut cfg, &creds)?;
    config::save_to(&cfg, config_path)?;
    println!(
        "  {} Credentials for {} saved to {}",
        "✓".green().bold(),
        creds.network_name().bold(),
        config_path.display()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_outcome(at_ms: u64, outcome: &TickOutcome, link: &LinkState) {
    let label = outcome.to_string();
    let label = match outcome {
        TickOutcome::Reconnected => label.green(),
        TickOutcome::ReconnectFailed => label.red(),
        TickOutcome::Roam(_) => label.cyan(),
        TickOutcome::ReconnectDeferred => label.normal(),
    };
    println!("  [{:>8} ms] {label:<20} {}", at_ms, describe_link(link));
}

fn describe_link(link: &LinkState) -> String {
    match (link.is_connected(), link.bssid) {
        (true, Some(bssid)) => format!("{bssid} @ {} dBm", link.rssi_dbm),
        (true, None) => format!("connected @ {} dBm", link.rssi_dbm),
        (false, _) => "disconnected".dimmed().to_string(),
    }
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "aproam".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  WiFi connectivity & roaming simulator");
    println!();
}
