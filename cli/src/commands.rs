pub mod discover;
pub mod interfaces;

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use arpsweep_common::config::{DuplicatePolicy, ScanConfig, ScanMode};
use arpsweep_common::network::target::TargetRange;

#[derive(Parser)]
#[command(name = "arpsweep", version)]
#[command(about = "Find out which hosts answer ARP on the local segment.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output; -qq prints only the records
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// More logging; -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe targets with ARP requests and report who answers
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// List network interfaces and show which one a scan would use
    #[command(alias = "i")]
    Interfaces,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// IPv4 address, CIDR block, dashed range, `lan`, or a comma separated list
    pub target: TargetRange,

    /// Interface to send from (default: first usable one)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Collection window per probe cycle, in milliseconds
    #[arg(short, long, value_name = "MS", default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Extra attempts for targets that did not answer
    #[arg(short, long, default_value_t = 0)]
    pub retries: u32,

    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Worker pool size in per-target mode
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Let a later reply with a different MAC replace an earlier binding
    #[arg(long)]
    pub keep_latest: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl DiscoverArgs {
    pub fn scan_config(&self) -> ScanConfig {
        let defaults = ScanConfig::default();
        ScanConfig {
            per_target_timeout: Duration::from_millis(self.timeout),
            interface: self.interface.clone(),
            retries: self.retries,
            mode: self.mode.into(),
            workers: self.workers.unwrap_or(defaults.workers),
            duplicate_policy: if self.keep_latest {
                DuplicatePolicy::KeepLatest
            } else {
                DuplicatePolicy::KeepFirst
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Broadcast on the local network, per-target otherwise
    Auto,
    /// All requests back to back, one shared listening window
    Broadcast,
    /// One target at a time per worker, each with its own window
    PerTarget,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => ScanMode::Auto,
            ModeArg::Broadcast => ScanMode::Broadcast,
            ModeArg::PerTarget => ScanMode::PerTarget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Presentation settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub quiet: u8,
    pub output: OutputFormat,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
