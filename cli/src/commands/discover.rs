use std::time::{Duration, Instant};

use colored::*;
use serde::Serialize;
use tracing::{Instrument, info_span, warn};

use arpsweep_common::network::host::{ExcludedTarget, HostBinding, ScanResult};
use arpsweep_common::network::interface::{self, LinkIdentity};
use arpsweep_common::network::mac;
use arpsweep_core::scanner;
use arpsweep_core::signal::StopSignal;

use crate::commands::{Config, DiscoverArgs, OutputFormat};
use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

const KEY_WIDTH: usize = 9;

pub async fn discover(args: DiscoverArgs, cfg: &Config) -> anyhow::Result<()> {
    let scan_cfg = args.scan_config();
    let (_, identity): (_, LinkIdentity) = interface::select_from_system(scan_cfg.interface.as_deref())?;

    let show_progress = cfg.output == OutputFormat::Text && cfg.quiet == 0;
    if show_progress {
        print::header("getting ready for discovery", cfg.quiet);
        print_setup(&args, &identity, scan_cfg.per_target_timeout, scan_cfg.attempts());
    }

    let (stop_handle, stop) = StopSignal::new();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with what has been found so far");
            stop_handle.stop();
        }
    });

    if show_progress {
        spinner::start("Sending ARP requests, press Ctrl-C to stop early");
    }

    let start_time = Instant::now();
    let on_host_found: scanner::ledger::HostCallback = Box::new(spinner::report_discovery_progress);
    let result = scanner::scan(&args.target, scan_cfg, stop, Some(on_host_found))
        .instrument(info_span!("discovery", interface = %identity.interface))
        .await;

    ctrl_c.abort();
    if show_progress {
        spinner::finish();
    }

    let result = result?;
    match cfg.output {
        OutputFormat::Json => print_json(&result, &identity),
        OutputFormat::Text => {
            discovery_ends(&result, start_time.elapsed(), cfg);
            Ok(())
        }
    }
}

fn print_setup(args: &DiscoverArgs, identity: &LinkIdentity, window: Duration, attempts: u32) {
    let network = identity
        .network
        .map(|net| net.to_string())
        .unwrap_or_else(|| identity.ipv4.to_string());

    print::aligned_line("Interface", KEY_WIDTH, identity.interface.as_str());
    print::aligned_line("Address", KEY_WIDTH, network.color(colors::IPV4_ADDR));
    print::aligned_line("Targets", KEY_WIDTH, args.target_summary());
    print::aligned_line(
        "Window",
        KEY_WIDTH,
        format!("{}ms x {attempts} attempt(s)", window.as_millis()),
    );
}

impl DiscoverArgs {
    fn target_summary(&self) -> String {
        let mut parts: Vec<String> = self.target.specs().iter().map(ToString::to_string).collect();
        parts.extend(self.target.rejected().iter().map(|r| r.input.clone()));
        parts.join(", ")
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    interface: &'a str,
    hosts: &'a [HostBinding],
    unanswered: &'a [std::net::Ipv4Addr],
    excluded: &'a [ExcludedTarget],
    responded: usize,
    cancelled: bool,
}

fn print_json(result: &ScanResult, identity: &LinkIdentity) -> anyhow::Result<()> {
    let report = JsonReport {
        interface: &identity.interface,
        hosts: &result.bindings,
        unanswered: &result.unanswered,
        excluded: &result.excluded,
        responded: result.responded(),
        cancelled: result.cancelled,
    };
    print::print(&serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn discovery_ends(result: &ScanResult, total_time: Duration, cfg: &Config) {
    if result.bindings.is_empty() {
        if cfg.quiet == 0 {
            print::header("zero hosts detected", cfg.quiet);
            print::no_results();
        }
        print_summary(result, total_time, cfg);
        return;
    }

    print::header("network discovery", cfg.quiet);
    let bindings = result.sorted_bindings();
    print_hosts(&bindings, cfg);
    print_summary(result, total_time, cfg);
}

fn print_hosts(bindings: &[HostBinding], cfg: &Config) {
    for (idx, binding) in bindings.iter().enumerate() {
        match cfg.quiet {
            0 => {
                print::tree_head(idx, &binding.ip.to_string());
                print::as_tree_one_level(format::binding_to_details(binding));
                if idx + 1 != bindings.len() {
                    mprint!();
                }
            }
            _ => print::print(&format!("{} {}", binding.ip, mac::canonical(binding.mac))),
        }
    }
}

fn print_summary(result: &ScanResult, total_time: Duration, cfg: &Config) {
    if cfg.quiet > 1 {
        return;
    }

    let responded: ColoredString = format!("{} responded", result.responded()).bold().green();
    let unanswered: ColoredString = format!("{} unanswered", result.unanswered.len()).bold().red();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString =
        format!("Discovery Complete: {responded}, {unanswered} in {total_time}").color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output.to_string());
            if !result.excluded.is_empty() {
                print::centerln(&format!("{} targets skipped", result.excluded.len()).dimmed().to_string());
            }
            if result.cancelled {
                print::centerln(&"scan was interrupted, results are partial".yellow().to_string());
            }
        }
        _ => print::print(&output.to_string()),
    }
}
