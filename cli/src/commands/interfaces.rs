use colored::*;
use pnet::datalink::{self, NetworkInterface};

use arpsweep_common::network::interface;

use crate::commands::Config;
use crate::mprint;
use crate::terminal::{network_fmt, print};

pub fn interfaces(cfg: &Config) -> anyhow::Result<()> {
    let all: Vec<NetworkInterface> = datalink::interfaces();
    let selected: Option<String> = interface::select(None, &all).ok().map(|(intf, _)| intf.name);

    print::header("network interfaces", cfg.quiet);

    for (idx, intf) in all.iter().enumerate() {
        let status: ColoredString = match interface::check_viability(intf) {
            Ok(()) if selected.as_deref() == Some(intf.name.as_str()) => "default for scans".green().bold(),
            Ok(()) => "usable".green(),
            Err(reason) => reason.to_string().dimmed(),
        };
        network_fmt::print_interface(intf, idx, status);
        if idx + 1 != all.len() {
            mprint!();
        }
    }

    if selected.is_none() {
        tracing::warn!("No interface is usable for ARP, pass one with -i once it is up");
    }
    Ok(())
}
