//! # Scan Target Model
//!
//! Parses what the user asks to scan into a [`TargetRange`].
//!
//! Accepted forms, optionally joined with commas:
//! * A single IPv4 address (`192.168.1.5`).
//! * A dashed range (`192.168.1.1-50`, `192.168.1.1-192.168.2.9`).
//! * A CIDR block (`192.168.1.0/24`).
//! * The `lan` keyword, resolved against the selected interface's network.
//!
//! Entries of a list that fail to parse are kept as [`RejectedTarget`]s so the
//! rest of the list still gets scanned. A list where nothing parses is an error.

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::ScanError;
use crate::network::range::{self, Ipv4Range};

/// Largest number of addresses a single scan expands to.
pub const MAX_TARGETS: u64 = 65_536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Every host address of the scanning interface's IPv4 network.
    Lan,
    Host(Ipv4Addr),
    Range(Ipv4Range),
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Lan => write!(f, "lan"),
            TargetSpec::Host(addr) => write!(f, "{addr}"),
            TargetSpec::Range(r) => write!(f, "{}-{}", r.start_addr, r.end_addr),
        }
    }
}

/// An input entry that could not become a target address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTarget {
    pub input: String,
    pub reason: String,
}

impl RejectedTarget {
    pub fn new(input: impl ToString, reason: impl ToString) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn to_error(&self) -> ScanError {
        ScanError::invalid_target(&self.input, &self.reason)
    }
}

/// The concrete addresses of a [`TargetRange`] once `lan` has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Unique addresses in input order.
    pub addresses: Vec<Ipv4Addr>,
    pub rejected: Vec<RejectedTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRange {
    specs: Vec<TargetSpec>,
    rejected: Vec<RejectedTarget>,
}

impl TargetRange {
    pub fn from_specs(specs: Vec<TargetSpec>) -> Self {
        Self {
            specs,
            rejected: Vec::new(),
        }
    }

    pub fn from_addrs(addrs: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self::from_specs(addrs.into_iter().map(TargetSpec::Host).collect())
    }

    pub fn specs(&self) -> &[TargetSpec] {
        &self.specs
    }

    pub fn rejected(&self) -> &[RejectedTarget] {
        &self.rejected
    }

    /// Expands every spec into unique addresses.
    ///
    /// `lan` is the interface network used for [`TargetSpec::Lan`]; without one
    /// the keyword is rejected. Expansion stops accepting specs once
    /// [`MAX_TARGETS`] addresses have been collected.
    pub fn expand(&self, lan: Option<Ipv4Network>) -> Expansion {
        let mut seen: HashSet<Ipv4Addr> = HashSet::new();
        let mut expansion = Expansion {
            addresses: Vec::new(),
            rejected: self.rejected.clone(),
        };

        for spec in &self.specs {
            let span: Ipv4Range = match spec {
                TargetSpec::Host(addr) => Ipv4Range::new(*addr, *addr),
                TargetSpec::Range(r) => *r,
                TargetSpec::Lan => match lan {
                    Some(net) => range::network_hosts(&net),
                    None => {
                        expansion.rejected.push(RejectedTarget::new(
                            spec,
                            "the selected interface has no IPv4 network",
                        ));
                        continue;
                    }
                },
            };

            if seen.len() as u64 + span.len() > MAX_TARGETS {
                expansion.rejected.push(RejectedTarget::new(
                    spec,
                    format!("scan would exceed {MAX_TARGETS} addresses"),
                ));
                continue;
            }

            for addr in span.to_iter() {
                if seen.insert(addr) {
                    expansion.addresses.push(addr);
                }
            }
        }

        expansion
    }
}

impl FromStr for TargetRange {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut target = TargetRange::default();

        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match parse_spec(part) {
                Ok(spec) => target.specs.push(spec),
                Err(reason) => target.rejected.push(RejectedTarget::new(part, reason)),
            }
        }

        if target.specs.is_empty() {
            return Err(match target.rejected.first() {
                Some(rejected) => rejected.to_error(),
                None => ScanError::invalid_target(s, "no target given"),
            });
        }

        Ok(target)
    }
}

fn parse_spec(s: &str) -> Result<TargetSpec, String> {
    if s.eq_ignore_ascii_case("lan") {
        return Ok(TargetSpec::Lan);
    }

    if let Ok(addr) = s.parse::<IpAddr>() {
        return match addr {
            IpAddr::V4(v4) => Ok(TargetSpec::Host(v4)),
            IpAddr::V6(_) => Err("IPv6 has no ARP, only IPv4 targets are supported".into()),
        };
    }

    if let Some(spec) = parse_cidr_range(s)? {
        return Ok(spec);
    }

    if let Some(spec) = parse_ip_range(s)? {
        return Ok(spec);
    }

    // Re-parse for the standard library's error message.
    match s.parse::<Ipv4Addr>() {
        Ok(addr) => Ok(TargetSpec::Host(addr)),
        Err(e) => Err(e.to_string()),
    }
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<TargetSpec>, String> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid start address '{start_str}': {e}"))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr, s)?;
    let ipv4_range = Ipv4Range::new(start_addr, end_addr);

    if ipv4_range.is_empty() {
        return Err(format!("range end {end_addr} is before its start {start_addr}"));
    }
    if ipv4_range.len() > MAX_TARGETS {
        return Err(format!("range covers more than {MAX_TARGETS} addresses"));
    }

    Ok(Some(TargetSpec::Range(ipv4_range)))
}

/// Parses the end of a dashed range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err(format!("range end cannot be empty: {original_s}"));
    }

    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("invalid range end '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("range end has too many octets: {end_str}"));
    }

    let mut end_octets = start_addr.octets();
    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<TargetSpec>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid address in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("invalid prefix in CIDR '{prefix_str}': {e}"))?;

    let ipv4_range = range::cidr_hosts(ipv4_addr, prefix).map_err(|e| e.to_string())?;
    if ipv4_range.len() > MAX_TARGETS {
        return Err(format!("/{prefix} covers more than {MAX_TARGETS} addresses"));
    }

    Ok(Some(TargetSpec::Range(ipv4_range)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
