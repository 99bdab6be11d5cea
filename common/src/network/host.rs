use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use serde::Serialize;

use crate::network::mac;
use crate::network::target::RejectedTarget;

/// A confirmed IP to hardware address mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HostBinding {
    pub ip: Ipv4Addr,
    #[serde(serialize_with = "mac::serialize_canonical")]
    pub mac: MacAddr,
    /// Capture order of the reply that produced this binding.
    pub first_seen_order: u64,
}

impl HostBinding {
    pub fn new(ip: Ipv4Addr, mac: MacAddr, first_seen_order: u64) -> Self {
        Self {
            ip,
            mac,
            first_seen_order,
        }
    }
}

/// A target removed from the scan before any probe was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedTarget {
    pub target: String,
    pub reason: String,
}

impl From<RejectedTarget> for ExcludedTarget {
    fn from(rejected: RejectedTarget) -> Self {
        Self {
            target: rejected.input,
            reason: rejected.reason,
        }
    }
}

/// Outcome of one scan. Always returned whole, even when most targets stayed silent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Unique by IP, in arrival order.
    pub bindings: Vec<HostBinding>,
    /// Probed targets that never answered.
    pub unanswered: Vec<Ipv4Addr>,
    pub excluded: Vec<ExcludedTarget>,
    /// Set when the scan was stopped before every attempt ran.
    pub cancelled: bool,
}

impl ScanResult {
    pub fn responded(&self) -> usize {
        self.bindings.len()
    }

    /// Number of targets that were actually probed.
    pub fn probed(&self) -> usize {
        self.bindings.len() + self.unanswered.len()
    }

    pub fn binding_for(&self, ip: Ipv4Addr) -> Option<&HostBinding> {
        self.bindings.iter().find(|b| b.ip == ip)
    }

    /// Bindings sorted by address, for stable display across scans.
    pub fn sorted_bindings(&self) -> Vec<HostBinding> {
        let mut bindings = self.bindings.clone();
        bindings.sort_by_key(|b| b.ip);
        bindings
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
