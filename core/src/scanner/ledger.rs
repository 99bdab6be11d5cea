//! The single aggregation point of a scan.
//!
//! Every probe outcome, whichever worker produced it, is applied here in order,
//! so first-arrival deduplication holds no matter how many transports run.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, trace, warn};

use arpsweep_common::config::DuplicatePolicy;
use arpsweep_common::error::ScanError;
use arpsweep_common::network::host::{ExcludedTarget, HostBinding, ScanResult};
use arpsweep_common::success;

use crate::correlator::{BindingTable, Offer};

pub type HostCallback = Box<dyn Fn(usize) + Send + Sync>;

/// Where a single target is in its probe lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    Sent { attempt: u32 },
    Bound,
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Sent(Ipv4Addr),
    Bindings(Vec<HostBinding>),
    /// The collection window closed without an answer from this target.
    TimedOut(Ipv4Addr),
}

pub struct ScanLedger {
    targets: Vec<Ipv4Addr>,
    states: HashMap<Ipv4Addr, TargetState>,
    table: BindingTable,
    excluded: Vec<ExcludedTarget>,
    on_host_found: Option<HostCallback>,
}

impl ScanLedger {
    pub fn new(targets: Vec<Ipv4Addr>, policy: DuplicatePolicy, excluded: Vec<ExcludedTarget>) -> Self {
        let states = targets.iter().map(|ip| (*ip, TargetState::Pending)).collect();
        Self {
            targets,
            states,
            table: BindingTable::new(policy),
            excluded,
            on_host_found: None,
        }
    }

    /// Called with the running host count each time a new target binds.
    pub fn on_host_found(mut self, callback: HostCallback) -> Self {
        self.on_host_found = Some(callback);
        self
    }

    pub fn apply(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Sent(ip) => self.mark_sent(ip),
            ScanEvent::Bindings(bindings) => {
                for binding in bindings {
                    self.bind(binding);
                }
            }
            ScanEvent::TimedOut(ip) => self.mark_timed_out(ip),
        }
    }

    pub fn state(&self, ip: Ipv4Addr) -> Option<TargetState> {
        self.states.get(&ip).copied()
    }

    pub fn is_bound(&self, ip: Ipv4Addr) -> bool {
        self.state(ip) == Some(TargetState::Bound)
    }

    /// Targets without a binding yet, in input order.
    pub fn pending(&self) -> Vec<Ipv4Addr> {
        self.targets.iter().copied().filter(|ip| !self.is_bound(*ip)).collect()
    }

    pub fn bound(&self) -> usize {
        self.table.len()
    }

    pub fn finish(self, cancelled: bool) -> ScanResult {
        let unanswered = self.pending();
        ScanResult {
            bindings: self.table.into_bindings(),
            unanswered,
            excluded: self.excluded,
            cancelled,
        }
    }

    fn mark_sent(&mut self, ip: Ipv4Addr) {
        let Some(state) = self.states.get_mut(&ip) else {
            return;
        };
        *state = match *state {
            TargetState::Pending => TargetState::Sent { attempt: 1 },
            TargetState::TimedOut { attempts } => TargetState::Sent { attempt: attempts + 1 },
            other => other,
        };
        trace!("{ip} -> {state:?}");
    }

    fn mark_timed_out(&mut self, ip: Ipv4Addr) {
        let Some(state) = self.states.get_mut(&ip) else {
            return;
        };
        if let TargetState::Sent { attempt } = *state {
            *state = TargetState::TimedOut { attempts: attempt };
            debug!("{} (attempt {attempt})", ScanError::TimeoutExceeded(ip));
        }
    }

    fn bind(&mut self, binding: HostBinding) {
        let Some(state) = self.states.get_mut(&binding.ip) else {
            debug!("Ignoring reply from {} ({}), not a scan target", binding.ip, binding.mac);
            return;
        };

        match self.table.offer(binding) {
            Offer::New => {
                *state = TargetState::Bound;
                success!("{} is at {}", binding.ip, binding.mac);
                if let Some(callback) = &self.on_host_found {
                    callback(self.table.len());
                }
            }
            Offer::Duplicate => {}
            Offer::Conflict { kept } => {
                warn!(
                    "{} also answered from {}, keeping first reply {kept}",
                    binding.ip, binding.mac
                );
            }
            Offer::Replaced { previous } => {
                warn!("{} moved from {previous} to {}", binding.ip, binding.mac);
            }
        }
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
