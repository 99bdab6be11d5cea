//! Turns captured frames into [`HostBinding`]s.
//!
//! Every station on the segment sees every broadcast, so replies addressed to
//! another requester show up in the capture too. Only replies whose ARP target
//! hardware address is our own survive.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use tracing::{debug, trace};

use arpsweep_common::config::DuplicatePolicy;
use arpsweep_common::error::ScanError;
use arpsweep_common::network::host::HostBinding;
use arpsweep_protocols::arp;

use crate::transport::RawReply;

/// What [`BindingTable::offer`] did with a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    New,
    /// Same IP and MAC as the existing binding.
    Duplicate,
    /// Different MAC, existing binding kept.
    Conflict { kept: MacAddr },
    /// Different MAC, existing binding overwritten.
    Replaced { previous: MacAddr },
}

/// Bindings unique by IP under a [`DuplicatePolicy`].
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    policy: DuplicatePolicy,
    index: HashMap<Ipv4Addr, usize>,
    bindings: Vec<HostBinding>,
}

impl BindingTable {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn offer(&mut self, binding: HostBinding) -> Offer {
        let Some(&idx) = self.index.get(&binding.ip) else {
            self.index.insert(binding.ip, self.bindings.len());
            self.bindings.push(binding);
            return Offer::New;
        };

        let existing = &mut self.bindings[idx];
        if existing.mac == binding.mac {
            return Offer::Duplicate;
        }

        match self.policy {
            DuplicatePolicy::KeepFirst => Offer::Conflict { kept: existing.mac },
            DuplicatePolicy::KeepLatest => {
                let previous = existing.mac;
                existing.mac = binding.mac;
                Offer::Replaced { previous }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Bindings in arrival order.
    pub fn into_bindings(mut self) -> Vec<HostBinding> {
        self.bindings.sort_by_key(|b| b.first_seen_order);
        self.bindings
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Correlator {
    own_mac: MacAddr,
    policy: DuplicatePolicy,
}

impl Correlator {
    pub fn new(own_mac: MacAddr, policy: DuplicatePolicy) -> Self {
        Self { own_mac, policy }
    }

    pub fn correlate(&self, replies: &[RawReply]) -> Vec<HostBinding> {
        let mut table = BindingTable::new(self.policy);

        for reply in replies {
            match self.inspect(reply) {
                Ok(Some(binding)) => {
                    if let Offer::Conflict { kept } = table.offer(binding) {
                        debug!(
                            "{} answered again from {} within one window, keeping {kept}",
                            binding.ip, binding.mac
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Dropping frame #{}: {e}", reply.order),
            }
        }

        table.into_bindings()
    }

    fn inspect(&self, reply: &RawReply) -> Result<Option<HostBinding>, ScanError> {
        let frame = arp::parse_frame(&reply.bytes)?;

        if !frame.is_reply() {
            trace!("Frame #{} is not an ARP reply", reply.order);
            return Ok(None);
        }
        if frame.target_mac != self.own_mac {
            trace!("Reply from {} is meant for {}", frame.sender_ip, frame.target_mac);
            return Ok(None);
        }
        if !frame.has_usable_sender() {
            return Err(ScanError::MalformedReply(format!(
                "reply from {} carries sender MAC {}",
                frame.sender_ip, frame.sender_mac
            )));
        }

        Ok(Some(HostBinding::new(frame.sender_ip, frame.sender_mac, reply.order)))
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
