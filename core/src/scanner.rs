//! Scan orchestration.
//!
//! A [`Scan`] turns a [`TargetRange`] into probe requests, drives them through
//! transports opened from a [`TransportFactory`] and folds every outcome into
//! a [`ScanResult`]. Lack of replies never fails a scan: the result carries
//! whatever was bound plus the targets that stayed silent. Only interface and
//! channel failures surface as errors: interface and permission problems
//! before any probe is sent, a broken capture as soon as it is noticed.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use arpsweep_common::config::{ScanConfig, ScanMode};
use arpsweep_common::error::ScanError;
use arpsweep_common::network::host::{ExcludedTarget, ScanResult};
use arpsweep_common::network::interface::LinkIdentity;
use arpsweep_common::network::target::TargetRange;
use arpsweep_protocols::arp::{FrameBuilder, ProbeRequest};

use crate::network::channel::PnetTransportFactory;
use crate::signal::StopSignal;
use crate::transport::TransportFactory;

mod broadcast;
pub mod ledger;
mod per_target;

use ledger::{HostCallback, ScanLedger};

pub struct Scan {
    factory: Arc<dyn TransportFactory>,
    cfg: ScanConfig,
    stop: StopSignal,
    on_host_found: Option<HostCallback>,
}

impl Scan {
    pub fn new(factory: Arc<dyn TransportFactory>, cfg: ScanConfig) -> Self {
        Self {
            factory,
            cfg,
            stop: StopSignal::never(),
            on_host_found: None,
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Registers a callback receiving the running host count.
    pub fn on_host_found(mut self, callback: HostCallback) -> Self {
        self.on_host_found = Some(callback);
        self
    }

    pub async fn run(self, range: &TargetRange) -> Result<ScanResult, ScanError> {
        let identity = self.factory.identity().clone();
        let plan = Plan::new(range, &identity);

        for excluded in &plan.excluded {
            warn!("Skipping {}: {}", excluded.target, excluded.reason);
        }
        if plan.requests.is_empty() {
            info!("Nothing left to probe");
            return Ok(ScanResult {
                excluded: plan.excluded,
                ..Default::default()
            });
        }

        let targets: Vec<Ipv4Addr> = plan.requests.iter().map(|r| r.target()).collect();
        let mode = resolve_mode(self.cfg.mode, &identity, &targets);
        info!(
            "Scanning {} targets on {} ({:?} mode, {} attempt(s))",
            targets.len(),
            identity.interface,
            mode,
            self.cfg.attempts()
        );

        let mut ledger = ScanLedger::new(targets, self.cfg.duplicate_policy, plan.excluded);
        if let Some(callback) = self.on_host_found {
            ledger = ledger.on_host_found(callback);
        }

        match mode {
            ScanMode::PerTarget => {
                per_target::run(&*self.factory, plan.requests, &self.cfg, &self.stop, &mut ledger).await?
            }
            _ => broadcast::run(&*self.factory, &plan.requests, &self.cfg, &self.stop, &mut ledger).await?,
        }

        let cancelled = self.stop.is_stopped();
        if cancelled {
            warn!("Scan cancelled, returning partial result");
        }
        Ok(ledger.finish(cancelled))
    }
}

/// Scans `range` over a raw channel on the configured interface.
///
/// `on_host_found` receives the running host count each time a new binding
/// lands.
pub async fn scan(
    range: &TargetRange,
    cfg: ScanConfig,
    stop: StopSignal,
    on_host_found: Option<HostCallback>,
) -> Result<ScanResult, ScanError> {
    let factory = PnetTransportFactory::new(cfg.interface.as_deref())?;
    let mut scan = Scan::new(Arc::new(factory), cfg).with_stop_signal(stop);
    if let Some(callback) = on_host_found {
        scan = scan.on_host_found(callback);
    }
    scan.run(range).await
}

/// Requests to send and targets dropped before sending.
#[derive(Debug, Default)]
struct Plan {
    requests: Vec<ProbeRequest>,
    excluded: Vec<ExcludedTarget>,
}

impl Plan {
    fn new(range: &TargetRange, identity: &LinkIdentity) -> Self {
        let expansion = range.expand(identity.network);
        let builder = FrameBuilder::from(identity);
        let mut plan = Plan {
            excluded: expansion.rejected.into_iter().map(ExcludedTarget::from).collect(),
            ..Default::default()
        };

        for addr in expansion.addresses {
            if addr == identity.ipv4 {
                plan.excluded.push(ExcludedTarget {
                    target: addr.to_string(),
                    reason: format!("own address of {}", identity.interface),
                });
                continue;
            }
            match builder.build(addr) {
                Ok(request) => plan.requests.push(request),
                Err(ScanError::InvalidTarget { target, reason }) => {
                    plan.excluded.push(ExcludedTarget { target, reason })
                }
                Err(e) => plan.excluded.push(ExcludedTarget {
                    target: addr.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        plan
    }
}

fn resolve_mode(mode: ScanMode, identity: &LinkIdentity, targets: &[Ipv4Addr]) -> ScanMode {
    if mode != ScanMode::Auto {
        return mode;
    }
    if targets.iter().all(|t| identity.is_on_link(*t)) {
        ScanMode::Broadcast
    } else {
        debug!("Some targets lie outside {:?}, probing them one by one", identity.network);
        ScanMode::PerTarget
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
