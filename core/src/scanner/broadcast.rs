//! One shared listener, one collection window per attempt.
//!
//! Each attempt sends a request for every still-unbound target back to back on
//! a single transport and then listens once. Only that one consumer ever reads
//! the channel.

use tracing::debug;

use arpsweep_common::config::ScanConfig;
use arpsweep_common::error::ScanError;
use arpsweep_protocols::arp::ProbeRequest;

use crate::correlator::Correlator;
use crate::signal::StopSignal;
use crate::transport::{TransportFactory, Window};

use super::ledger::{ScanEvent, ScanLedger};

pub(super) async fn run(
    factory: &dyn TransportFactory,
    requests: &[ProbeRequest],
    cfg: &ScanConfig,
    stop: &StopSignal,
    ledger: &mut ScanLedger,
) -> Result<(), ScanError> {
    let mut transport = factory.open()?;
    let correlator = Correlator::new(factory.identity().mac, cfg.duplicate_policy);
    let attempts = cfg.attempts();

    for attempt in 1..=attempts {
        if stop.is_stopped() {
            break;
        }

        let pending: Vec<ProbeRequest> = requests
            .iter()
            .filter(|r| !ledger.is_bound(r.target()))
            .cloned()
            .collect();
        if pending.is_empty() {
            break;
        }

        debug!(
            "Broadcast attempt {attempt}/{attempts}: {} requests on {}",
            pending.len(),
            transport.identity().interface
        );
        for request in &pending {
            ledger.apply(ScanEvent::Sent(request.target()));
        }

        let replies = transport.sweep(&pending, Window::from(cfg), stop).await?;
        ledger.apply(ScanEvent::Bindings(correlator.correlate(&replies)));

        // a window cut short by the stop signal is not a timeout
        if stop.is_stopped() {
            break;
        }
        for request in &pending {
            if !ledger.is_bound(request.target()) {
                ledger.apply(ScanEvent::TimedOut(request.target()));
            }
        }
    }

    Ok(())
}
