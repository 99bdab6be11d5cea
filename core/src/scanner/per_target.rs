//! A bounded pool of workers, each owning one transport.
//!
//! Workers pull requests from a shared queue and probe one target per window,
//! retrying it on their own. Outcomes are reported over a channel and applied
//! to the ledger by the caller's task only.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, trace};

use arpsweep_common::config::ScanConfig;
use arpsweep_common::error::ScanError;
use arpsweep_protocols::arp::ProbeRequest;

use crate::correlator::Correlator;
use crate::signal::StopSignal;
use crate::transport::{Transport, TransportFactory, Window};

use super::ledger::{ScanEvent, ScanLedger};

type Queue = Arc<Mutex<VecDeque<ProbeRequest>>>;

struct Worker {
    id: usize,
    transport: Box<dyn Transport>,
    queue: Queue,
    events: mpsc::UnboundedSender<ScanEvent>,
    correlator: Correlator,
    window: Window,
    attempts: u32,
    stop: StopSignal,
}

impl Worker {
    async fn run(mut self) -> Result<(), ScanError> {
        while !self.stop.is_stopped() {
            let Some(request) = self.queue.lock().await.pop_front() else {
                break;
            };
            self.probe(&request).await?;
        }
        trace!("Worker {} done", self.id);
        Ok(())
    }

    async fn probe(&mut self, request: &ProbeRequest) -> Result<(), ScanError> {
        let target = request.target();

        for attempt in 1..=self.attempts {
            if self.stop.is_stopped() {
                return Ok(());
            }
            if attempt > 1 {
                debug!("Worker {} retrying {target} ({attempt}/{})", self.id, self.attempts);
            }

            self.emit(ScanEvent::Sent(target));
            let replies = self.transport.send(request, self.window, &self.stop).await?;
            let bindings = self.correlator.correlate(&replies);
            let answered = bindings.iter().any(|b| b.ip == target);
            if !bindings.is_empty() {
                self.emit(ScanEvent::Bindings(bindings));
            }

            if answered || self.stop.is_stopped() {
                return Ok(());
            }
            self.emit(ScanEvent::TimedOut(target));
        }
        Ok(())
    }

    fn emit(&self, event: ScanEvent) {
        // the receiver only goes away once the scan is already returning
        let _ = self.events.send(event);
    }
}

pub(super) async fn run(
    factory: &dyn TransportFactory,
    requests: Vec<ProbeRequest>,
    cfg: &ScanConfig,
    stop: &StopSignal,
    ledger: &mut ScanLedger,
) -> Result<(), ScanError> {
    let pool_size = cfg.effective_workers(requests.len());

    // open every channel before the first probe so a permission failure aborts cleanly
    let transports = (0..pool_size)
        .map(|_| factory.open())
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Probing {} targets with {pool_size} workers", requests.len());

    let queue: Queue = Arc::new(Mutex::new(requests.into()));
    let correlator = Correlator::new(factory.identity().mac, cfg.duplicate_policy);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let mut workers = JoinSet::new();
    for (id, transport) in transports.into_iter().enumerate() {
        let worker = Worker {
            id,
            transport,
            queue: queue.clone(),
            events: events_tx.clone(),
            correlator,
            window: Window::from(cfg),
            attempts: cfg.attempts(),
            stop: stop.clone(),
        };
        workers.spawn(worker.run());
    }
    drop(events_tx);

    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => ledger.apply(event),
            joined = workers.join_next() => match joined {
                None => break,
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(e))) => {
                    workers.abort_all();
                    return Err(e);
                }
                Some(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Some(Err(e)) => debug!("Worker cancelled: {e}"),
            },
        }
    }

    while let Ok(event) = events_rx.try_recv() {
        ledger.apply(event);
    }

    Ok(())
}
