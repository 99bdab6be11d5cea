//! The seam between the scanner and the wire.
//!
//! A [`Transport`] owns one link-layer channel: it transmits prepared ARP
//! requests and hands back whatever replies arrive inside a hard collection
//! window. A [`TransportFactory`] opens one transport per concurrent worker.

use std::collections::HashSet;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::trace;

use arpsweep_common::config::{DuplicatePolicy, ScanConfig};
use arpsweep_common::error::ScanError;
use arpsweep_common::network::interface::LinkIdentity;
use arpsweep_protocols::arp::{self, ProbeRequest};

use crate::signal::StopSignal;

/// Frames handed over by a capture, or the error that ended it.
pub type CaptureQueue = UnboundedReceiver<io::Result<Vec<u8>>>;

/// A captured frame, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    /// Position in capture order across every transport of one factory.
    pub order: u64,
    pub bytes: Vec<u8>,
}

/// Hands out capture order numbers.
#[derive(Debug, Clone, Default)]
pub struct CaptureClock(Arc<AtomicU64>);

impl CaptureClock {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// One collection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub timeout: Duration,
    /// Keep listening until the deadline even once every target answered,
    /// so a later reply from another hardware address is still captured.
    pub hold_open: bool,
}

impl Window {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            hold_open: false,
        }
    }
}

impl From<&ScanConfig> for Window {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            timeout: cfg.per_target_timeout,
            hold_open: cfg.duplicate_policy == DuplicatePolicy::KeepLatest,
        }
    }
}

#[async_trait]
pub trait Transport: Send {
    fn identity(&self) -> &LinkIdentity;

    /// Sends every request once, then collects replies until the window
    /// elapses, every requested target has answered, or `stop` fires.
    ///
    /// An empty result is a normal outcome. Errors are fatal channel failures.
    async fn sweep(
        &mut self,
        requests: &[ProbeRequest],
        window: Window,
        stop: &StopSignal,
    ) -> Result<Vec<RawReply>, ScanError>;

    async fn send(
        &mut self,
        request: &ProbeRequest,
        window: Window,
        stop: &StopSignal,
    ) -> Result<Vec<RawReply>, ScanError> {
        self.sweep(std::slice::from_ref(request), window, stop).await
    }
}

pub trait TransportFactory: Send + Sync {
    fn identity(&self) -> &LinkIdentity;

    /// Opens a transport with its own channel handle.
    fn open(&self) -> Result<Box<dyn Transport>, ScanError>;
}

/// Drains `rx` for one collection window.
///
/// Only ARP replies are kept. The window ends at the deadline, on `stop`, or
/// once each target in `requests` has been answered to `identity` from a
/// usable hardware address (unless the window is held open). A capture that
/// fails or goes away before then is a [`ScanError::Channel`].
pub async fn collect_replies(
    rx: &mut CaptureQueue,
    clock: &CaptureClock,
    identity: &LinkIdentity,
    requests: &[ProbeRequest],
    window: Window,
    stop: &StopSignal,
) -> Result<Vec<RawReply>, ScanError> {
    let mut outstanding: HashSet<Ipv4Addr> = requests.iter().map(|r| r.target()).collect();
    let mut replies: Vec<RawReply> = Vec::new();

    let deadline = tokio::time::sleep_until(Instant::now() + window.timeout);
    tokio::pin!(deadline);

    while window.hold_open || !outstanding.is_empty() {
        tokio::select! {
            frame = rx.recv() => {
                let bytes = match frame {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => return Err(ScanError::from_channel_io(&identity.interface, e)),
                    None => {
                        return Err(ScanError::from_channel_io(
                            &identity.interface,
                            io::Error::new(io::ErrorKind::BrokenPipe, "capture stopped before the window closed"),
                        ));
                    }
                };
                let Ok(parsed) = arp::parse_frame(&bytes) else {
                    trace!("skipping non-ARP frame ({} bytes)", bytes.len());
                    continue;
                };
                if !parsed.is_reply() {
                    continue;
                }
                if parsed.target_mac == identity.mac && parsed.has_usable_sender() {
                    outstanding.remove(&parsed.sender_ip);
                }
                replies.push(RawReply { order: clock.tick(), bytes });
            }
            _ = &mut deadline => break,
            _ = stop.stopped() => break,
        }
    }

    Ok(replies)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
