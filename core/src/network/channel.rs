//! Raw Ethernet transport backed by `pnet` datalink channels.
//!
//! Opening a channel needs raw socket access (root or `CAP_NET_RAW` on Linux).
//! Frames are read on a dedicated thread and forwarded to the async side over
//! an unbounded queue; the thread exits once the handle is dropped. A read
//! error ends the capture and is handed over through the same queue.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use arpsweep_common::error::ScanError;
use arpsweep_common::network::interface::{self, LinkIdentity};
use arpsweep_protocols::arp::{self, ProbeRequest};

use crate::signal::StopSignal;
use crate::transport::{self, CaptureClock, CaptureQueue, RawReply, Transport, TransportFactory, Window};

/// How long the capture thread blocks before re-checking for shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub struct EthernetHandle {
    pub tx: Box<dyn DataLinkSender>,
    pub rx: CaptureQueue,
    shutdown: Arc<AtomicBool>,
}

impl Drop for EthernetHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Opens a channel through `channel_opener` and starts the capture thread.
pub fn start_capture_with<F>(intf: &NetworkInterface, channel_opener: F) -> Result<EthernetHandle, ScanError>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let (tx, rx) = open_eth_channel(intf, &get_config(), channel_opener)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(AtomicBool::new(false));

    spawn_listener(rx, queue_tx, shutdown.clone(), intf.name.clone());

    Ok(EthernetHandle {
        tx,
        rx: queue_rx,
        shutdown,
    })
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), ScanError>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch: Channel =
        channel_opener(intf, *cfg).map_err(|e| ScanError::from_channel_io(&intf.name, e))?;
    match ch {
        Channel::Ethernet(tx, rx) => {
            debug!("Raw channel opened on {}", intf.name);
            Ok((tx, rx))
        }
        _ => Err(ScanError::from_channel_io(
            &intf.name,
            io::Error::new(io::ErrorKind::Unsupported, "non-ethernet channel"),
        )),
    }
}

fn spawn_listener(
    mut rx: Box<dyn DataLinkReceiver>,
    queue_tx: mpsc::UnboundedSender<io::Result<Vec<u8>>>,
    shutdown: Arc<AtomicBool>,
    name: String,
) {
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) && !queue_tx.is_closed() {
            match rx.next() {
                Ok(frame) => {
                    if arp::is_reply(frame) && queue_tx.send(Ok(frame.to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
                Err(e) => {
                    warn!("Capture on {name} stopped: {e}");
                    let _ = queue_tx.send(Err(e));
                    break;
                }
            }
        }
        debug!("Capture thread on {name} finished");
    });
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
    }
}

/// A [`Transport`] owning one raw channel on one interface.
pub struct PnetTransport {
    identity: LinkIdentity,
    handle: EthernetHandle,
    clock: CaptureClock,
}

impl PnetTransport {
    pub fn open(
        intf: &NetworkInterface,
        identity: LinkIdentity,
        clock: CaptureClock,
    ) -> Result<Self, ScanError> {
        Self::open_with(intf, identity, clock, datalink::channel)
    }

    pub fn open_with<F>(
        intf: &NetworkInterface,
        identity: LinkIdentity,
        clock: CaptureClock,
        channel_opener: F,
    ) -> Result<Self, ScanError>
    where
        F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
    {
        let handle = start_capture_with(intf, channel_opener)?;
        Ok(Self {
            identity,
            handle,
            clock,
        })
    }
}

#[async_trait]
impl Transport for PnetTransport {
    fn identity(&self) -> &LinkIdentity {
        &self.identity
    }

    async fn sweep(
        &mut self,
        requests: &[ProbeRequest],
        window: Window,
        stop: &StopSignal,
    ) -> Result<Vec<RawReply>, ScanError> {
        for request in requests {
            if let Some(Err(e)) = self.handle.tx.send_to(request.frame(), None) {
                debug!("Sending to {} failed: {e}", request.target());
                return Err(ScanError::from_channel_io(&self.identity.interface, e));
            }
        }

        transport::collect_replies(
            &mut self.handle.rx,
            &self.clock,
            &self.identity,
            requests,
            window,
            stop,
        )
        .await
    }
}

/// Opens [`PnetTransport`]s on one selected interface.
pub struct PnetTransportFactory {
    interface: NetworkInterface,
    identity: LinkIdentity,
    clock: CaptureClock,
}

impl PnetTransportFactory {
    /// Selects the interface by `name`, or automatically when `None`.
    pub fn new(name: Option<&str>) -> Result<Self, ScanError> {
        let (interface, identity) = interface::select_from_system(name)?;
        if !is_root::is_root() {
            warn!("Not running as root, opening a raw channel on {} will likely fail", interface.name);
        }
        Ok(Self {
            interface,
            identity,
            clock: CaptureClock::default(),
        })
    }
}

impl TransportFactory for PnetTransportFactory {
    fn identity(&self) -> &LinkIdentity {
        &self.identity
    }

    fn open(&self) -> Result<Box<dyn Transport>, ScanError> {
        let transport = PnetTransport::open(&self.interface, self.identity.clone(), self.clock.clone())?;
        Ok(Box::new(transport))
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
