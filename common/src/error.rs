use std::io;
use std::net::Ipv4Addr;

use thiserror::Error;

/// Every failure a scan can run into.
///
/// Interface, permission and channel failures abort a scan. The others are
/// per-target or per-frame conditions that end up in the scan result or in
/// the debug log.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Bad address or range syntax, or an address that can never answer ARP.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The interface named by the caller does not exist.
    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    /// The named interface exists but cannot carry ARP.
    #[error("interface '{interface}' cannot be used: {reason}")]
    InterfaceUnusable { interface: String, reason: String },

    /// Automatic selection found no interface usable for ARP.
    #[error("no usable interface: need one that is up, not loopback, with a MAC and an IPv4 address")]
    NoUsableInterface,

    /// The raw link-layer channel could not be opened for lack of privilege.
    #[error("permission denied opening a raw channel on '{interface}' (try running as root)")]
    Permission {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// Any other failure of the raw channel.
    #[error("raw channel on '{interface}' failed: {source}")]
    Channel {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// A target did not answer within its collection window.
    #[error("no reply from {0} before the deadline")]
    TimeoutExceeded(Ipv4Addr),

    /// A captured frame could not be parsed as an ARP packet.
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

impl ScanError {
    pub fn invalid_target(target: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Maps an I/O error from opening or using the channel on `interface`.
    pub fn from_channel_io(interface: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::Permission {
                interface: interface.to_string(),
                source,
            },
            _ => Self::Channel {
                interface: interface.to_string(),
                source,
            },
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
