use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::util::MacAddr;

use crate::error::ScanError;

/// Why an interface cannot carry an ARP scan.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no non-loopback IPv4 address to put in the ARP sender field.
    NoIpv4Address,
}

impl fmt::Display for ViabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ViabilityError::IsDown => "interface is down",
            ViabilityError::IsLoopback => "loopback interface",
            ViabilityError::NoMacAddress => "no hardware address",
            ViabilityError::IsPointToPoint => "point-to-point link",
            ViabilityError::NoIpv4Address => "no IPv4 address",
        };
        f.write_str(reason)
    }
}

/// What a transport needs to know about the interface it sends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkIdentity {
    pub interface: String,
    pub mac: MacAddr,
    pub ipv4: Ipv4Addr,
    pub network: Option<Ipv4Network>,
}

impl LinkIdentity {
    pub fn new(interface: impl Into<String>, mac: MacAddr, network: Ipv4Network) -> Self {
        Self {
            interface: interface.into(),
            mac,
            ipv4: network.ip(),
            network: Some(network),
        }
    }

    /// Whether `addr` sits on the directly attached IPv4 network.
    pub fn is_on_link(&self, addr: Ipv4Addr) -> bool {
        self.network.is_some_and(|net| net.contains(addr))
    }
}

impl TryFrom<&NetworkInterface> for LinkIdentity {
    type Error = ViabilityError;

    fn try_from(interface: &NetworkInterface) -> Result<Self, Self::Error> {
        check_viability(interface)?;
        let mac = interface.mac.ok_or(ViabilityError::NoMacAddress)?;
        let network = first_ipv4_network(interface).ok_or(ViabilityError::NoIpv4Address)?;
        Ok(LinkIdentity::new(interface.name.clone(), mac, network))
    }
}

/// Picks the interface to scan from.
///
/// With a `name`, that interface must exist and be usable. Without one, the
/// first interface that is up, not loopback, and has a MAC plus a non-loopback
/// IPv4 address wins.
pub fn select(
    name: Option<&str>,
    interfaces: &[NetworkInterface],
) -> Result<(NetworkInterface, LinkIdentity), ScanError> {
    if let Some(name) = name {
        let interface = interfaces
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| ScanError::InterfaceNotFound(name.to_string()))?;
        let identity =
            LinkIdentity::try_from(interface).map_err(|e| ScanError::InterfaceUnusable {
                interface: name.to_string(),
                reason: e.to_string(),
            })?;
        return Ok((interface.clone(), identity));
    }

    interfaces
        .iter()
        .find_map(|i| LinkIdentity::try_from(i).ok().map(|id| (i.clone(), id)))
        .ok_or(ScanError::NoUsableInterface)
}

/// [`select`] over the interfaces reported by the operating system.
pub fn select_from_system(
    name: Option<&str>,
) -> Result<(NetworkInterface, LinkIdentity), ScanError> {
    select(name, &datalink::interfaces())
}

pub fn check_viability(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none_or(|mac| mac == MacAddr::zero()) {
        return Err(ViabilityError::NoMacAddress);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    if first_ipv4_network(interface).is_none() {
        return Err(ViabilityError::NoIpv4Address);
    }
    Ok(())
}

fn first_ipv4_network(interface: &NetworkInterface) -> Option<Ipv4Network> {
    interface.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some(*v4),
        _ => None,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
