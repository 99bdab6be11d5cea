use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

/// An inclusive span of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Number of addresses covered. Zero when the range is reversed.
    pub fn len(&self) -> u64 {
        let start = u32::from(self.start_addr) as u64;
        let end = u32::from(self.end_addr) as u64;
        if end < start { 0 } else { end - start + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }
}

/// Host addresses of a CIDR block.
///
/// Blocks with a prefix of 30 or shorter drop the network and broadcast
/// addresses; /31 and /32 keep every address since both are usable.
pub fn cidr_hosts(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let network = Ipv4Network::new(ip, prefix)?;
    Ok(network_hosts(&network))
}

pub fn network_hosts(network: &Ipv4Network) -> Ipv4Range {
    let start = u32::from(network.network());
    let end = u32::from(network.broadcast());

    if network.prefix() >= 31 {
        return Ipv4Range::new(start.into(), end.into());
    }
    Ipv4Range::new((start + 1).into(), (end - 1).into())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
