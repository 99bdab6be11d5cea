//! Wire formats spoken by the scanner: Ethernet II framing and ARP over IPv4.

pub mod arp;
pub mod ethernet;
