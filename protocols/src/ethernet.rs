use anyhow::Context;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

use arpsweep_common::error::ScanError;

pub const ETH_HDR_LEN: usize = 14;
/// Shortest Ethernet frame on the wire, without the frame check sequence.
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;

pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    ethertype: EtherType,
) -> anyhow::Result<()> {
    let mut eth = MutableEthernetPacket::new(buffer).context("buffer too small for an Ethernet header")?;
    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(ethertype);
    Ok(())
}

pub fn get_packet_from_u8(bytes: &[u8]) -> Result<EthernetPacket<'_>, ScanError> {
    EthernetPacket::new(bytes).ok_or_else(|| {
        ScanError::MalformedReply(format!("truncated Ethernet frame ({} bytes)", bytes.len()))
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
