//! ARP request construction and reply parsing.
//!
//! Requests go out as broadcast Ethernet frames padded to the 60 byte
//! minimum. Parsing accepts any captured frame and reports why it is not a
//! usable Ethernet/IPv4 ARP packet.

use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use arpsweep_common::error::ScanError;
use arpsweep_common::network::interface::LinkIdentity;

use crate::ethernet::{self, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};

pub const ARP_LEN: usize = 28;

/// A single ARP query, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    target: Ipv4Addr,
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    frame: [u8; MIN_ETH_FRAME_NO_FCS],
}

impl ProbeRequest {
    pub fn target(&self) -> Ipv4Addr {
        self.target
    }

    pub fn src_mac(&self) -> MacAddr {
        self.src_mac
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.src_addr
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }
}

/// Builds [`ProbeRequest`]s on behalf of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBuilder {
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
}

impl FrameBuilder {
    pub fn new(src_mac: MacAddr, src_addr: Ipv4Addr) -> Self {
        Self { src_mac, src_addr }
    }

    pub fn build(&self, target: Ipv4Addr) -> Result<ProbeRequest, ScanError> {
        validate_target(target)?;

        let mut frame = [0u8; MIN_ETH_FRAME_NO_FCS];
        write_frame(
            &mut frame,
            ArpOperations::Request,
            self.src_mac,
            MacAddr::broadcast(),
            (self.src_mac, self.src_addr),
            (MacAddr::zero(), target),
        )
        .map_err(|e| ScanError::invalid_target(target, e))?;

        Ok(ProbeRequest {
            target,
            src_mac: self.src_mac,
            src_addr: self.src_addr,
            frame,
        })
    }
}

impl From<&LinkIdentity> for FrameBuilder {
    fn from(identity: &LinkIdentity) -> Self {
        Self::new(identity.mac, identity.ipv4)
    }
}

/// Rejects addresses no station can own: loopback, multicast, unspecified and
/// the limited broadcast address.
pub fn validate_target(target: Ipv4Addr) -> Result<(), ScanError> {
    let reason = if target.is_loopback() {
        "loopback address"
    } else if target.is_multicast() {
        "multicast address"
    } else if target.is_unspecified() {
        "unspecified address"
    } else if target.is_broadcast() {
        "broadcast address"
    } else {
        return Ok(());
    };
    Err(ScanError::invalid_target(target, reason))
}

/// The fields of a captured Ethernet/IPv4 ARP frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpFrame {
    pub operation: ArpOperation,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpFrame {
    pub fn is_reply(&self) -> bool {
        self.operation == ArpOperations::Reply
    }

    /// False for the zero and broadcast hardware addresses, which no station owns.
    pub fn has_usable_sender(&self) -> bool {
        self.sender_mac != MacAddr::zero() && self.sender_mac != MacAddr::broadcast()
    }
}

pub fn parse_frame(bytes: &[u8]) -> Result<ArpFrame, ScanError> {
    let eth: EthernetPacket = ethernet::get_packet_from_u8(bytes)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return Err(ScanError::MalformedReply(format!(
            "unexpected ethertype 0x{:04x}",
            eth.get_ethertype().0
        )));
    }

    let arp = ArpPacket::new(eth.payload()).ok_or_else(|| {
        ScanError::MalformedReply(format!(
            "truncated or invalid ARP packet (payload len {})",
            eth.payload().len()
        ))
    })?;

    if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
        || arp.get_protocol_type() != EtherTypes::Ipv4
        || arp.get_hw_addr_len() != 6
        || arp.get_proto_addr_len() != 4
    {
        return Err(ScanError::MalformedReply("ARP packet is not Ethernet/IPv4".into()));
    }

    Ok(ArpFrame {
        operation: arp.get_operation(),
        sender_mac: arp.get_sender_hw_addr(),
        sender_ip: arp.get_sender_proto_addr(),
        target_mac: arp.get_target_hw_addr(),
        target_ip: arp.get_target_proto_addr(),
    })
}

/// Capture-side filter: only ARP replies are worth handing to the scanner.
pub fn is_reply(bytes: &[u8]) -> bool {
    parse_frame(bytes).is_ok_and(|frame| frame.is_reply())
}

/// Encodes an ARP reply from `sender` to `requester`.
///
/// The scanner never sends replies; this exists for simulated segments and tests.
pub fn reply_frame(
    sender: (MacAddr, Ipv4Addr),
    requester: (MacAddr, Ipv4Addr),
) -> anyhow::Result<Vec<u8>> {
    let mut frame = [0u8; MIN_ETH_FRAME_NO_FCS];
    write_frame(&mut frame, ArpOperations::Reply, sender.0, requester.0, sender, requester)?;
    Ok(frame.to_vec())
}

fn write_frame(
    buffer: &mut [u8],
    operation: ArpOperation,
    eth_src: MacAddr,
    eth_dst: MacAddr,
    sender: (MacAddr, Ipv4Addr),
    target: (MacAddr, Ipv4Addr),
) -> anyhow::Result<()> {
    ethernet::make_header(buffer, eth_src, eth_dst, EtherTypes::Arp)?;
    let mut arp = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .context("failed to create mutable ARP packet")?;
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(operation);
    arp.set_sender_hw_addr(sender.0);
    arp.set_sender_proto_addr(sender.1);
    arp.set_target_hw_addr(target.0);
    arp.set_target_proto_addr(target.1);
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
