use std::net::Ipv6Addr;

use colored::*;

use arpsweep_common::network::host::HostBinding;
use arpsweep_common::network::mac;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    let first_byte = ipv6_addr.octets()[0];
    if (0x20..=0x3F).contains(&first_byte) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

pub fn binding_to_details(binding: &HostBinding) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("IPv4".to_string(), binding.ip.to_string().color(colors::IPV4_ADDR)),
        ("MAC".to_string(), mac::canonical(binding.mac).color(colors::MAC_ADDR)),
    ];

    if let Some(vendor) = mac::get_vendor(binding.mac) {
        details.push(("Vendor".to_string(), vendor.color(colors::VENDOR)));
    }

    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
