use colored::*;
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

use arpsweep_common::network::mac;

use crate::terminal::format::{self, Detail};
use crate::terminal::{colors, print};

pub fn to_key_value_pair_net(ip_net: &[IpNetwork]) -> Vec<Detail> {
    ip_net
        .iter()
        .map(|ip_network| match ip_network {
            IpNetwork::V4(ipv4_network) => {
                let address: ColoredString = ipv4_network.ip().to_string().color(colors::IPV4_ADDR);
                let prefix: ColoredString =
                    ipv4_network.prefix().to_string().color(colors::IPV4_PREFIX);
                let result: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
                ("IPv4".to_string(), result)
            }
            IpNetwork::V6(ipv6_network) => {
                let address: ColoredString = ipv6_network.ip().to_string().color(colors::IPV6_ADDR);
                let value: ColoredString =
                    format!("{address}/{}", ipv6_network.prefix()).color(colors::SEPARATOR);
                (format::ipv6_to_type_str(&ipv6_network.ip()).to_string(), value)
            }
        })
        .collect()
}

/// Prints one interface as a tree; `status` says whether it can carry a scan.
pub fn print_interface(interface: &NetworkInterface, idx: usize, status: ColoredString) {
    print::tree_head(idx, &interface.name);
    let mut key_value_pair: Vec<Detail> = to_key_value_pair_net(&interface.ips);
    if let Some(mac_addr) = interface.mac {
        key_value_pair.push(("MAC".to_string(), mac::canonical(mac_addr).color(colors::MAC_ADDR)));
    }
    key_value_pair.push(("Status".to_string(), status));
    print::as_tree_one_level(key_value_pair);
}
