use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use pnet::util::MacAddr;

use arpsweep_common::error::ScanError;
use arpsweep_common::network::interface::{self, LinkIdentity, ViabilityError};

/*************************************************************
                 Automatic interface selection
**************************************************************/

#[test]
fn auto_selects_enp9s0() {
    let (selected, identity) = interface::select(None, &iface_all()).unwrap();
    assert_eq!(selected, enp9s0());
    assert_eq!(identity.ipv4, Ipv4Addr::new(192, 168, 0, 32));
    assert_eq!(identity.network.map(|n| n.prefix()), Some(24));
}

#[test]
fn auto_selects_nothing_without_an_ipv4_lan() {
    let interfaces: Vec<NetworkInterface> = vec![lo(), veth1234(), tun0(), ipv6leakintrf0()];
    let selected = interface::select(None, &interfaces);
    assert!(
        matches!(selected, Err(ScanError::NoUsableInterface)),
        "Expected no interface, received: {selected:?}"
    );
}

#[test]
fn auto_selects_wlan0() {
    let interfaces: Vec<NetworkInterface> = vec![ipv6leakintrf0(), lo(), veth1234(), wlan0()];
    assert_eq!(wlan0(), interface::select(None, &interfaces).unwrap().0);
}

#[test]
fn auto_selects_eth1() {
    let interfaces: Vec<NetworkInterface> = vec![lo(), ipv6leakintrf0(), veth1234(), eth1()];
    assert_eq!(eth1(), interface::select(None, &interfaces).unwrap().0);
}

/*************************************************************
                   Selection by interface name
**************************************************************/

#[test]
fn named_interface_is_used_even_when_not_first() {
    let (selected, identity) = interface::select(Some("br0"), &iface_all()).unwrap();
    assert_eq!(selected, br0());
    assert_eq!(
        identity,
        LinkIdentity::new(
            "br0",
            MacAddr::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x01),
            Ipv4Network::new(Ipv4Addr::new(192, 168, 100, 1), 24).unwrap(),
        )
    );
}

#[test]
fn missing_name_is_interface_not_found() {
    let err = interface::select(Some("eth9"), &iface_all()).unwrap_err();
    assert!(matches!(err, ScanError::InterfaceNotFound(ref name) if name == "eth9"));
}

#[test]
fn unusable_named_interface_reports_why() {
    let err = interface::select(Some("tun0"), &iface_all()).unwrap_err();
    assert!(matches!(err, ScanError::InterfaceUnusable { ref interface, .. } if interface == "tun0"));
    assert!(err.to_string().contains("tun0"), "{err}");

    assert_eq!(interface::check_viability(&lo()), Err(ViabilityError::IsLoopback));
    assert_eq!(interface::check_viability(&veth1234()), Err(ViabilityError::NoIpv4Address));
    assert_eq!(interface::check_viability(&docker0()), Ok(()));
}

/*************************************************************
                  Mock interfaces for testing
**************************************************************/

fn iface_all() -> Vec<NetworkInterface> {
    vec![lo(),
         enp9s0(),
         tun0(),
         ipv6leakintrf0(),
         wlan0(),
         eth1(),
         docker0(),
         veth1234(),
         br0()
    ]
}

fn lo() -> NetworkInterface {
    ni(
        "lo",
        1,
        Some(MacAddr::new(0, 0, 0, 0, 0, 0)),
        &[v4(127, 0, 0, 1, 8), v6("::1", 128)],
        65609,
    )
}

fn enp9s0() -> NetworkInterface {
    ni(
        "enp9s0",
        2,
        Some(MacAddr::new(0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46)),
        &[
            v4(192, 168, 0, 32, 24),
            v6("2a02:908:8c1:b880::b054", 128),
            v6("2a02:908:8c1:b880:97f7:c408:8dff:b5bf", 64),
            v6("fe80::b3dd:5c39:7c29:48b6", 64),
        ],
        69699,
    )
}

fn tun0() -> NetworkInterface {
    ni(
        "tun0",
        5,
        None,
        &[v4(10, 96, 0, 57, 16), v6("fe80::c137:8964:5a63:efde", 64)],
        69841,
    )
}

fn ipv6leakintrf0() -> NetworkInterface {
    ni(
        "ipv6leakintrf0",
        6,
        Some(MacAddr::new(0xd2, 0x25, 0xd4, 0x9f, 0x18, 0xfd)),
        &[v6("fdeb:446c:912d:8da::", 64), v6("fe80::7f87:ff4a:9ad8:d2f0", 64)],
        65731,
    )
}

fn wlan0() -> NetworkInterface {
    ni(
        "wlan0",
        3,
        Some(MacAddr::new(0x34, 0xcf, 0xf6, 0x9a, 0x11, 0x22)),
        &[
            v4(192, 168, 1, 42, 24),
            v6("fe80::36cf:f6ff:fe9a:1122", 64),
        ],
        69699,
    )
}

fn eth1() -> NetworkInterface {
    ni(
        "eth1",
        4,
        Some(MacAddr::new(0x52, 0x54, 0x00, 0x12, 0x34, 0x56)),
        &[v4(10, 0, 0, 15, 24)],
        69699,
    )
}

fn docker0() -> NetworkInterface {
    ni(
        "docker0",
        7,
        Some(MacAddr::new(0x02, 0x42, 0xac, 0x11, 0x00, 0x01)),
        &[v4(172, 17, 0, 1, 16)],
        69699,
    )
}

fn veth1234() -> NetworkInterface {
    ni(
        "veth1234",
        8,
        Some(MacAddr::new(0x1a, 0x2b, 0x3c, 0x4d, 0x5e, 0x6f)),
        &[v6("fe80::1a2b:3cff:fe4d:5e6f", 64)],
        69699,
    )
}

fn br0() -> NetworkInterface {
    ni(
        "br0",
        9,
        Some(MacAddr::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x01)),
        &[
            v4(192, 168, 100, 1, 24),
            v6("fd00:dead:beef::1", 64),
        ],
        69699,
    )
}

fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

fn v4(a: u8,b: u8,c: u8,d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a,b,c,d), p).unwrap())
}
fn v6(s: &str, p: u8) -> IpNetwork {
    IpNetwork::V6(Ipv6Network::new(s.parse::<Ipv6Addr>().unwrap(), p).unwrap())
}
