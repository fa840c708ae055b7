//! Reverse-DNS zone derivation for `inetnum`/`inet6num` objects (spec.md
//! §6), grounded against `original_source/validate-my-dns.py`'s
//! zone-splitting behaviour. Its IPv4 case special-cases `/8`, `/16` and
//! `/24` and otherwise leaves coarser blocks as a `TODO`; here every
//! prefix length is handled by enumerating the `/24` zones a block
//! touches, which both covers the special cases and finishes the
//! original's unimplemented general case.

use rpsl::NativeNet;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The reverse zone(s) an `inetnum`/`inet6num`'s network belongs to.
pub fn reverse_zones(net: &NativeNet) -> Vec<String> {
    match net {
        NativeNet::V4 { addr, prefix } => ipv4_zones(*addr, *prefix),
        NativeNet::V6 { addr, prefix } => vec![ipv6_zone(*addr, *prefix)],
    }
}

fn ipv4_zones(addr: Ipv4Addr, prefix: u8) -> Vec<String> {
    if prefix == 8 {
        let o = addr.octets();
        return vec![format!("{}.in-addr.arpa", o[0])];
    }
    if prefix == 16 {
        let o = addr.octets();
        return vec![format!("{}.{}.in-addr.arpa", o[1], o[0])];
    }

    // /24 and finer collapse to a single enclosing /24 zone; anything
    // coarser than /24 (other than /8, /16 above) is split into every
    // /24 zone the block spans.
    let base = u32::from(addr) & 0xFFFF_FF00;
    let host_bits = 24i32 - prefix as i32;
    let count: u32 = if host_bits <= 0 { 1 } else { 1u32 << host_bits };

    (0..count)
        .map(|i| {
            let block = base | (i << 8);
            let o = Ipv4Addr::from(block).octets();
            format!("{}.{}.{}.in-addr.arpa", o[2], o[1], o[0])
        })
        .collect()
}

/// IPv6 zone: the common nybble prefix of the network's low and high
/// boundary addresses, reversed and dotted, suffixed with `ip6.arpa`.
fn ipv6_zone(network: Ipv6Addr, prefix: u8) -> String {
    let low = nybbles(network);
    let high = nybbles(broadcast(network, prefix));

    let common: String = low
        .chars()
        .zip(high.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect();

    if common.is_empty() {
        return "ip6.arpa".to_string();
    }

    let labels: Vec<String> = common.chars().rev().map(|c| c.to_string()).collect();
    format!("{}.ip6.arpa", labels.join("."))
}

fn nybbles(addr: Ipv6Addr) -> String {
    addr.segments().iter().map(|s| format!("{:04x}", s)).collect()
}

fn broadcast(network: Ipv6Addr, prefix: u8) -> Ipv6Addr {
    let host_bits = 128 - prefix as u32;
    let mask: u128 = if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    };
    Ipv6Addr::from(u128::from(network) | mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_slash_24_single_zone() {
        let net = NativeNet::parse("172.20.1.0/24").unwrap();
        assert_eq!(reverse_zones(&net), vec!["1.20.172.in-addr.arpa".to_string()]);
    }

    #[test]
    fn ipv4_slash_16_drops_two_octets() {
        let net = NativeNet::parse("172.20.0.0/16").unwrap();
        assert_eq!(reverse_zones(&net), vec!["20.172.in-addr.arpa".to_string()]);
    }

    #[test]
    fn ipv4_slash_8_drops_three_octets() {
        let net = NativeNet::parse("172.0.0.0/8").unwrap();
        assert_eq!(reverse_zones(&net), vec!["172.in-addr.arpa".to_string()]);
    }

    #[test]
    fn ipv4_slash_29_collapses_to_enclosing_24() {
        let net = NativeNet::parse("172.20.1.0/29").unwrap();
        assert_eq!(reverse_zones(&net), vec!["1.20.172.in-addr.arpa".to_string()]);
    }

    #[test]
    fn ipv4_slash_20_spans_sixteen_24_zones() {
        let net = NativeNet::parse("172.20.16.0/20").unwrap();
        let zones = reverse_zones(&net);
        assert_eq!(zones.len(), 16);
        assert_eq!(zones[0], "16.20.172.in-addr.arpa");
        assert_eq!(zones[15], "31.20.172.in-addr.arpa");
    }

    #[test]
    fn ipv6_zone_uses_common_nybble_prefix() {
        let net = NativeNet::parse("fdea:a15a:77b9::/48").unwrap();
        let zones = reverse_zones(&net);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0], "9.b.7.7.a.5.1.a.a.e.d.f.ip6.arpa");
    }
}
