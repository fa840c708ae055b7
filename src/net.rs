//! Network utilities: the unified IPv6 address space used by the network
//! tree, and the native (v4-or-v6) network coercion used by the schema
//! engine's `inet[6]num` sanity check (spec.md §4.2, §4.3).
//!
//! There is no external CIDR crate in the teacher's dependency stack, so
//! this is hand-rolled prefix arithmetic over `u128`/`u32`, in the same
//! spirit as the teacher's own manual big-endian byte handling in its DNS
//! wire codec.

use crate::errors::ValueError;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Prefix length of the `::ffff:0:0/96` region IPv4 networks are embedded
/// into.
pub const V4_MAPPED_PREFIX_LEN: u8 = 96;

/// A network in the unified IPv6 address space used by [`crate::nettree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Net6 {
    addr: u128,
    prefix: u8,
}

impl Net6 {
    pub fn new(addr: Ipv6Addr, prefix: u8) -> Self {
        let masked = mask128(u128::from(addr), prefix);
        Net6 {
            addr: masked,
            prefix,
        }
    }

    /// The synthetic root of the tree, `::/0`.
    pub fn root() -> Self {
        Net6 { addr: 0, prefix: 0 }
    }

    /// `::ffff:0:0/96`, the region all IPv4 networks are embedded into.
    pub fn v4_mapped_prefix() -> Self {
        Net6::new(Ipv6Addr::from(0x0000_0000_0000_0000_0000_ffff_0000_0000u128), 96)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    pub fn network_address(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.addr)
    }

    /// Whether `self` is a supernet of (or equal to) `other`.
    pub fn supernet_of(&self, other: &Net6) -> bool {
        if self.prefix > other.prefix {
            return false;
        }
        mask128(other.addr, self.prefix) == self.addr
    }

    /// The full 8-group, zero-padded hex form used both for display and as
    /// the tie-break sort key (spec.md §4.2: "ascending exploded address").
    pub fn exploded(&self) -> String {
        explode_v6(Ipv6Addr::from(self.addr))
    }

    /// `(prefix_len, address)` — ascending prefix length, then ascending
    /// exploded address, exactly the tree's sort order.
    pub fn sort_key(&self) -> (u8, u128) {
        (self.prefix, self.addr)
    }

    pub fn is_v4_mapped(&self) -> bool {
        self.prefix >= V4_MAPPED_PREFIX_LEN && Net6::v4_mapped_prefix().supernet_of(self)
    }

    /// Renders this network the way the indexer names objects: a v4-mapped
    /// network is rendered as a dotted quad with 96 subtracted from the
    /// prefix length, otherwise as a plain IPv6 `addr/prefix`.
    pub fn display_with_prefix(&self) -> String {
        if self.is_v4_mapped() {
            let v4 = v4_from_mapped(self.addr);
            format!("{}/{}", v4, self.prefix - V4_MAPPED_PREFIX_LEN)
        } else {
            format!("{}/{}", self.network_address(), self.prefix)
        }
    }
}

impl fmt::Display for Net6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with_prefix())
    }
}

/// Parses a dotted-quad-or-v6 CIDR/host string into the unified IPv6 space.
/// Equivalent to `Value::as_net6` in spec.md §4.1.
pub fn as_net6(s: &str) -> Result<Net6, ValueError> {
    NativeNet::parse(s).map(|n| n.as_net6())
}

/// A network in its own native address family, used for the `inet[6]num`
/// sanity check, which compares against the family the object was written
/// in (spec.md §4.3 item 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeNet {
    V4 { addr: Ipv4Addr, prefix: u8 },
    V6 { addr: Ipv6Addr, prefix: u8 },
}

impl NativeNet {
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        let s = s.trim();
        let (addr_str, prefix_str) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };

        if addr_str.contains(':') {
            let addr: Ipv6Addr = addr_str
                .parse()
                .map_err(|_| ValueError::InvalidNetwork(s.to_string()))?;
            let prefix = match prefix_str {
                Some(p) => parse_prefix(p, 128, s)?,
                None => 128,
            };
            Ok(NativeNet::V6 {
                addr: Ipv6Addr::from(mask128(u128::from(addr), prefix)),
                prefix,
            })
        } else {
            let addr: Ipv4Addr = addr_str
                .parse()
                .map_err(|_| ValueError::InvalidNetwork(s.to_string()))?;
            let prefix = match prefix_str {
                Some(p) => parse_prefix(p, 32, s)?,
                None => 32,
            };
            Ok(NativeNet::V4 {
                addr: Ipv4Addr::from(mask32(u32::from(addr), prefix)),
                prefix,
            })
        }
    }

    pub fn network_address(&self) -> String {
        match self {
            NativeNet::V4 { addr, .. } => addr.to_string(),
            NativeNet::V6 { addr, .. } => explode_v6(*addr),
        }
    }

    pub fn broadcast_address(&self) -> String {
        match self {
            NativeNet::V4 { addr, prefix } => {
                let host_bits = 32 - *prefix;
                let mask = if host_bits >= 32 {
                    u32::MAX
                } else {
                    (1u32 << host_bits) - 1
                };
                Ipv4Addr::from(u32::from(*addr) | mask).to_string()
            }
            NativeNet::V6 { addr, prefix } => {
                let host_bits = 128 - *prefix;
                let mask = if host_bits >= 128 {
                    u128::MAX
                } else {
                    (1u128 << host_bits) - 1
                };
                explode_v6(Ipv6Addr::from(u128::from(*addr) | mask))
            }
        }
    }

    /// Embeds this network into the unified IPv6 space (spec.md §4.2):
    /// IPv4 networks move into `::ffff:0:0/96` with the prefix length
    /// incremented by 96.
    pub fn as_net6(&self) -> Net6 {
        match self {
            NativeNet::V4 { addr, prefix } => {
                let mapped = 0xffffu128 << 32 | u128::from(u32::from(*addr));
                Net6::new(Ipv6Addr::from(mapped), prefix + V4_MAPPED_PREFIX_LEN)
            }
            NativeNet::V6 { addr, prefix } => Net6::new(*addr, *prefix),
        }
    }
}

fn parse_prefix(s: &str, max: u8, original: &str) -> Result<u8, ValueError> {
    s.trim()
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= max)
        .ok_or_else(|| ValueError::InvalidNetwork(original.to_string()))
}

fn mask128(addr: u128, prefix: u8) -> u128 {
    if prefix >= 128 {
        addr
    } else {
        addr & !((1u128 << (128 - prefix)) - 1)
    }
}

fn mask32(addr: u32, prefix: u8) -> u32 {
    if prefix >= 32 {
        addr
    } else {
        addr & !((1u32 << (32 - prefix)) - 1)
    }
}

fn explode_v6(addr: Ipv6Addr) -> String {
    let segments = addr.segments();
    segments
        .iter()
        .map(|s| format!("{:04x}", s))
        .collect::<Vec<_>>()
        .join(":")
}

fn v4_from_mapped(addr: u128) -> Ipv4Addr {
    Ipv4Addr::from((addr & 0xffff_ffff) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_embedding() {
        // S3: as_net6("172.21.64.0/29") == ::ffff:172.21.64.0/125
        let got = as_net6("172.21.64.0/29").unwrap();
        let want = NativeNet::V6 {
            addr: "::ffff:172.21.64.0".parse().unwrap(),
            prefix: 125,
        }
        .as_net6();
        assert_eq!(got, want);
        assert_eq!(got.prefix_len(), 125);
    }

    #[test]
    fn native_inetnum_range() {
        let net = NativeNet::parse("172.20.0.0/14").unwrap();
        assert_eq!(net.network_address(), "172.20.0.0");
        assert_eq!(net.broadcast_address(), "172.23.255.255");
    }

    #[test]
    fn supernet_ordering() {
        let root = Net6::root();
        let child = as_net6("fdea:a15a:77b9::/48").unwrap();
        assert!(root.supernet_of(&child));
        assert!(!child.supernet_of(&root));
    }

    #[test]
    fn display_v4_mapped() {
        let net = as_net6("172.21.64.0/29").unwrap();
        assert_eq!(net.display_with_prefix(), "172.21.64.0/29");
    }
}
