//! Target specification types with CIDR support.
//!
//! Provides target expansion supporting:
//! - Single IP addresses (IPv4 and IPv6)
//! - CIDR notation (192.168.1.0/24, 2001:db8::/120)
//! - Multiple targets, deduplicated in first-seen order

use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Error type for target parsing and expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target: {0} (expected an IP address or CIDR block)")]
    InvalidTarget(String),
    #[error("CIDR range too large: {spec} holds {size} addresses (max: {max})", max = TargetSpec::MAX_CIDR_HOSTS)]
    CidrTooLarge { spec: String, size: u128 },
    #[error("no valid targets found")]
    NoTargets,
}

/// A single target specification.
///
/// Supports:
/// - Single IP: "192.168.1.1", "::1"
/// - CIDR: "192.168.1.0/24", "2001:db8::/120"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
}

impl TargetSpec {
    /// Maximum number of addresses allowed in a CIDR range.
    pub const MAX_CIDR_HOSTS: u128 = 1 << 20;

    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| TargetError::InvalidTarget(s.to_string()))?;

            let size = block_size(&network);
            if size > Self::MAX_CIDR_HOSTS {
                return Err(TargetError::CidrTooLarge {
                    spec: s.to_string(),
                    size,
                });
            }

            return Ok(Self::Cidr(network));
        }

        Err(TargetError::InvalidTarget(s.to_string()))
    }

    /// Number of addresses this specification expands to.
    pub fn host_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Cidr(network) => {
                // Bounded by MAX_CIDR_HOSTS at parse time.
                let size = block_size(network) as usize;
                if size > 2 {
                    size - 2
                } else {
                    size
                }
            }
        }
    }

    /// Iterate over the addresses of this specification.
    ///
    /// Blocks with more than two addresses drop the first (network) and last
    /// (broadcast) address. `/31`, `/32`, `/127` and `/128` blocks keep every
    /// address. Host bits in the base address are ignored.
    pub fn addresses(&self) -> Box<dyn Iterator<Item = IpAddr> + '_> {
        match self {
            Self::Single(ip) => Box::new(std::iter::once(*ip)),
            Self::Cidr(network) => {
                let size = block_size(network) as usize;
                let skip = usize::from(size > 2);
                Box::new(network.iter().skip(skip).take(self.host_count()))
            }
        }
    }
}

/// Number of addresses in a CIDR block, saturating for a whole IPv6 space.
fn block_size(network: &IpNetwork) -> u128 {
    let bits: u32 = if network.is_ipv4() { 32 } else { 128 };
    1u128
        .checked_shl(bits - u32::from(network.prefix()))
        .unwrap_or(u128::MAX)
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
        }
    }
}

/// Expand a list of target specifications into unique addresses.
///
/// Blank entries are skipped. Addresses keep the order in which they are
/// first seen across the whole input. Fails on the first invalid entry.
pub fn expand_targets<S: AsRef<str>>(specs: &[S]) -> Result<Vec<IpAddr>, TargetError> {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();

    for raw in specs {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            continue;
        }

        let spec = TargetSpec::parse(raw)?;
        addresses.extend(spec.addresses().filter(|ip| seen.insert(*ip)));
    }

    if addresses.is_empty() {
        return Err(TargetError::NoTargets);
    }

    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V4(_))));
    }

    #[test]
    fn test_parse_ipv6() {
        let spec = TargetSpec::parse("::1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V6(_))));
    }

    #[test]
    fn test_parse_cidr_v4() {
        let spec = TargetSpec::parse("192.168.1.0/24").unwrap();
        assert_eq!(spec.host_count(), 254);
    }

    #[test]
    fn test_hostnames_are_rejected() {
        assert_eq!(
            TargetSpec::parse("example.com"),
            Err(TargetError::InvalidTarget("example.com".to_string()))
        );
        assert!(matches!(
            TargetSpec::parse("10.0.0.0/33"),
            Err(TargetError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_cidr_too_large() {
        assert!(matches!(
            TargetSpec::parse("10.0.0.0/8"),
            Err(TargetError::CidrTooLarge { .. })
        ));
        assert!(matches!(
            TargetSpec::parse("::/0"),
            Err(TargetError::CidrTooLarge { size: u128::MAX, .. })
        ));
    }

    #[test]
    fn test_cidr_excludes_network_and_broadcast() {
        let ips = expand_targets(&["10.0.0.0/30"]).unwrap();
        assert_eq!(ips, vec![v4(10, 0, 0, 1), v4(10, 0, 0, 2)]);

        let ips = expand_targets(&["192.168.1.0/24"]).unwrap();
        assert_eq!(ips.len(), 254);
        assert_eq!(ips[0], v4(192, 168, 1, 1));
        assert_eq!(ips[253], v4(192, 168, 1, 254));
    }

    #[test]
    fn test_small_blocks_keep_every_address() {
        let ips = expand_targets(&["10.0.0.0/31"]).unwrap();
        assert_eq!(ips, vec![v4(10, 0, 0, 0), v4(10, 0, 0, 1)]);

        let ips = expand_targets(&["10.0.0.5/32"]).unwrap();
        assert_eq!(ips, vec![v4(10, 0, 0, 5)]);

        let ips = expand_targets(&["2001:db8::/127"]).unwrap();
        assert_eq!(ips.len(), 2);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let ips = expand_targets(&["10.0.0.7/30"]).unwrap();
        assert_eq!(ips, vec![v4(10, 0, 0, 5), v4(10, 0, 0, 6)]);
    }

    #[test]
    fn test_ipv6_block() {
        let ips = expand_targets(&["2001:db8::/126"]).unwrap();
        let first: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let last: Ipv6Addr = "2001:db8::2".parse().unwrap();
        assert_eq!(ips, vec![IpAddr::V6(first), IpAddr::V6(last)]);
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let ips = expand_targets(&["10.0.0.2", "10.0.0.0/30", "10.0.0.9", "10.0.0.1"]).unwrap();
        assert_eq!(
            ips,
            vec![v4(10, 0, 0, 2), v4(10, 0, 0, 1), v4(10, 0, 0, 9)]
        );
    }

    #[test]
    fn test_blank_entries_and_empty_input() {
        let ips = expand_targets(&["", " 127.0.0.1 ", "  "]).unwrap();
        assert_eq!(ips, vec![v4(127, 0, 0, 1)]);

        let empty: [&str; 0] = [];
        assert_eq!(expand_targets(&empty), Err(TargetError::NoTargets));
    }

    #[test]
    fn test_fails_fast() {
        assert_eq!(
            expand_targets(&["127.0.0.1", "bogus", "also-bogus"]),
            Err(TargetError::InvalidTarget("bogus".to_string()))
        );
    }
}
