//! The scalar CIDR-match predicate and IP address encoding.
//!
//! IP values are 16-byte encoded addresses: IPv6 addresses as their octets,
//! IPv4 addresses IPv4-mapped (`::ffff:a.b.c.d`). CIDR values are UTF-8 text,
//! either `address/prefix` or a bare address matching only itself.

use crate::expression::CidrError;
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// Length of an encoded IP address.
pub const IP_LENGTH: usize = 16;

/// Bits a v4 prefix is shifted by inside the IPv4-mapped range.
const V4_MAPPED_PREFIX_BITS: u8 = 96;

/// Encode an address into its 16-byte form.
pub fn encode_ip(addr: IpAddr) -> [u8; IP_LENGTH] {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

/// Parse a textual address into its 16-byte form.
pub fn parse_ip(text: &str) -> Result<[u8; IP_LENGTH], CidrError> {
    let addr = IpAddr::from_str(text.trim())
        .map_err(|_| CidrError::InvalidAddress(format!("'{}' is not an IP address", text)))?;
    Ok(encode_ip(addr))
}

/// Decode a 16-byte address, mapping IPv4-mapped addresses back to IPv4.
pub fn decode_ip(bytes: &[u8]) -> Result<IpAddr, CidrError> {
    let octets: [u8; IP_LENGTH] = bytes.try_into().map_err(|_| {
        CidrError::InvalidAddress(format!(
            "expected {} encoded bytes, got {}",
            IP_LENGTH,
            bytes.len()
        ))
    })?;
    Ok(Ipv6Addr::from(octets).to_canonical())
}

/// A parsed CIDR range over the 128-bit encoded address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: u128,
    prefix_len: u8,
}

impl Cidr {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, CidrError> {
        let (max, shift) = match addr {
            IpAddr::V4(_) => (32, V4_MAPPED_PREFIX_BITS),
            IpAddr::V6(_) => (128, 0),
        };
        if prefix_len > max {
            return Err(CidrError::InvalidCidr {
                cidr: format!("{}/{}", addr, prefix_len),
                reason: format!("prefix length {} exceeds {}", prefix_len, max),
            });
        }
        let prefix_len = prefix_len + shift;
        Ok(Self {
            network: BigEndian::read_u128(&encode_ip(addr)) & mask(prefix_len),
            prefix_len,
        })
    }

    /// Prefix length in the 128-bit encoded space.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether the encoded address `ip` lies inside this range.
    pub fn contains(&self, ip: &[u8; IP_LENGTH]) -> bool {
        BigEndian::read_u128(ip) & mask(self.prefix_len) == self.network
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CidrError::InvalidCidr {
            cidr: text.to_string(),
            reason,
        };
        let (addr_text, prefix_text) = match text.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (text, None),
        };
        let addr = IpAddr::from_str(addr_text)
            .map_err(|_| invalid(format!("'{}' is not an IP address", addr_text)))?;
        let prefix_len = match prefix_text {
            Some(prefix) => prefix
                .parse::<u8>()
                .map_err(|_| invalid(format!("'{}' is not a prefix length", prefix)))?,
            None if addr.is_ipv4() => 32,
            None => 128,
        };
        Cidr::new(addr, prefix_len).map_err(|e| match e {
            CidrError::InvalidCidr { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = Ipv6Addr::from(self.network).to_canonical();
        match addr {
            IpAddr::V4(_) if self.prefix_len >= V4_MAPPED_PREFIX_BITS => {
                write!(f, "{}/{}", addr, self.prefix_len - V4_MAPPED_PREFIX_BITS)
            }
            _ => write!(f, "{}/{}", Ipv6Addr::from(self.network), self.prefix_len),
        }
    }
}

fn mask(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        len => u128::MAX << (128 - u32::from(len)),
    }
}

/// Whether the encoded address `ip` lies in the range described by the UTF-8
/// text `cidr`.
pub fn is_in_range(ip: &[u8], cidr: &[u8]) -> Result<bool, CidrError> {
    let ip = as_encoded(ip)?;
    Ok(parse_cidr(cidr)?.contains(ip))
}

/// Whether the encoded address `ip` lies in any of `cidrs`.
///
/// Ranges are tested in order and the first match wins; ranges after it are
/// not parsed.
pub fn matches(ip: &[u8], cidrs: &[&[u8]]) -> Result<bool, CidrError> {
    let ip = as_encoded(ip)?;
    for cidr in cidrs {
        if parse_cidr(cidr)?.contains(ip) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn as_encoded(ip: &[u8]) -> Result<&[u8; IP_LENGTH], CidrError> {
    ip.try_into().map_err(|_| {
        CidrError::InvalidAddress(format!(
            "expected {} encoded bytes, got {}",
            IP_LENGTH,
            ip.len()
        ))
    })
}

fn parse_cidr(cidr: &[u8]) -> Result<Cidr, CidrError> {
    let text = std::str::from_utf8(cidr).map_err(|_| CidrError::InvalidCidr {
        cidr: String::from_utf8_lossy(cidr).into_owned(),
        reason: "not valid UTF-8".to_string(),
    })?;
    text.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(text: &str) -> [u8; IP_LENGTH] {
        parse_ip(text).unwrap()
    }

    #[test]
    fn test_encode_ipv4_is_mapped() {
        let encoded = ip("10.0.0.5");
        assert_eq!(&encoded[..12], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff]);
        assert_eq!(&encoded[12..], &[10, 0, 0, 5]);
        assert_eq!(decode_ip(&encoded).unwrap(), "10.0.0.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parse_ip_rejects_garbage() {
        assert!(matches!(parse_ip("10.0.0"), Err(CidrError::InvalidAddress(_))));
        assert!(matches!(decode_ip(&[1, 2, 3]), Err(CidrError::InvalidAddress(_))));
    }

    #[test]
    fn test_ipv4_ranges() {
        assert!(is_in_range(&ip("10.0.0.5"), b"10.0.0.0/8").unwrap());
        assert!(!is_in_range(&ip("11.0.0.5"), b"10.0.0.0/8").unwrap());
        assert!(is_in_range(&ip("172.31.255.255"), b"172.16.0.0/12").unwrap());
        assert!(!is_in_range(&ip("172.32.0.0"), b"172.16.0.0/12").unwrap());
        assert!(is_in_range(&ip("8.8.8.8"), b"0.0.0.0/0").unwrap());
        // A bare address only matches itself
        assert!(is_in_range(&ip("1.2.3.4"), b"1.2.3.4").unwrap());
        assert!(!is_in_range(&ip("1.2.3.5"), b"1.2.3.4").unwrap());
    }

    #[test]
    fn test_ipv6_ranges() {
        assert!(is_in_range(&ip("2001:db8::1"), b"2001:db8::/32").unwrap());
        assert!(!is_in_range(&ip("2001:db9::1"), b"2001:db8::/32").unwrap());
        assert!(is_in_range(&ip("::1"), b"::/0").unwrap());
        // IPv4 ranges never match native IPv6 addresses
        assert!(!is_in_range(&ip("::1"), b"0.0.0.0/0").unwrap());
        // IPv4 addresses are found through the mapped range
        assert!(is_in_range(&ip("10.1.2.3"), b"::ffff:0:0/96").unwrap());
    }

    #[test]
    fn test_host_bits_are_masked() {
        let cidr: Cidr = "10.1.2.3/8".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.0.0.0/8");
        assert_eq!(cidr.prefix_len(), 104);
        assert!(cidr.contains(&ip("10.200.0.1")));
    }

    #[test]
    fn test_invalid_cidrs() {
        let err = "10.0.0.0/33".parse::<Cidr>().unwrap_err();
        assert_eq!(
            err,
            CidrError::InvalidCidr {
                cidr: "10.0.0.0/33".to_string(),
                reason: "prefix length 33 exceeds 32".to_string(),
            }
        );
        assert!("10.0.0.0/x".parse::<Cidr>().is_err());
        assert!("not-an-ip/8".parse::<Cidr>().is_err());
        assert!("::/129".parse::<Cidr>().is_err());
        assert!(is_in_range(&ip("10.0.0.1"), &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_matches_any() {
        let cidrs: [&[u8]; 2] = [b"10.0.0.0/8", b"172.16.0.0/12"];
        assert!(matches(&ip("10.0.0.5"), &cidrs).unwrap());
        assert!(matches(&ip("172.16.4.4"), &cidrs).unwrap());
        assert!(!matches(&ip("192.168.1.1"), &cidrs).unwrap());
        assert!(!matches(&ip("192.168.1.1"), &[]).unwrap());
    }

    #[test]
    fn test_matches_short_circuits() {
        // The malformed range after the match is never parsed
        let cidrs: [&[u8]; 2] = [b"10.0.0.0/8", b"garbage"];
        assert!(matches(&ip("10.0.0.5"), &cidrs).unwrap());
        assert!(matches(&ip("11.0.0.5"), &cidrs).is_err());
    }

    #[test]
    fn test_matches_rejects_unencoded_ip() {
        let cidrs: [&[u8]; 1] = [b"10.0.0.0/8"];
        assert_eq!(
            matches(b"10.0.0.5", &cidrs),
            Err(CidrError::InvalidAddress(
                "expected 16 encoded bytes, got 8".to_string()
            ))
        );
    }
}
