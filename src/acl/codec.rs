//! Dotted-quad IPv4 text <-> `u32` conversion.
//!
//! Accepted syntax:
//!   `192.168.1.1`     — single host, prefix length 32
//!   `192.168.0.0/16`  — CIDR block
//!
//! Every octet must be a decimal integer in `0..=255` and the prefix length
//! an integer in `0..=32`. Anything else is rejected; nothing is coerced to 0.

use std::fmt;
use std::str::FromStr;

use crate::error::AclError;

pub const MAX_PREFIX_LEN: u8 = 32;

/// Parse `a.b.c.d[/N]` into the big-endian address and its prefix length.
pub fn parse(text: &str) -> Result<(u32, u8), AclError> {
    let s = text.trim();
    let (addr, len) = match s.split_once('/') {
        Some((addr, len)) => (addr, parse_prefix_len(text, len)?),
        None => (s, MAX_PREFIX_LEN),
    };
    Ok((parse_octets(text, addr)?, len))
}

/// Parse a bare address. A `/N` suffix is an error here.
pub fn parse_addr(text: &str) -> Result<u32, AclError> {
    let s = text.trim();
    if s.contains('/') {
        return Err(AclError::invalid(text, "expected an address without prefix length"));
    }
    parse_octets(text, s)
}

/// Render an address as dotted-quad text, without any prefix suffix.
pub fn format(value: u32) -> String {
    let [b0, b1, b2, b3] = value.to_be_bytes();
    format!("{b0}.{b1}.{b2}.{b3}")
}

fn parse_prefix_len(input: &str, s: &str) -> Result<u8, AclError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AclError::invalid(input, "prefix length must be an integer"));
    }
    match s.parse::<u8>() {
        Ok(len) if len <= MAX_PREFIX_LEN => Ok(len),
        _ => Err(AclError::invalid(input, "prefix length must be between 0 and 32")),
    }
}

fn parse_octets(input: &str, s: &str) -> Result<u32, AclError> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return Err(AclError::invalid(
            input,
            format!("expected 4 octets, got {}", parts.len()),
        ));
    }

    let mut value = 0u32;
    for part in parts {
        // `u8::from_str` alone would accept a leading '+'
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AclError::invalid(input, format!("octet '{part}' is not a number")));
        }
        let octet: u8 = part
            .parse()
            .map_err(|_| AclError::invalid(input, format!("octet '{part}' is out of range 0-255")))?;
        value = value << 8 | u32::from(octet);
    }
    Ok(value)
}

/// Network mask with the top `len` bits set.
pub fn mask(len: u8) -> u32 {
    u32::MAX
        .checked_shl(u32::from(MAX_PREFIX_LEN - len.min(MAX_PREFIX_LEN)))
        .unwrap_or(0)
}

/// A validated CIDR block. Host bits beyond the prefix length are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Prefix {
    addr: u32,
    len: u8,
}

impl Ipv4Prefix {
    pub fn new(addr: u32, len: u8) -> Result<Self, AclError> {
        if len > MAX_PREFIX_LEN {
            return Err(AclError::invalid(
                &format!("{}/{}", format(addr), len),
                "prefix length must be between 0 and 32",
            ));
        }
        Ok(Self { addr: addr & mask(len), len })
    }

    /// Single-host prefix (`/32`).
    pub fn host(addr: u32) -> Self {
        Self { addr, len: MAX_PREFIX_LEN }
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr & mask(self.len) == self.addr
    }
}

impl FromStr for Ipv4Prefix {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = parse(s)?;
        Self::new(addr, len)
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", format(self.addr), self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_defaults_to_32() {
        assert_eq!(parse("192.168.1.1").unwrap(), (0xC0A8_0101, 32));
        assert_eq!(parse("0.0.0.0").unwrap(), (0, 32));
        assert_eq!(parse("255.255.255.255").unwrap(), (u32::MAX, 32));
    }

    #[test]
    fn test_parse_with_prefix() {
        assert_eq!(parse("10.0.0.0/8").unwrap(), (0x0A00_0000, 8));
        assert_eq!(parse("0.0.0.0/0").unwrap(), (0, 0));
        assert_eq!(parse(" 172.16.0.0/12 ").unwrap(), (0xAC10_0000, 12));
    }

    #[test]
    fn test_wrong_octet_count() {
        assert!(parse("10.0.0").is_err());
        assert!(parse("10.0.0.0.1").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_garbage_octet_is_rejected_not_zeroed() {
        let err = parse("10.abc.0.1").unwrap_err();
        assert!(matches!(err, AclError::InvalidAddress { .. }));
        assert!(parse("10..0.1").is_err());
        assert!(parse("10.+1.0.1").is_err());
        assert!(parse("10.-1.0.1").is_err());
    }

    #[test]
    fn test_octet_out_of_range() {
        let err = parse("192.168.1.256").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(parse("1000.0.0.1").is_err());
    }

    #[test]
    fn test_prefix_len_out_of_range() {
        assert!(parse("10.0.0.0/33").is_err());
        assert!(parse("10.0.0.0/").is_err());
        assert!(parse("10.0.0.0/x").is_err());
        assert!(parse("10.0.0.0/-1").is_err());
    }

    #[test]
    fn test_parse_addr_rejects_suffix() {
        assert_eq!(parse_addr("10.1.2.3").unwrap(), 0x0A01_0203);
        assert!(parse_addr("10.1.2.3/32").is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(format(0xC0A8_0505), "192.168.5.5");
        assert_eq!(format(0), "0.0.0.0");
        assert_eq!(format(u32::MAX), "255.255.255.255");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(8), 0xFF00_0000);
        assert_eq!(mask(32), u32::MAX);
    }

    #[test]
    fn test_prefix_clears_host_bits() {
        let p: Ipv4Prefix = "10.1.2.3/8".parse().unwrap();
        assert_eq!(p.to_string(), "10.0.0.0/8");
        assert!(p.contains(0x0AFF_FFFF));
        assert!(!p.contains(0x0B00_0000));
    }

    #[test]
    fn test_prefix_new_rejects_long_len() {
        assert!(Ipv4Prefix::new(0, 33).is_err());
        assert_eq!(Ipv4Prefix::host(1).to_string(), "0.0.0.1/32");
    }
}
