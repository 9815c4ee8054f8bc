use axum::http::HeaderMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::acl::codec;
use crate::error::AclError;

/// Requester address as seen by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIp {
    V4(Ipv4Addr),
    /// Outside the IPv4 policy; never matched against rules.
    V6(Ipv6Addr),
    /// Neither a trusted header nor the TCP peer was available.
    Unknown,
}

impl ClientIp {
    fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => ClientIp::V4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => ClientIp::V4(v4),
                None => ClientIp::V6(v6),
            },
        }
    }

    /// Classify header text. IPv4 goes through the ACL codec so the same
    /// input rules apply as for admin requests.
    fn parse(text: &str) -> Result<Self, AclError> {
        match codec::parse_addr(text) {
            Ok(addr) => Ok(ClientIp::V4(Ipv4Addr::from(addr))),
            Err(e) => match text.trim().parse::<Ipv6Addr>() {
                Ok(v6) => Ok(ClientIp::from_ip(IpAddr::V6(v6))),
                Err(_) => Err(e),
            },
        }
    }

    /// The address as the ACL codec encodes it, for IPv4 clients.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ClientIp::V4(v4) => Some(u32::from(*v4)),
            _ => None,
        }
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIp::V4(v4) => write!(f, "{}", v4),
            ClientIp::V6(v6) => write!(f, "{}", v6),
            ClientIp::Unknown => f.write_str("unknown"),
        }
    }
}

/// Resolve the real client address of a request.
///
/// With `trust_forwarded` set, `X-Real-IP` wins, then the first hop of
/// `X-Forwarded-For`; a present but malformed header is an error rather
/// than a silent fallback. Otherwise the TCP peer is used.
pub fn resolve(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> Result<ClientIp, AclError> {
    if trust_forwarded {
        if let Some(value) = headers.get("x-real-ip") {
            let text = value
                .to_str()
                .map_err(|_| AclError::invalid("x-real-ip", "header is not valid text"))?;
            return ClientIp::parse(text);
        }
        if let Some(value) = headers.get("x-forwarded-for") {
            let text = value
                .to_str()
                .map_err(|_| AclError::invalid("x-forwarded-for", "header is not valid text"))?;
            let first = text.split(',').next().unwrap_or_default();
            return ClientIp::parse(first);
        }
    }
    Ok(peer.map_or(ClientIp::Unknown, |p| ClientIp::from_ip(p.ip())))
}
