/// Translation between the node's addressing schemes
///
/// Configuration and replicator records carry peer addresses as multiaddrs,
/// while the RPC channel needs a plain `host:port` socket endpoint. Peer IDs
/// travel as raw bytes over RPC and as base-58 strings everywhere else.
use crate::error::{ClientError, Result};
use multiaddr::{Multiaddr, Protocol};
use std::net::Ipv4Addr;

/// Parse the textual form of a multiaddr (e.g. `/ip4/127.0.0.1/tcp/9161`).
pub fn parse_multiaddr(addr: &str) -> Result<Multiaddr> {
    addr.parse::<Multiaddr>()
        .map_err(|e| ClientError::AddressFormat(format!("{}: {}", addr, e)))
}

/// Decode the binary form of a multiaddr as returned by the node.
pub fn multiaddr_from_bytes(bytes: Vec<u8>) -> Result<Multiaddr> {
    Multiaddr::try_from(bytes)
        .map_err(|e| ClientError::AddressFormat(format!("invalid binary multiaddr: {}", e)))
}

/// Decompose a multiaddr into the IPv4 host and TCP port it names.
///
/// Only the first `ip4` and first `tcp` segment are considered; any other
/// segments (`p2p`, `ws`, ...) are ignored. DNS names are never resolved.
pub fn socket_parts(addr: &Multiaddr) -> Result<(Ipv4Addr, u16)> {
    let mut ip = None;
    let mut port = None;

    for segment in addr.iter() {
        match segment {
            Protocol::Ip4(v) if ip.is_none() => ip = Some(v),
            Protocol::Tcp(v) if port.is_none() => port = Some(v),
            _ => {}
        }
    }

    match (ip, port) {
        (Some(ip), Some(port)) => Ok((ip, port)),
        (None, _) => Err(ClientError::AddressFormat(format!(
            "{} has no ip4 segment",
            addr
        ))),
        (_, None) => Err(ClientError::AddressFormat(format!(
            "{} has no tcp segment",
            addr
        ))),
    }
}

/// Render a multiaddr as `host:port` for a socket-based channel.
pub fn to_host_port(addr: &Multiaddr) -> Result<String> {
    let (ip, port) = socket_parts(addr)?;
    Ok(format!("{}:{}", ip, port))
}

/// Encode raw identifier bytes as base-58 (Bitcoin alphabet).
pub fn encode_identifier(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a base-58 identifier into raw bytes.
pub fn decode_identifier(s: &str) -> Result<Vec<u8>> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| ClientError::IdentifierFormat(format!("{:?}: {}", s, e)))
}
