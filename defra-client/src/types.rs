/// Caller-facing types for replicator management
use crate::address::{decode_identifier, encode_identifier, multiaddr_from_bytes};
use crate::error::{ClientError, Result};
use defra_proto::get_all_replicator_reply::Replicators;
use multiaddr::Multiaddr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a remote node. Raw bytes on the wire, base-58 for humans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        PeerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Base-58 rendering, as accepted by `delete_replicator`.
    pub fn to_base58(&self) -> String {
        encode_identifier(&self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for PeerId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        decode_identifier(s).map(PeerId)
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A replicator as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replicator {
    pub id: PeerId,
    pub addrs: Multiaddr,
    /// Collection names replicated to this peer, as the node reports them
    pub schemas: Vec<String>,
}

impl TryFrom<Replicators> for Replicator {
    type Error = ClientError;

    fn try_from(record: Replicators) -> Result<Self> {
        let info = record
            .info
            .ok_or_else(|| ClientError::replication("replicator record without peer info"))?;

        Ok(Replicator {
            id: PeerId::from_bytes(info.id),
            addrs: multiaddr_from_bytes(info.addrs)?,
            schemas: record.schemas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_multiaddr;
    use defra_proto::get_all_replicator_reply::replicators::Info;

    #[test]
    fn test_peer_id_display_and_parse() {
        let id = PeerId::from_bytes(b"hello world".to_vec());
        assert_eq!(id.to_string(), "StV1DL6CwTryKyV");
        assert_eq!("StV1DL6CwTryKyV".parse::<PeerId>().unwrap(), id);
        assert!(matches!(
            "not-base58!".parse::<PeerId>(),
            Err(ClientError::IdentifierFormat(_))
        ));
    }

    #[test]
    fn test_peer_id_serializes_as_base58() {
        let id = PeerId::from_bytes(vec![0, 1, 2]);
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!(id.to_base58()));
        let back: PeerId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_replicator_from_record() {
        let addr = parse_multiaddr("/ip4/127.0.0.1/tcp/9172").unwrap();
        let record = Replicators {
            info: Some(Info {
                id: vec![7; 34],
                addrs: addr.to_vec(),
            }),
            schemas: vec!["Parameters".to_string(), "Users".to_string()],
        };

        let replicator = Replicator::try_from(record).unwrap();
        assert_eq!(replicator.id.as_bytes(), &[7; 34][..]);
        assert_eq!(replicator.addrs, addr);
        assert_eq!(replicator.schemas, vec!["Parameters", "Users"]);

        let json = serde_json::to_value(&replicator).unwrap();
        assert_eq!(json["addrs"], serde_json::json!("/ip4/127.0.0.1/tcp/9172"));
        assert_eq!(json["id"], serde_json::json!(replicator.id.to_base58()));
    }

    #[test]
    fn test_replicator_record_without_info() {
        let record = Replicators {
            info: None,
            schemas: vec![],
        };
        assert!(matches!(
            Replicator::try_from(record),
            Err(ClientError::Replication { .. })
        ));
    }
}
