//!
//! Payload returned by the node's `/status` endpoint.
//!
use crate::balance::Balance;
use crate::{Error, Result};
use serde::Deserialize;

/// Last synchronisation marker, reported either as a timestamp string or a number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SyncMarker {
    /// Numeric marker
    Number(i64),
    /// Free form marker, typically a timestamp
    Text(String),
}

impl std::fmt::Display for SyncMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Node status
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Initial sync has finished
    pub is_recovery_complete: bool,
    pub current_block: u64,
    pub last_block_from_governors: u64,
    pub last_synced_with_governor_nodes: SyncMarker,
    pub current_superblock: u64,
    pub last_superblock_from_bootnodes: u64,
    pub last_synced_with_bootnodes: SyncMarker,
    /// DNS names on the node certificate, in the order reported
    pub certificate_dns_names: Vec<String>,
    pub certificates_valid_upto: String,
    pub signing_address: String,
    /// Balance of the signing address
    pub signing_address_balance: Balance,
    /// Node software version
    pub version: String,
}

/// Decode a `/status` body. Every field is required.
pub fn decode(body: &[u8]) -> Result<StatusSnapshot> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;

    Ok(StatusSnapshot {
        is_recovery_complete: field(&raw, "isRecoveryComplete")?,
        current_block: field(&raw, "currentBlock")?,
        last_block_from_governors: field(&raw, "lastBlockFromGovernors")?,
        last_synced_with_governor_nodes: field(&raw, "lastSyncedWithGovernorNodes")?,
        current_superblock: field(&raw, "currentSuperblock")?,
        last_superblock_from_bootnodes: field(&raw, "lastSuperblockFromBootnodes")?,
        last_synced_with_bootnodes: field(&raw, "lastSyncedWithBootnodes")?,
        certificate_dns_names: field(&raw, "certificateDnsNames")?,
        certificates_valid_upto: field(&raw, "certificatesValidUpto")?,
        signing_address: field(&raw, "signingAddress")?,
        signing_address_balance: field(&raw, "signingAddressBalance")?,
        version: field(&raw, "version")?,
    })
}

fn field<T: serde::de::DeserializeOwned>(
    raw: &serde_json::Map<String, serde_json::Value>,
    name: &'static str,
) -> Result<T> {
    let value = raw.get(name).ok_or(Error::MissingField(name))?;
    T::deserialize(value).map_err(|source| Error::MalformedField { field: name, source })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::ErrorKind;

    pub(crate) const STATUS: &str = r#"{
        "isRecoveryComplete": true,
        "currentBlock": 1200,
        "lastBlockFromGovernors": 1201,
        "lastSyncedWithGovernorNodes": "2024-05-01T10:00:00Z",
        "currentSuperblock": 40,
        "lastSuperblockFromBootnodes": 40,
        "lastSyncedWithBootnodes": 1714557600,
        "certificateDnsNames": ["node.example.com", "alt.example.com"],
        "certificatesValidUpto": "2025-01-01T00:00:00Z",
        "signingAddress": "0xabc",
        "signingAddressBalance": "12500000000000000000",
        "version": "v1.4.0"
    }"#;

    fn without(field: &str) -> Vec<u8> {
        let mut value: serde_json::Value = serde_json::from_str(STATUS).unwrap();
        value.as_object_mut().unwrap().remove(field);
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn decode_full() {
        let status = decode(STATUS.as_bytes()).unwrap();
        assert!(status.is_recovery_complete);
        assert_eq!(status.current_block, 1200);
        assert_eq!(status.last_block_from_governors, 1201);
        assert_eq!(
            status.last_synced_with_governor_nodes,
            SyncMarker::Text("2024-05-01T10:00:00Z".into())
        );
        assert_eq!(status.last_synced_with_bootnodes, SyncMarker::Number(1_714_557_600));
        assert_eq!(
            status.certificate_dns_names,
            vec!["node.example.com", "alt.example.com"]
        );
        assert_eq!(status.signing_address_balance.to_string(), "12.5");
        assert_eq!(status.version, "v1.4.0");
    }

    #[test]
    fn missing_current_block() {
        let err = decode(&without("currentBlock")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(matches!(err, Error::MissingField("currentBlock")));
        assert!(err.to_string().contains("currentBlock"));
    }

    #[test]
    fn malformed_field_is_named() {
        let body = STATUS.replace("\"currentSuperblock\": 40", "\"currentSuperblock\": \"forty\"");
        let err = decode(body.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("currentSuperblock"));

        let body = STATUS.replace("\"12500000000000000000\"", "\"12.5\"");
        let err = decode(body.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedField {
                field: "signingAddressBalance",
                ..
            }
        ));
    }

    #[test]
    fn balance_must_be_digits() {
        for bad in ["\"\"", "\"  \"", "\"1_000\"", "\" 5\""] {
            let body = STATUS.replace("\"12500000000000000000\"", bad);
            let err = decode(body.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "{}", bad);
            assert!(
                matches!(
                    err,
                    Error::MalformedField {
                        field: "signingAddressBalance",
                        ..
                    }
                ),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn not_json() {
        let err = decode(b"<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = decode(b"[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
