//! Core types for snapshot persistence.

use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fields every engine state must carry before it can be persisted.
pub const REQUIRED_STATE_FIELDS: [&str; 4] = ["name", "state", "engineVersion", "definitions"];

/// Store-assigned identifier of a snapshot record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content digest of a serialized state (SHA-256).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Length of the hex form.
    pub const HEX_LEN: usize = 64;

    /// Compute hash from bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Hash(hasher.finalize().into())
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Hash(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Timestamp(micros)
    }

    /// The next representable instant.
    pub fn next(self) -> Self {
        Timestamp(self.0 + 1)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Engine state as produced by the process engine.
///
/// The wrapped value is an arbitrary JSON object; only the presence of
/// [`REQUIRED_STATE_FIELDS`] is checked. Serialization is canonical: the
/// default `serde_json::Map` keeps keys sorted, so equal states always
/// produce identical bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateObject(Value);

impl StateObject {
    /// Wrap a JSON value without validating it.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a serialized state.
    pub fn from_json(serialized: &str) -> Result<Self> {
        serde_json::from_str(serialized)
            .map(Self)
            .map_err(|e| PersistenceError::Deserialization(e.to_string()))
    }

    /// Check the state carries every required field with a non-empty value.
    pub fn validate(&self) -> Result<()> {
        let Some(map) = self.0.as_object() else {
            return Err(PersistenceError::Validation(
                "state must be a JSON object".into(),
            ));
        };

        for field in REQUIRED_STATE_FIELDS {
            match map.get(field) {
                Some(value) if is_present(value) => {}
                _ => {
                    return Err(PersistenceError::Validation(format!(
                        "state is missing required field `{field}`"
                    )))
                }
            }
        }

        Ok(())
    }

    /// Canonical serialized form (compact JSON, sorted keys).
    pub fn canonical(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Borrow the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Mutable access to the underlying value.
    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    /// Unwrap into the underlying value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Convenience accessor for a top-level string field.
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

impl From<Value> for StateObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// A snapshot as persisted in the document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub instance_id: String,

    /// Escaped canonical serialization of the state.
    pub state: String,

    /// 64-character lowercase hex digest of the unescaped state.
    pub hash: String,

    pub created_at: Timestamp,

    pub created_by: String,
}

/// A document together with its store-assigned id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: RecordId,
    #[serde(flatten)]
    pub document: SnapshotDocument,
}

/// A verified, decoded snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub record_id: RecordId,
    pub instance_id: String,
    pub state: StateObject,
    pub hash: Hash,
    pub created_at: Timestamp,
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_state() -> StateObject {
        StateObject::new(json!({
            "name": "undefined",
            "state": "running",
            "engineVersion": "4.2.0",
            "definitions": [{"id": "anonymous", "state": "running"}]
        }))
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = Hash::from_bytes(b"hello world");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), Hash::HEX_LEN);
        assert_eq!(Hash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn test_hash_rejects_short_hex() {
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_timestamp_now_is_positive_micros() {
        let now = Timestamp::now();
        assert!(now.0 > 1_000_000_000_000_000);
        assert!(now.next() > now);
    }

    #[test]
    fn test_valid_state_passes() {
        valid_state().validate().unwrap();
    }

    #[test]
    fn test_empty_state_rejected() {
        let result = StateObject::new(json!({})).validate();
        assert!(matches!(result, Err(PersistenceError::Validation(_))));
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut state = valid_state();
        state.as_value_mut()["engineVersion"] = json!("");
        assert!(state.validate().is_err());

        let mut state = valid_state();
        state.as_value_mut()["definitions"] = json!([]);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(StateObject::new(json!("running")).validate().is_err());
    }

    #[test]
    fn test_canonical_sorts_keys() {
        let a = StateObject::from_json(r#"{"b":1,"a":2}"#).unwrap();
        let b = StateObject::from_json(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(a.canonical().unwrap(), b.canonical().unwrap());
        assert_eq!(a.canonical().unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_document_wire_shape() {
        let doc = SnapshotDocument {
            instance_id: "i-1".into(),
            state: "{}".into(),
            hash: Hash::from_bytes(b"{}").to_hex(),
            created_at: Timestamp(42),
            created_by: "anonymous".into(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["instanceId"], "i-1");
        assert_eq!(value["createdAt"], 42);
        assert_eq!(value["createdBy"], "anonymous");
    }
}
