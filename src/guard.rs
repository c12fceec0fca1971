//! Content digests for serialized engine state.
//!
//! Every persisted snapshot carries the SHA-256 of its canonical
//! serialization. The guard recomputes that digest on the way back out, so a
//! record whose state was altered after the write can never be loaded
//! silently.

use crate::error::{PersistenceError, Result};
use crate::types::{Hash, StateObject};

/// State to verify, either already serialized or as a state object.
#[derive(Clone, Copy, Debug)]
pub enum StateInput<'a> {
    /// Canonical serialized form, compared byte for byte.
    Serialized(&'a str),
    /// A state object; validated and canonicalized before hashing.
    Object(&'a StateObject),
}

impl<'a> From<&'a str> for StateInput<'a> {
    fn from(s: &'a str) -> Self {
        StateInput::Serialized(s)
    }
}

impl<'a> From<&'a StateObject> for StateInput<'a> {
    fn from(state: &'a StateObject) -> Self {
        StateInput::Object(state)
    }
}

/// Computes and verifies state digests.
pub struct HashGuard;

impl HashGuard {
    /// Digest of an already serialized state.
    pub fn digest(serialized: &str) -> Hash {
        Hash::from_bytes(serialized.as_bytes())
    }

    /// Canonicalize a state and return its digest.
    pub fn compute(state: &StateObject) -> Result<Hash> {
        Ok(Self::digest(&state.canonical()?))
    }

    /// Check a state against a hex digest.
    ///
    /// Fails with a validation error when `hash` is not a 64-character hex
    /// string, or when an object input is not a valid state.
    pub fn verify<'a>(state: impl Into<StateInput<'a>>, hash: &str) -> Result<bool> {
        let expected = parse_hash(hash)?;

        let computed = match state.into() {
            StateInput::Serialized(serialized) => Self::digest(serialized),
            StateInput::Object(state) => {
                state.validate()?;
                Self::compute(state)?
            }
        };

        Ok(computed == expected)
    }

    /// Check a serialized state against a parsed digest.
    pub fn verify_hash(serialized: &str, expected: &Hash) -> bool {
        Self::digest(serialized) == *expected
    }
}

/// Parse a caller-supplied hex digest, rejecting anything malformed.
pub(crate) fn parse_hash(hash: &str) -> Result<Hash> {
    if hash.len() != Hash::HEX_LEN {
        return Err(PersistenceError::Validation(format!(
            "hash must be {} hex characters, got {}",
            Hash::HEX_LEN,
            hash.len()
        )));
    }

    Hash::from_hex(hash)
        .map_err(|e| PersistenceError::Validation(format!("hash is not valid hex: {e}")))
}
