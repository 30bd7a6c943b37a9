//! # Snapshot Format
//!
//! Binary encoding of a State for moving it between processes.
//!
//! Format: Header (5 bytes) + postcard-serialized State.
//! - 4 bytes: Magic ("GROW")
//! - 1 byte: Version
//!
//! Decoding validates size, magic and version BEFORE touching the payload,
//! then checks the decoded State's invariants.

use crate::primitives::{FORMAT_VERSION, HEADER_LEN, MAGIC_BYTES, MAX_SNAPSHOT_PAYLOAD_SIZE};
use crate::{GrowerError, State};

// =============================================================================
// HEADER
// =============================================================================

/// Leading bytes of every snapshot. Only the version varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u8,
}

impl SnapshotHeader {
    /// Header written by this build.
    pub const CURRENT: Self = Self {
        version: FORMAT_VERSION,
    };

    #[must_use]
    pub fn encode(self) -> [u8; HEADER_LEN] {
        let [g, r, o, w] = *MAGIC_BYTES;
        [g, r, o, w, self.version]
    }

    /// Split `bytes` into a header this build can read and the payload.
    pub fn split(bytes: &[u8]) -> Result<(Self, &[u8]), GrowerError> {
        let Some((head, payload)) = bytes.split_first_chunk::<HEADER_LEN>() else {
            return Err(GrowerError::DeserializationError(format!(
                "snapshot is {} bytes, shorter than its {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        };
        let [magic @ .., version] = head;
        if magic != MAGIC_BYTES {
            return Err(GrowerError::DeserializationError(
                "not a Grower snapshot (bad magic)".to_string(),
            ));
        }
        if *version != FORMAT_VERSION {
            return Err(GrowerError::DeserializationError(format!(
                "snapshot version {} is not supported by this build (reads {})",
                version, FORMAT_VERSION
            )));
        }
        Ok((Self { version: *version }, payload))
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a State to bytes (header + payload).
///
/// Encoding is deterministic: equal States produce identical bytes.
pub fn state_to_bytes(state: &State) -> Result<Vec<u8>, GrowerError> {
    let payload =
        postcard::to_stdvec(state).map_err(|e| GrowerError::SerializationError(e.to_string()))?;
    let mut bytes = SnapshotHeader::CURRENT.encode().to_vec();
    bytes.extend(payload);
    Ok(bytes)
}

/// Decode a State from bytes.
pub fn state_from_bytes(bytes: &[u8]) -> Result<State, GrowerError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(GrowerError::DeserializationError(format!(
            "snapshot of {} bytes is over the {} byte limit",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let (_, payload) = SnapshotHeader::split(bytes)?;
    let state: State = postcard::from_bytes(payload)
        .map_err(|e| GrowerError::DeserializationError(format!("snapshot payload: {}", e)))?;
    state.validate()?;

    Ok(state)
}

/// BLAKE3 hex digest of the State's snapshot encoding.
///
/// Two runs that end in equal States share a fingerprint.
#[cfg(feature = "crypto-hash")]
pub fn state_fingerprint(state: &State) -> Result<String, GrowerError> {
    let bytes = state_to_bytes(state)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handler, ValuePair};

    fn sample_state() -> State {
        State::blank()
            .with_value_changes(vec![ValuePair::new("pending", true)])
            .with_to_handle(vec![Handler::new("subtract").when("a")])
            .with_scratch_space(vec![ValuePair::new("a", 10), ValuePair::new("b", "text")])
            .with_handlers(vec![
                Handler::new("subtract")
                    .with_param("left", "a")
                    .with_param("right", "b")
                    .when("a"),
                Handler::new("audit"),
            ])
    }

    #[test]
    fn header_splits_off_payload() {
        let mut bytes = SnapshotHeader::CURRENT.encode().to_vec();
        bytes.extend_from_slice(b"tail");
        let (header, payload) = SnapshotHeader::split(&bytes).expect("split header");
        assert_eq!(header, SnapshotHeader::CURRENT);
        assert_eq!(payload, b"tail");
    }

    #[test]
    fn snapshot_restores_equal_state() {
        let state = sample_state();
        let bytes = state_to_bytes(&state).expect("encode");
        assert_eq!(&bytes[0..4], MAGIC_BYTES);
        assert_eq!(state_from_bytes(&bytes).expect("decode"), state);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = state_to_bytes(&State::blank()).expect("encode");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(state_from_bytes(&bytes).is_err());
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut bytes = state_to_bytes(&State::blank()).expect("encode");
        bytes[4] = FORMAT_VERSION.wrapping_add(1);
        assert!(matches!(
            state_from_bytes(&bytes),
            Err(GrowerError::DeserializationError(msg)) if msg.contains("version")
        ));
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(state_from_bytes(b"GRO").is_err());

        let bytes = state_to_bytes(&sample_state()).expect("encode");
        assert!(state_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn decoded_state_is_validated() {
        let broken = State::blank()
            .with_scratch_space(vec![ValuePair::new("dup", 1), ValuePair::new("dup", 2)]);
        let bytes = state_to_bytes(&broken).expect("encode");
        assert!(matches!(
            state_from_bytes(&bytes),
            Err(GrowerError::InvalidState(_))
        ));
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn fingerprint_is_stable() {
        let a = state_fingerprint(&sample_state()).expect("hash");
        let b = state_fingerprint(&sample_state()).expect("hash");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, state_fingerprint(&State::blank()).expect("hash"));
    }
}
