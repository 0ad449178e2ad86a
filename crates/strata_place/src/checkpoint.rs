//! Placement checkpoints.
//!
//! A checkpoint is stored as a 4-byte little-endian header length, a
//! bincode-encoded [`CheckpointHeader`], and the bincode-encoded
//! [`PlacementCheckpoint`] payload. The header carries magic bytes, a format
//! version and an XXH3 checksum of the payload.

use crate::cost::PlacerCosts;
use crate::error::{PlaceError, PlaceResult};
use crate::state::BlockLocations;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_arch::Loc;
use strata_common::ContentHash;

/// Magic bytes identifying a Strata placement checkpoint.
const CHECKPOINT_MAGIC: [u8; 4] = *b"STRP";

/// Current checkpoint format version.
const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Header prepended to every checkpoint artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHeader {
    /// Magic bytes: must be `b"STRP"`.
    pub magic: [u8; 4],
    /// Checkpoint format version.
    pub format_version: u32,
    /// Content hash of the payload.
    pub checksum: ContentHash,
}

/// A saved placement and the costs it had when saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementCheckpoint {
    /// Location of every block, in block order.
    pub locations: Vec<Loc>,
    /// Cost terms at capture time.
    pub costs: PlacerCosts,
    /// Critical path delay at capture time.
    pub critical_path_delay: f64,
}

impl PlacementCheckpoint {
    /// Captures the current placement.
    pub fn capture(locations: &BlockLocations, costs: &PlacerCosts, critical_path_delay: f64) -> Self {
        Self {
            locations: locations.to_vec(),
            costs: *costs,
            critical_path_delay,
        }
    }

    /// Whether this checkpoint has a better critical path than `other`.
    pub fn improves_on(&self, other: Option<&PlacementCheckpoint>) -> bool {
        other.map_or(true, |o| self.critical_path_delay < o.critical_path_delay)
    }

    /// Encodes the checkpoint with its header.
    pub fn encode(&self) -> PlaceResult<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| checkpoint_error(format!("cannot encode payload: {e}")))?;
        let header = CheckpointHeader {
            magic: CHECKPOINT_MAGIC,
            format_version: CHECKPOINT_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| checkpoint_error(format!("cannot encode header: {e}")))?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);
        Ok(output)
    }

    /// Decodes a checkpoint, validating magic, version and checksum.
    pub fn decode(raw: &[u8]) -> PlaceResult<Self> {
        let len_bytes: [u8; 4] = raw
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| checkpoint_error("truncated header length"))?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;
        let header_bytes = raw
            .get(4..4 + header_len)
            .ok_or_else(|| checkpoint_error("truncated header"))?;
        let (header, _): (CheckpointHeader, usize) =
            bincode::serde::decode_from_slice(header_bytes, bincode::config::standard())
                .map_err(|e| checkpoint_error(format!("malformed header: {e}")))?;

        if header.magic != CHECKPOINT_MAGIC {
            return Err(checkpoint_error("not a placement checkpoint"));
        }
        if header.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(checkpoint_error(format!(
                "unsupported format version {}",
                header.format_version
            )));
        }
        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return Err(checkpoint_error("checksum mismatch"));
        }
        let (checkpoint, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| checkpoint_error(format!("malformed payload: {e}")))?;
        Ok(checkpoint)
    }

    /// Writes the encoded checkpoint to `path`.
    pub fn write_to(&self, path: &Path) -> PlaceResult<()> {
        let bytes = self.encode()?;
        std::fs::write(path, bytes)
            .map_err(|e| checkpoint_error(format!("cannot write {}: {e}", path.display())))
    }

    /// Reads and validates a checkpoint from `path`.
    pub fn read_from(path: &Path) -> PlaceResult<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| checkpoint_error(format!("cannot read {}: {e}", path.display())))?;
        Self::decode(&raw)
    }
}

fn checkpoint_error(reason: impl Into<String>) -> PlaceError {
    PlaceError::Checkpoint {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlacementCheckpoint {
        PlacementCheckpoint {
            locations: vec![Loc::new(1, 2, 0), Loc::new(3, 4, 1)],
            costs: PlacerCosts {
                cost: 1.0,
                bb_cost: 12.0,
                timing_cost: 0.75,
                ..PlacerCosts::default()
            },
            critical_path_delay: 2.5,
        }
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.strp");
        sample().write_to(&path).unwrap();
        assert_eq!(PlacementCheckpoint::read_from(&path).unwrap(), sample());
    }

    #[test]
    fn corrupted_payload_rejected() {
        let mut bytes = sample().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = PlacementCheckpoint::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut bytes = sample().encode().unwrap();
        // The header starts with the four magic bytes.
        bytes[4] = b'X';
        assert!(PlacementCheckpoint::decode(&bytes).is_err());
        assert!(PlacementCheckpoint::decode(&bytes[..3]).is_err());
    }

    #[test]
    fn lower_cpd_improves() {
        let a = sample();
        let mut b = sample();
        b.critical_path_delay = 2.0;
        assert!(a.improves_on(None));
        assert!(b.improves_on(Some(&a)));
        assert!(!a.improves_on(Some(&b)));
    }
}
