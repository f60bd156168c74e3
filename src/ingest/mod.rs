//! Frame ingestion.
//!
//! Frames of one stream live in a directory, one image per frame, named by
//! an increasing sequence number (`0000142.png`). Renamed datasets may carry
//! a prefix (`13R_0000142.png`); the trailing integer is the sequence number.
//!
//! The ingestion layer is responsible for:
//! - Deriving frame order from names
//! - Rejecting ambiguous streams (duplicate sequence numbers)
//! - Pairing frames with their materialised label files

pub mod file;

use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use regex::Regex;

pub use file::{audit_label_pairs, DirectorySource, LabelAudit};

fn trailing_digits() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)$").ok())
        .as_ref()
        .ok_or_else(|| anyhow!("frame sequence pattern failed to compile"))
}

/// Sequence number of a frame from its file stem.
pub fn frame_sequence(stem: &str) -> Result<u64> {
    let caps = trailing_digits()?
        .captures(stem)
        .ok_or_else(|| anyhow!("frame name '{}' has no trailing sequence number", stem))?;
    caps[1]
        .parse()
        .map_err(|e| anyhow!("frame name '{}': bad sequence number: {}", stem, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_from_stem() -> Result<()> {
        assert_eq!(frame_sequence("0000142")?, 142);
        assert_eq!(frame_sequence("13R_0000142")?, 142);
        assert_eq!(frame_sequence("0")?, 0);
        assert!(frame_sequence("left").is_err());
        assert!(frame_sequence("0000142_depth").is_err());
        assert!(frame_sequence("99999999999999999999999").is_err());
        Ok(())
    }
}
