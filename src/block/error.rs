//! Block layer error types.

use crate::block::{AllocationId, ElementType};
use thiserror::Error;

/// Errors that can occur while building, accessing or releasing blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block allocation {0} was already released")]
    AlreadyReleased(AllocationId),

    #[error("Unexpected element type: expected {expected}, got {actual}")]
    UnexpectedElementType {
        expected: ElementType,
        actual: ElementType,
    },

    #[error("Position count mismatch: expected {expected} positions, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    #[error("Channel {channel} out of bounds for page with {block_count} blocks")]
    ChannelOutOfBounds { channel: usize, block_count: usize },

    #[error("Release failed: {first} ({} more suppressed)", .suppressed.len())]
    Release {
        first: Box<BlockError>,
        suppressed: Vec<BlockError>,
    },
}

impl BlockError {
    /// Combine a list of release failures into a single error.
    ///
    /// Returns `None` when the list is empty. A single failure is returned as-is.
    pub fn from_release_failures(mut failures: Vec<BlockError>) -> Option<BlockError> {
        if failures.is_empty() {
            return None;
        }
        let first = failures.remove(0);
        if failures.is_empty() {
            Some(first)
        } else {
            Some(BlockError::Release {
                first: Box::new(first),
                suppressed: failures,
            })
        }
    }

    /// Every individual failure carried by this error, first one first.
    pub fn failures(&self) -> Vec<&BlockError> {
        match self {
            BlockError::Release { first, suppressed } => {
                let mut all = first.failures();
                all.extend(suppressed.iter().flat_map(|e| e.failures()));
                all
            }
            other => vec![other],
        }
    }
}

/// Result type for block operations.
pub type BlockResult<T> = Result<T, BlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BlockError::AlreadyReleased(AllocationId(7));
        assert_eq!(err.to_string(), "Block allocation #7 was already released");

        let err = BlockError::UnexpectedElementType {
            expected: ElementType::BytesRef,
            actual: ElementType::Boolean,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected element type: expected BYTES_REF, got BOOLEAN"
        );

        let err = BlockError::ChannelOutOfBounds {
            channel: 3,
            block_count: 1,
        };
        assert_eq!(
            err.to_string(),
            "Channel 3 out of bounds for page with 1 blocks"
        );
    }

    #[test]
    fn test_release_failures_aggregate() {
        assert_eq!(BlockError::from_release_failures(vec![]), None);

        let single = BlockError::from_release_failures(vec![BlockError::AlreadyReleased(
            AllocationId(1),
        )])
        .unwrap();
        assert_eq!(single, BlockError::AlreadyReleased(AllocationId(1)));

        let combined = BlockError::from_release_failures(vec![
            BlockError::AlreadyReleased(AllocationId(1)),
            BlockError::AlreadyReleased(AllocationId(2)),
            BlockError::AlreadyReleased(AllocationId(3)),
        ])
        .unwrap();
        assert_eq!(
            combined.to_string(),
            "Release failed: Block allocation #1 was already released (2 more suppressed)"
        );
        assert_eq!(combined.failures().len(), 3);
    }
}
