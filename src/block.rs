//! Columnar data model for batch evaluation.
//!
//! This module provides:
//! - Vectors: dense columns with exactly one value per position
//! - Blocks: general columns that may hold nulls and multi-valued positions
//! - Pages: batches of rows made of one block per channel
//! - The block factory that tracks every block it builds
//! - Owning block references released exactly once

pub mod block_ref;
pub mod boolean;
pub mod bytes_ref;
pub mod error;
pub mod factory;
pub mod page;
pub mod positions;

pub use block_ref::BlockRef;
pub use boolean::{
    BooleanArrayBlock, BooleanBlock, BooleanBlockBuilder, BooleanVector, BooleanVectorBuilder,
};
pub use bytes_ref::{
    BytesRefArray, BytesRefArrayBlock, BytesRefBlock, BytesRefBlockBuilder, BytesRefVector,
};
pub use error::{BlockError, BlockResult};
pub use factory::{Allocation, AllocationId, BlockFactory};
pub use page::Page;
pub use positions::Positions;

use std::fmt;

/// Element types a block can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Boolean,
    BytesRef,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Boolean => "BOOLEAN",
            ElementType::BytesRef => "BYTES_REF",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block of any element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Boolean(BooleanBlock),
    BytesRef(BytesRefBlock),
}

impl Block {
    pub fn element_type(&self) -> ElementType {
        match self {
            Block::Boolean(_) => ElementType::Boolean,
            Block::BytesRef(_) => ElementType::BytesRef,
        }
    }

    pub fn position_count(&self) -> usize {
        match self {
            Block::Boolean(block) => block.position_count(),
            Block::BytesRef(block) => block.position_count(),
        }
    }

    pub fn as_boolean(&self) -> BlockResult<&BooleanBlock> {
        match self {
            Block::Boolean(block) => Ok(block),
            other => Err(BlockError::UnexpectedElementType {
                expected: ElementType::Boolean,
                actual: other.element_type(),
            }),
        }
    }

    pub fn as_bytes_ref(&self) -> BlockResult<&BytesRefBlock> {
        match self {
            Block::BytesRef(block) => Ok(block),
            other => Err(BlockError::UnexpectedElementType {
                expected: ElementType::BytesRef,
                actual: other.element_type(),
            }),
        }
    }

    pub(crate) fn byte_size(&self) -> usize {
        match self {
            Block::Boolean(block) => block.byte_size(),
            Block::BytesRef(block) => block.byte_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let block = Block::Boolean(BooleanVector::constant(false, 1).as_block());
        assert_eq!(block.element_type(), ElementType::Boolean);
        assert!(block.as_boolean().is_ok());
        assert_eq!(
            block.as_bytes_ref(),
            Err(BlockError::UnexpectedElementType {
                expected: ElementType::BytesRef,
                actual: ElementType::Boolean,
            })
        );
    }
}
