//! Pages: the batches of rows that flow between operators.

use crate::block::{Block, BlockError, BlockResult};

/// A batch of rows, stored as one block per channel.
///
/// Every block of a page has the same position count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    blocks: Vec<Block>,
    position_count: usize,
}

impl Page {
    /// Create a page from its blocks.
    ///
    /// Fails if the blocks disagree on their position count.
    pub fn new(blocks: Vec<Block>) -> BlockResult<Self> {
        let position_count = blocks.first().map_or(0, Block::position_count);
        Self::with_position_count(position_count, blocks)
    }

    /// Create a page with an explicit position count, which also allows a
    /// page without any blocks.
    pub fn with_position_count(position_count: usize, blocks: Vec<Block>) -> BlockResult<Self> {
        if let Some(block) = blocks.iter().find(|b| b.position_count() != position_count) {
            return Err(BlockError::PositionCountMismatch {
                expected: position_count,
                actual: block.position_count(),
            });
        }
        Ok(Self {
            blocks,
            position_count,
        })
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn get_block(&self, channel: usize) -> BlockResult<&Block> {
        self.blocks
            .get(channel)
            .ok_or(BlockError::ChannelOutOfBounds {
                channel,
                block_count: self.blocks.len(),
            })
    }
}
