//! Owning references to blocks.

use crate::block::{Allocation, AllocationId, Block, BlockResult};
use crate::release::Releasable;
use log::warn;

/// A reference to a block returned by an evaluator.
///
/// A floating reference owns an allocation of the block factory and must be
/// released exactly once. A borrowed reference points at a block owned by
/// someone else (usually the page) and releasing it does nothing.
/// Dropping a reference that still holds its allocation releases it.
#[derive(Debug)]
pub struct BlockRef {
    block: Block,
    allocation: Option<Allocation>,
}

impl BlockRef {
    pub fn floating(block: Block, allocation: Allocation) -> Self {
        Self {
            block,
            allocation: Some(allocation),
        }
    }

    pub fn borrowed(block: Block) -> Self {
        Self {
            block,
            allocation: None,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn is_floating(&self) -> bool {
        self.allocation.is_some()
    }

    pub fn allocation_id(&self) -> Option<AllocationId> {
        self.allocation.as_ref().map(Allocation::id)
    }

    /// Release the reference, reporting a failed release.
    pub fn release(mut self) -> BlockResult<()> {
        self.close()
    }
}

impl Releasable for BlockRef {
    fn close(&mut self) -> BlockResult<()> {
        match self.allocation.take() {
            Some(allocation) => allocation.release(),
            None => Ok(()),
        }
    }
}

impl Drop for BlockRef {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release block on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockFactory, BytesRefBlock, BytesRefVector};

    fn constant_block() -> Block {
        Block::BytesRef(BytesRefBlock::Vector(BytesRefVector::constant(
            &b"1.2.3.4"[..],
            2,
        )))
    }

    #[test]
    fn test_borrowed_release_is_noop() -> BlockResult<()> {
        let block_ref = BlockRef::borrowed(constant_block());
        assert!(!block_ref.is_floating());
        assert_eq!(block_ref.allocation_id(), None);
        block_ref.release()
    }

    #[test]
    fn test_drop_releases_floating() {
        let factory = BlockFactory::new();
        {
            let block_ref = factory.track(constant_block());
            assert!(block_ref.is_floating());
            assert_eq!(factory.outstanding(), 1);
        }
        assert_eq!(factory.outstanding(), 0);
    }

    #[test]
    fn test_close_twice_releases_once() -> BlockResult<()> {
        let factory = BlockFactory::new();
        let mut block_ref = factory.track(constant_block());
        block_ref.close()?;
        block_ref.close()?;
        assert!(!block_ref.is_floating());
        assert_eq!(factory.outstanding(), 0);
        Ok(())
    }
}
