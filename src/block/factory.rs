//! Block factory: the per-driver allocator every block is built through.
//!
//! The factory hands out an [`Allocation`] for each block it builds and keeps
//! the live ones in a concurrent map, so callers can check that everything
//! they obtained was released.

use crate::block::{
    Block, BlockError, BlockRef, BlockResult, BooleanBlockBuilder, BooleanVectorBuilder,
    BytesRefBlock, BytesRefBlockBuilder, BytesRefVector,
};
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Identifier of one tracked block allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(pub u64);

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ticket for a live block allocation. Releasing consumes it.
#[derive(Debug)]
pub struct Allocation {
    inner: Arc<FactoryInner>,
    id: AllocationId,
}

impl Allocation {
    pub fn id(&self) -> AllocationId {
        self.id
    }

    /// Return the allocation to its factory.
    pub fn release(self) -> BlockResult<()> {
        release_id(&self.inner, self.id)
    }
}

#[derive(Clone, Default)]
pub struct BlockFactory {
    inner: Arc<FactoryInner>,
}

#[derive(Debug, Default)]
struct FactoryInner {
    live: DashMap<AllocationId, usize>,
    next_id: AtomicU64,
    bytes_used: AtomicUsize,
}

impl BlockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `block` as a new allocation and return an owning reference.
    pub fn track(&self, block: Block) -> BlockRef {
        let allocation = self.allocate(block.byte_size());
        BlockRef::floating(block, allocation)
    }

    /// Release an allocation by id.
    ///
    /// Fails with [`BlockError::AlreadyReleased`] if the id is not live.
    pub fn release(&self, id: AllocationId) -> BlockResult<()> {
        release_id(&self.inner, id)
    }

    /// Number of allocations that have not been released yet.
    pub fn outstanding(&self) -> usize {
        self.inner.live.len()
    }

    /// Estimated bytes held by unreleased allocations.
    pub fn bytes_used(&self) -> usize {
        self.inner.bytes_used.load(Ordering::SeqCst)
    }

    pub fn is_live(&self, id: AllocationId) -> bool {
        self.inner.live.contains_key(&id)
    }

    pub fn new_bytes_ref_block_builder(&self, estimated_positions: usize) -> BytesRefBlockBuilder {
        BytesRefBlockBuilder::new(estimated_positions, self.clone())
    }

    pub fn new_boolean_block_builder(&self, estimated_positions: usize) -> BooleanBlockBuilder {
        BooleanBlockBuilder::new(estimated_positions, self.clone())
    }

    pub fn new_boolean_vector_builder(&self, estimated_positions: usize) -> BooleanVectorBuilder {
        BooleanVectorBuilder::new(estimated_positions, self.clone())
    }

    /// A block repeating `value` at every position.
    pub fn new_constant_bytes_ref_block(
        &self,
        value: impl Into<Bytes>,
        position_count: usize,
    ) -> BlockRef {
        let vector = BytesRefVector::constant(value, position_count);
        self.track(Block::BytesRef(BytesRefBlock::Vector(vector)))
    }

    fn allocate(&self, bytes: usize) -> Allocation {
        let id = AllocationId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner.live.insert(id, bytes);
        self.inner.bytes_used.fetch_add(bytes, Ordering::SeqCst);
        Allocation {
            inner: self.inner.clone(),
            id,
        }
    }
}

impl fmt::Debug for BlockFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockFactory")
            .field("outstanding", &self.outstanding())
            .field("bytes_used", &self.bytes_used())
            .finish()
    }
}

fn release_id(inner: &FactoryInner, id: AllocationId) -> BlockResult<()> {
    let (_, bytes) = inner
        .live
        .remove(&id)
        .ok_or(BlockError::AlreadyReleased(id))?;
    inner.bytes_used.fetch_sub(bytes, Ordering::SeqCst);
    Ok(())
}
