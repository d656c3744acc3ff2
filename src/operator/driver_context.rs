//! Per-driver execution context.

use crate::block::BlockFactory;

/// Resources of one driver: the block factory its evaluators build through.
///
/// A context is shared configuration for the evaluators created for it;
/// evaluators only request new blocks from it.
#[derive(Debug, Clone, Default)]
pub struct DriverContext {
    block_factory: BlockFactory,
}

impl DriverContext {
    pub fn new(block_factory: BlockFactory) -> Self {
        Self { block_factory }
    }

    pub fn block_factory(&self) -> &BlockFactory {
        &self.block_factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_shares_factory() {
        let factory = BlockFactory::new();
        let context = DriverContext::new(factory.clone());
        let _block = context
            .block_factory()
            .new_constant_bytes_ref_block(&b"x"[..], 1);
        assert_eq!(factory.outstanding(), 1);
    }

    #[test]
    fn test_default_contexts_are_independent() {
        let a = DriverContext::default();
        let b = DriverContext::default();
        let _block = a.block_factory().new_constant_bytes_ref_block(&b"x"[..], 1);
        assert_eq!(a.block_factory().outstanding(), 1);
        assert_eq!(b.block_factory().outstanding(), 0);
    }
}
