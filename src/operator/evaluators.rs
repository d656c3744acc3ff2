//! Leaf evaluators: channel references and literals.

use crate::block::{BlockRef, Page};
use crate::expression::EvalResult;
use crate::operator::{DriverContext, ExpressionEvaluator, ExpressionEvaluatorFactory};
use bytes::Bytes;
use std::fmt;

/// Reads one channel of the page.
///
/// The block stays owned by the page, so the returned reference is borrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvaluator {
    channel: usize,
}

impl ChannelEvaluator {
    pub fn new(channel: usize) -> Self {
        Self { channel }
    }
}

impl ExpressionEvaluator for ChannelEvaluator {
    fn eval(&self, page: &Page) -> EvalResult<BlockRef> {
        let block = page.get_block(self.channel)?;
        Ok(BlockRef::borrowed(block.clone()))
    }
}

impl fmt::Display for ChannelEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute[channel={}]", self.channel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvaluatorFactory {
    channel: usize,
}

impl ChannelEvaluatorFactory {
    pub fn new(channel: usize) -> Self {
        Self { channel }
    }
}

impl ExpressionEvaluatorFactory for ChannelEvaluatorFactory {
    fn get(&self, _context: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        Box::new(ChannelEvaluator::new(self.channel))
    }
}

impl fmt::Display for ChannelEvaluatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute[channel={}]", self.channel)
    }
}

/// Produces a constant byte-string block the size of the page.
#[derive(Debug, Clone)]
pub struct LiteralEvaluator {
    value: Bytes,
    context: DriverContext,
}

impl LiteralEvaluator {
    pub fn new(value: impl Into<Bytes>, context: DriverContext) -> Self {
        Self {
            value: value.into(),
            context,
        }
    }
}

impl ExpressionEvaluator for LiteralEvaluator {
    fn eval(&self, page: &Page) -> EvalResult<BlockRef> {
        Ok(self
            .context
            .block_factory()
            .new_constant_bytes_ref_block(self.value.clone(), page.position_count()))
    }
}

impl fmt::Display for LiteralEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralsEvaluator[lit={}]", String::from_utf8_lossy(&self.value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralEvaluatorFactory {
    value: Bytes,
}

impl LiteralEvaluatorFactory {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ExpressionEvaluatorFactory for LiteralEvaluatorFactory {
    fn get(&self, context: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        Box::new(LiteralEvaluator::new(self.value.clone(), context.clone()))
    }
}

impl fmt::Display for LiteralEvaluatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralsEvaluator[lit={}]", String::from_utf8_lossy(&self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockError, BytesRefVector};
    use crate::expression::EvalError;

    fn page() -> Page {
        Page::new(vec![Block::BytesRef(
            BytesRefVector::from_values(["a", "b", "c"]).as_block(),
        )])
        .unwrap()
    }

    #[test]
    fn test_channel_evaluator_borrows_page_block() -> EvalResult<()> {
        let evaluator = ChannelEvaluatorFactory::new(0).get(&DriverContext::default());
        let page = page();
        let block_ref = evaluator.eval(&page)?;
        assert!(!block_ref.is_floating());
        assert_eq!(block_ref.block(), page.get_block(0)?);
        assert_eq!(evaluator.to_string(), "Attribute[channel=0]");
        Ok(())
    }

    #[test]
    fn test_channel_evaluator_out_of_bounds() {
        let evaluator = ChannelEvaluator::new(2);
        let err = evaluator.eval(&page()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Block(BlockError::ChannelOutOfBounds { channel: 2, .. })
        ));
    }

    #[test]
    fn test_literal_evaluator_builds_floating_constant() -> EvalResult<()> {
        let context = DriverContext::default();
        let evaluator = LiteralEvaluatorFactory::new("10.0.0.0/8").get(&context);
        let block_ref = evaluator.eval(&page())?;

        assert!(block_ref.is_floating());
        assert_eq!(context.block_factory().outstanding(), 1);
        let vector = block_ref.block().as_bytes_ref()?.as_vector().unwrap();
        assert_eq!(vector.position_count(), 3);
        assert_eq!(vector.get_bytes_ref(2), b"10.0.0.0/8");
        assert_eq!(evaluator.to_string(), "LiteralsEvaluator[lit=10.0.0.0/8]");

        block_ref.release()?;
        assert_eq!(context.block_factory().outstanding(), 0);
        Ok(())
    }
}
