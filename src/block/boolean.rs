//! Boolean columns.

use crate::block::positions::{Positions, PositionsBuilder};
use crate::block::{Block, BlockFactory, BlockRef};
use std::sync::Arc;

/// A boolean column with exactly one non-null value per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanVector {
    Array(Arc<[bool]>),
    Constant { value: bool, position_count: usize },
}

impl BooleanVector {
    pub fn from_values(values: impl Into<Arc<[bool]>>) -> Self {
        BooleanVector::Array(values.into())
    }

    pub fn constant(value: bool, position_count: usize) -> Self {
        BooleanVector::Constant {
            value,
            position_count,
        }
    }

    pub fn position_count(&self) -> usize {
        match self {
            BooleanVector::Array(values) => values.len(),
            BooleanVector::Constant { position_count, .. } => *position_count,
        }
    }

    pub fn get_boolean(&self, position: usize) -> bool {
        match self {
            BooleanVector::Array(values) => values[position],
            BooleanVector::Constant { value, .. } => *value,
        }
    }

    pub fn as_block(&self) -> BooleanBlock {
        BooleanBlock::Vector(self.clone())
    }

    pub(crate) fn byte_size(&self) -> usize {
        match self {
            BooleanVector::Array(values) => values.len(),
            BooleanVector::Constant { .. } => 1,
        }
    }
}

/// A boolean column that may hold nulls and multi-valued positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanArrayBlock {
    values: Arc<[bool]>,
    positions: Positions,
}

impl BooleanArrayBlock {
    pub fn new(values: impl Into<Arc<[bool]>>, positions: Positions) -> Self {
        let values = values.into();
        debug_assert!(positions.first_value_index(positions.position_count()) <= values.len());
        Self { values, positions }
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    fn is_vector_shaped(&self) -> bool {
        self.positions.is_dense_single_valued()
            && self.values.len() == self.positions.position_count()
    }
}

/// A boolean column in either representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanBlock {
    Vector(BooleanVector),
    Array(BooleanArrayBlock),
}

impl BooleanBlock {
    pub fn position_count(&self) -> usize {
        match self {
            BooleanBlock::Vector(vector) => vector.position_count(),
            BooleanBlock::Array(block) => block.positions.position_count(),
        }
    }

    pub fn is_null(&self, position: usize) -> bool {
        match self {
            BooleanBlock::Vector(_) => false,
            BooleanBlock::Array(block) => block.positions.is_null(position),
        }
    }

    pub fn get_value_count(&self, position: usize) -> usize {
        match self {
            BooleanBlock::Vector(_) => 1,
            BooleanBlock::Array(block) => block.positions.value_count(position),
        }
    }

    pub fn get_first_value_index(&self, position: usize) -> usize {
        match self {
            BooleanBlock::Vector(_) => position,
            BooleanBlock::Array(block) => block.positions.first_value_index(position),
        }
    }

    pub fn get_boolean(&self, value_index: usize) -> bool {
        match self {
            BooleanBlock::Vector(vector) => vector.get_boolean(value_index),
            BooleanBlock::Array(block) => block.values[value_index],
        }
    }

    pub fn may_have_nulls(&self) -> bool {
        match self {
            BooleanBlock::Vector(_) => false,
            BooleanBlock::Array(block) => block.positions.may_have_nulls(),
        }
    }

    pub fn as_vector(&self) -> Option<BooleanVector> {
        match self {
            BooleanBlock::Vector(vector) => Some(vector.clone()),
            BooleanBlock::Array(block) if block.is_vector_shaped() => {
                Some(BooleanVector::Array(block.values.clone()))
            }
            BooleanBlock::Array(_) => None,
        }
    }

    /// Read the block as one optional value per position.
    ///
    /// Multi-valued positions read as their first value.
    pub fn to_nullable_vec(&self) -> Vec<Option<bool>> {
        (0..self.position_count())
            .map(|p| {
                if self.is_null(p) || self.get_value_count(p) == 0 {
                    None
                } else {
                    Some(self.get_boolean(self.get_first_value_index(p)))
                }
            })
            .collect()
    }

    pub(crate) fn byte_size(&self) -> usize {
        match self {
            BooleanBlock::Vector(vector) => vector.byte_size(),
            BooleanBlock::Array(block) => block.values.len() + block.positions.byte_size(),
        }
    }
}

/// Builder for [`BooleanBlock`]s that may hold nulls.
#[derive(Debug)]
pub struct BooleanBlockBuilder {
    factory: BlockFactory,
    values: Vec<bool>,
    positions: PositionsBuilder,
}

impl BooleanBlockBuilder {
    pub(crate) fn new(estimated_positions: usize, factory: BlockFactory) -> Self {
        Self {
            factory,
            values: Vec::with_capacity(estimated_positions),
            positions: PositionsBuilder::with_capacity(estimated_positions),
        }
    }

    pub fn append_boolean(&mut self, value: bool) -> &mut Self {
        self.values.push(value);
        self.positions.value_appended();
        self
    }

    pub fn append_null(&mut self) -> &mut Self {
        self.positions.null_appended();
        self
    }

    pub fn begin_positions_entry(&mut self) -> &mut Self {
        self.positions.begin_entry();
        self
    }

    pub fn end_positions_entry(&mut self) -> &mut Self {
        self.positions.end_entry();
        self
    }

    pub fn position_count(&self) -> usize {
        self.positions.position_count()
    }

    pub fn build(self) -> BlockRef {
        let positions = self.positions.build();
        let block = if positions.is_dense_single_valued() {
            BooleanBlock::Vector(BooleanVector::from_values(self.values))
        } else {
            BooleanBlock::Array(BooleanArrayBlock::new(self.values, positions))
        };
        self.factory.track(Block::Boolean(block))
    }
}

/// Builder for [`BooleanVector`]s; every position gets a value.
#[derive(Debug)]
pub struct BooleanVectorBuilder {
    factory: BlockFactory,
    values: Vec<bool>,
}

impl BooleanVectorBuilder {
    pub(crate) fn new(estimated_positions: usize, factory: BlockFactory) -> Self {
        Self {
            factory,
            values: Vec::with_capacity(estimated_positions),
        }
    }

    pub fn append_boolean(&mut self, value: bool) -> &mut Self {
        self.values.push(value);
        self
    }

    pub fn position_count(&self) -> usize {
        self.values.len()
    }

    /// Build the vector as a block and register it with the factory.
    pub fn build(self) -> BlockRef {
        let vector = BooleanVector::from_values(self.values);
        self.factory.track(Block::Boolean(vector.as_block()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_builder_with_nulls() {
        let factory = BlockFactory::new();
        let mut builder = factory.new_boolean_block_builder(3);
        builder.append_boolean(true).append_null().append_boolean(false);
        let block_ref = builder.build();
        let block = block_ref.block().as_boolean().unwrap();

        assert_eq!(block.position_count(), 3);
        assert!(block.may_have_nulls());
        assert_eq!(block.as_vector(), None);
        assert_eq!(block.to_nullable_vec(), vec![Some(true), None, Some(false)]);
    }

    #[test]
    fn test_block_builder_without_nulls_is_vector() {
        let factory = BlockFactory::new();
        let mut builder = factory.new_boolean_block_builder(2);
        builder.append_boolean(false).append_boolean(true);
        let block_ref = builder.build();
        let block = block_ref.block().as_boolean().unwrap();
        assert!(matches!(block, BooleanBlock::Vector(_)));
        assert_eq!(block.to_nullable_vec(), vec![Some(false), Some(true)]);
    }

    #[test]
    fn test_vector_builder() {
        let factory = BlockFactory::new();
        let mut builder = factory.new_boolean_vector_builder(2);
        builder.append_boolean(true).append_boolean(true);
        assert_eq!(builder.position_count(), 2);
        let block_ref = builder.build();
        let vector = block_ref.block().as_boolean().unwrap().as_vector().unwrap();
        assert_eq!(vector, BooleanVector::from_values(vec![true, true]));
        assert_eq!(factory.outstanding(), 1);
    }

    #[test]
    fn test_trailing_values_have_no_vector_view() {
        let block = BooleanBlock::Array(BooleanArrayBlock::new(
            vec![true, false, true],
            Positions::single_valued(2),
        ));
        assert_eq!(block.position_count(), 2);
        assert_eq!(block.as_vector(), None);
        assert_eq!(block.to_nullable_vec(), vec![Some(true), Some(false)]);

        let dense = BooleanBlock::Array(BooleanArrayBlock::new(
            vec![true, false],
            Positions::single_valued(2),
        ));
        assert_eq!(
            dense.as_vector(),
            Some(BooleanVector::from_values(vec![true, false]))
        );
    }

    #[test]
    fn test_constant_vector() {
        let vector = BooleanVector::constant(true, 3);
        assert_eq!(vector.position_count(), 3);
        assert!(vector.get_boolean(2));
        assert_eq!(
            vector.as_block().to_nullable_vec(),
            vec![Some(true), Some(true), Some(true)]
        );
    }
}
