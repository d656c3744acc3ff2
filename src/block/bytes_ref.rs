//! Byte-string columns.
//!
//! Values are stored back to back in one shared [`Bytes`] buffer with an
//! offsets array, so vectors, blocks and vector views over blocks all share
//! the same storage.

use crate::block::positions::{Positions, PositionsBuilder};
use crate::block::{Block, BlockFactory, BlockRef};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

/// Flat storage of byte-string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesRefArray {
    data: Bytes,
    offsets: Arc<[usize]>,
}

impl BytesRefArray {
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let mut data = BytesMut::new();
        let mut offsets = vec![0];
        for value in values {
            data.extend_from_slice(value.as_ref());
            offsets.push(data.len());
        }
        Self {
            data: data.freeze(),
            offsets: offsets.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> &[u8] {
        &self.data[self.offsets[index]..self.offsets[index + 1]]
    }

    fn byte_size(&self) -> usize {
        self.data.len() + self.offsets.len() * std::mem::size_of::<usize>()
    }
}

/// A byte-string column with exactly one non-null value per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytesRefVector {
    Array(BytesRefArray),
    Constant { value: Bytes, position_count: usize },
}

impl BytesRefVector {
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        BytesRefVector::Array(BytesRefArray::from_values(values))
    }

    pub fn constant(value: impl Into<Bytes>, position_count: usize) -> Self {
        BytesRefVector::Constant {
            value: value.into(),
            position_count,
        }
    }

    pub fn position_count(&self) -> usize {
        match self {
            BytesRefVector::Array(values) => values.len(),
            BytesRefVector::Constant { position_count, .. } => *position_count,
        }
    }

    pub fn get_bytes_ref(&self, position: usize) -> &[u8] {
        match self {
            BytesRefVector::Array(values) => values.get(position),
            BytesRefVector::Constant { value, .. } => value,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, BytesRefVector::Constant { .. })
    }

    pub fn as_block(&self) -> BytesRefBlock {
        BytesRefBlock::Vector(self.clone())
    }

    pub(crate) fn byte_size(&self) -> usize {
        match self {
            BytesRefVector::Array(values) => values.byte_size(),
            BytesRefVector::Constant { value, .. } => value.len(),
        }
    }
}

/// A byte-string column that may hold nulls and multi-valued positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesRefArrayBlock {
    values: BytesRefArray,
    positions: Positions,
}

impl BytesRefArrayBlock {
    pub fn new(values: BytesRefArray, positions: Positions) -> Self {
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

/// A byte-string column in either representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytesRefBlock {
    Vector(BytesRefVector),
    Array(BytesRefArrayBlock),
}

impl BytesRefBlock {
    pub fn position_count(&self) -> usize {
        match self {
            BytesRefBlock::Vector(vector) => vector.position_count(),
            BytesRefBlock::Array(block) => block.positions.position_count(),
        }
    }

    pub fn is_null(&self, position: usize) -> bool {
        match self {
            BytesRefBlock::Vector(_) => false,
            BytesRefBlock::Array(block) => block.positions.is_null(position),
        }
    }

    pub fn get_value_count(&self, position: usize) -> usize {
        match self {
            BytesRefBlock::Vector(_) => 1,
            BytesRefBlock::Array(block) => block.positions.value_count(position),
        }
    }

    pub fn get_first_value_index(&self, position: usize) -> usize {
        match self {
            BytesRefBlock::Vector(_) => position,
            BytesRefBlock::Array(block) => block.positions.first_value_index(position),
        }
    }

    /// The value at `value_index`, as resolved through
    /// [`get_first_value_index`](Self::get_first_value_index).
    pub fn get_bytes_ref(&self, value_index: usize) -> &[u8] {
        match self {
            BytesRefBlock::Vector(vector) => vector.get_bytes_ref(value_index),
            BytesRefBlock::Array(block) => block.values.get(value_index),
        }
    }

    pub fn total_value_count(&self) -> usize {
        match self {
            BytesRefBlock::Vector(vector) => vector.position_count(),
            BytesRefBlock::Array(block) => block.positions.total_value_count(),
        }
    }

    pub fn may_have_nulls(&self) -> bool {
        match self {
            BytesRefBlock::Vector(_) => false,
            BytesRefBlock::Array(block) => block.positions.may_have_nulls(),
        }
    }

    pub fn may_have_multivalued_fields(&self) -> bool {
        match self {
            BytesRefBlock::Vector(_) => false,
            BytesRefBlock::Array(block) => block.positions.may_have_multivalued_fields(),
        }
    }

    /// A vector view of this block, if every position holds exactly one
    /// non-null value and no values trail the last position. The view
    /// shares storage with the block.
    pub fn as_vector(&self) -> Option<BytesRefVector> {
        match self {
            BytesRefBlock::Vector(vector) => Some(vector.clone()),
            BytesRefBlock::Array(block) if block.is_vector_shaped() => {
                Some(BytesRefVector::Array(block.values.clone()))
            }
            BytesRefBlock::Array(_) => None,
        }
    }

    /// All values of `position`, empty for a null position.
    pub fn values_at(&self, position: usize) -> impl Iterator<Item = &[u8]> + '_ {
        let first = self.get_first_value_index(position);
        (first..first + self.get_value_count(position)).map(move |i| self.get_bytes_ref(i))
    }

    pub(crate) fn byte_size(&self) -> usize {
        match self {
            BytesRefBlock::Vector(vector) => vector.byte_size(),
            BytesRefBlock::Array(block) => block.values.byte_size() + block.positions.byte_size(),
        }
    }
}

/// Builder for [`BytesRefBlock`]s.
///
/// A block without nulls or multi-valued positions is built as a vector.
#[derive(Debug)]
pub struct BytesRefBlockBuilder {
    factory: BlockFactory,
    data: BytesMut,
    offsets: Vec<usize>,
    positions: PositionsBuilder,
}

impl BytesRefBlockBuilder {
    pub(crate) fn new(estimated_positions: usize, factory: BlockFactory) -> Self {
        let mut offsets = Vec::with_capacity(estimated_positions + 1);
        offsets.push(0);
        Self {
            factory,
            data: BytesMut::new(),
            offsets,
            positions: PositionsBuilder::with_capacity(estimated_positions),
        }
    }

    pub fn append_bytes_ref(&mut self, value: &[u8]) -> &mut Self {
        self.data.extend_from_slice(value);
        self.offsets.push(self.data.len());
        self.positions.value_appended();
        self
    }

    pub fn append_null(&mut self) -> &mut Self {
        self.positions.null_appended();
        self
    }

    /// Start a multi-valued position. Values appended until
    /// [`end_positions_entry`](Self::end_positions_entry) belong to it.
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

    /// Build the block and register it with the factory.
    pub fn build(self) -> BlockRef {
        let values = BytesRefArray {
            data: self.data.freeze(),
            offsets: self.offsets.into(),
        };
        let positions = self.positions.build();
        let block = if positions.is_dense_single_valued() {
            BytesRefBlock::Vector(BytesRefVector::Array(values))
        } else {
            BytesRefBlock::Array(BytesRefArrayBlock::new(values, positions))
        };
        self.factory.track(Block::BytesRef(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_block(
        values: &[&str],
        first_value_indexes: Vec<usize>,
        nulls: Vec<bool>,
    ) -> BytesRefBlock {
        BytesRefBlock::Array(BytesRefArrayBlock::new(
            BytesRefArray::from_values(values),
            Positions::new(first_value_indexes, Some(nulls)),
        ))
    }

    #[test]
    fn test_vector_access() {
        let vector = BytesRefVector::from_values(["a", "bc", ""]);
        assert_eq!(vector.position_count(), 3);
        assert_eq!(vector.get_bytes_ref(1), b"bc");
        assert_eq!(vector.get_bytes_ref(2), b"");

        let constant = BytesRefVector::constant(&b"x"[..], 5);
        assert_eq!(constant.position_count(), 5);
        assert_eq!(constant.get_bytes_ref(4), b"x");
        assert!(constant.is_constant());
    }

    #[test]
    fn test_block_with_nulls_and_multivalues() {
        // [a], null, [b, c]
        let block = array_block(&["a", "b", "c"], vec![0, 1, 1, 3], vec![false, true, false]);
        assert_eq!(block.position_count(), 3);
        assert!(block.is_null(1));
        assert_eq!(block.get_value_count(1), 0);
        assert_eq!(block.get_value_count(2), 2);
        let values: Vec<&[u8]> = block.values_at(2).collect();
        assert_eq!(values, vec![&b"b"[..], &b"c"[..]]);
        assert!(block.may_have_nulls());
        assert!(block.may_have_multivalued_fields());
        assert_eq!(block.as_vector(), None);
    }

    #[test]
    fn test_dense_array_block_exposes_vector_view() {
        let block = array_block(&["a", "b"], vec![0, 1, 2], vec![false, false]);
        let vector = block.as_vector().unwrap();
        assert_eq!(vector.get_bytes_ref(0), b"a");
        assert_eq!(vector.get_bytes_ref(1), b"b");

        // The view shares the block's buffer
        let (BytesRefBlock::Array(array), BytesRefVector::Array(view)) = (&block, &vector) else {
            panic!("unexpected representations");
        };
        assert_eq!(array.values.data.as_ptr(), view.data.as_ptr());
    }

    #[test]
    fn test_trailing_values_have_no_vector_view() {
        // Two positions over three values
        let block = array_block(&["a", "b", "c"], vec![0, 1, 2], vec![false, false]);
        assert_eq!(block.position_count(), 2);
        assert_eq!(block.as_vector(), None);
        let values: Vec<&[u8]> = (0..2).flat_map(|p| block.values_at(p)).collect();
        assert_eq!(values, vec![&b"a"[..], &b"b"[..]]);
    }

    #[test]
    fn test_builder_builds_vector_when_dense() {
        let factory = BlockFactory::new();
        let mut builder = factory.new_bytes_ref_block_builder(2);
        builder.append_bytes_ref(b"1").append_bytes_ref(b"2");
        let block_ref = builder.build();
        let block = block_ref.block().as_bytes_ref().unwrap();
        assert!(matches!(block, BytesRefBlock::Vector(_)));
        assert_eq!(factory.outstanding(), 1);
    }

    #[test]
    fn test_builder_builds_array_block() {
        let factory = BlockFactory::new();
        let mut builder = factory.new_bytes_ref_block_builder(3);
        builder
            .append_bytes_ref(b"1")
            .append_null()
            .begin_positions_entry()
            .append_bytes_ref(b"2")
            .append_bytes_ref(b"3")
            .end_positions_entry();
        assert_eq!(builder.position_count(), 3);
        let block_ref = builder.build();
        let block = block_ref.block().as_bytes_ref().unwrap();

        assert!(matches!(block, BytesRefBlock::Array(_)));
        assert!(block.is_null(1));
        assert_eq!(block.get_value_count(2), 2);
        assert_eq!(block.get_bytes_ref(block.get_first_value_index(2)), b"2");
        assert_eq!(block.total_value_count(), 3);
    }
}
