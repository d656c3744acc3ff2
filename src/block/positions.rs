//! Position bookkeeping shared by all array-backed blocks.
//!
//! A block with `n` positions keeps `n + 1` first-value indexes: the values of
//! position `p` live at `first_value_indexes[p]..first_value_indexes[p + 1]`.
//! Null positions hold zero values and are flagged in the null mask.

use std::sync::Arc;

/// Offsets and null mask of an array block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positions {
    first_value_indexes: Arc<[usize]>,
    nulls: Option<Arc<[bool]>>,
}

impl Positions {
    /// Create positions from raw parts.
    ///
    /// `first_value_indexes` must be non-empty and non-decreasing; `nulls`,
    /// when present, must have one entry per position.
    pub fn new(first_value_indexes: Vec<usize>, nulls: Option<Vec<bool>>) -> Self {
        debug_assert!(!first_value_indexes.is_empty());
        debug_assert!(first_value_indexes.windows(2).all(|w| w[0] <= w[1]));
        debug_assert!(nulls
            .as_ref()
            .map_or(true, |n| n.len() + 1 == first_value_indexes.len()));

        // A mask without any null carries no information.
        let nulls = nulls.filter(|n| n.iter().any(|&is_null| is_null));
        Self {
            first_value_indexes: first_value_indexes.into(),
            nulls: nulls.map(Into::into),
        }
    }

    /// Positions where every position holds exactly one value.
    pub fn single_valued(position_count: usize) -> Self {
        Self::new((0..=position_count).collect(), None)
    }

    pub fn position_count(&self) -> usize {
        self.first_value_indexes.len() - 1
    }

    pub fn is_null(&self, position: usize) -> bool {
        self.nulls.as_ref().is_some_and(|n| n[position])
    }

    pub fn may_have_nulls(&self) -> bool {
        self.nulls.is_some()
    }

    pub fn value_count(&self, position: usize) -> usize {
        self.first_value_indexes[position + 1] - self.first_value_indexes[position]
    }

    pub fn first_value_index(&self, position: usize) -> usize {
        self.first_value_indexes[position]
    }

    pub fn total_value_count(&self) -> usize {
        self.first_value_indexes[self.position_count()] - self.first_value_indexes[0]
    }

    pub fn may_have_multivalued_fields(&self) -> bool {
        (0..self.position_count()).any(|p| self.value_count(p) > 1)
    }

    /// True when no position is null and every position holds exactly one
    /// value, i.e. value `p` belongs to position `p`.
    pub fn is_dense_single_valued(&self) -> bool {
        !self.may_have_nulls()
            && self.first_value_indexes[0] == 0
            && self
                .first_value_indexes
                .iter()
                .enumerate()
                .all(|(i, &first)| first == i)
    }

    pub(crate) fn byte_size(&self) -> usize {
        let nulls = self.nulls.as_ref().map_or(0, |n| n.len());
        self.first_value_indexes.len() * std::mem::size_of::<usize>() + nulls
    }
}

/// Incrementally collects positions for a block builder.
#[derive(Debug)]
pub(crate) struct PositionsBuilder {
    first_value_indexes: Vec<usize>,
    nulls: Vec<bool>,
    value_count: usize,
    entry_start: Option<usize>,
}

impl PositionsBuilder {
    pub(crate) fn with_capacity(position_count: usize) -> Self {
        let mut first_value_indexes = Vec::with_capacity(position_count + 1);
        first_value_indexes.push(0);
        Self {
            first_value_indexes,
            nulls: Vec::with_capacity(position_count),
            value_count: 0,
            entry_start: None,
        }
    }

    /// Record one appended value. Outside of a positions entry the value is
    /// a position of its own.
    pub(crate) fn value_appended(&mut self) {
        self.value_count += 1;
        if self.entry_start.is_none() {
            self.close_position(false);
        }
    }

    pub(crate) fn null_appended(&mut self) {
        debug_assert!(self.entry_start.is_none(), "null inside a positions entry");
        self.close_position(true);
    }

    pub(crate) fn begin_entry(&mut self) {
        debug_assert!(self.entry_start.is_none(), "positions entry already open");
        self.entry_start = Some(self.value_count);
    }

    /// Close the open entry. An entry without values becomes a null position.
    pub(crate) fn end_entry(&mut self) {
        let start = self.entry_start.take();
        debug_assert!(start.is_some(), "no positions entry open");
        let is_empty = start == Some(self.value_count);
        self.close_position(is_empty);
    }

    pub(crate) fn position_count(&self) -> usize {
        self.nulls.len()
    }

    pub(crate) fn build(self) -> Positions {
        debug_assert!(self.entry_start.is_none(), "positions entry left open");
        Positions::new(self.first_value_indexes, Some(self.nulls))
    }

    fn close_position(&mut self, is_null: bool) {
        self.first_value_indexes.push(self.value_count);
        self.nulls.push(is_null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_valued_is_dense() {
        let positions = Positions::single_valued(4);
        assert_eq!(positions.position_count(), 4);
        assert_eq!(positions.total_value_count(), 4);
        assert!(positions.is_dense_single_valued());
        assert!(!positions.may_have_nulls());
        assert!(!positions.may_have_multivalued_fields());
    }

    #[test]
    fn test_builder_tracks_nulls_and_entries() {
        let mut builder = PositionsBuilder::with_capacity(4);
        builder.value_appended();
        builder.null_appended();
        builder.begin_entry();
        builder.value_appended();
        builder.value_appended();
        builder.end_entry();
        builder.begin_entry();
        builder.end_entry();
        let positions = builder.build();

        assert_eq!(positions.position_count(), 4);
        assert!(!positions.is_null(0));
        assert!(positions.is_null(1));
        assert_eq!(positions.value_count(1), 0);
        assert_eq!(positions.value_count(2), 2);
        assert_eq!(positions.first_value_index(2), 1);
        // Empty entries are null
        assert!(positions.is_null(3));
        assert!(positions.may_have_multivalued_fields());
        assert!(!positions.is_dense_single_valued());
    }

    #[test]
    fn test_all_false_null_mask_is_dropped() {
        let positions = Positions::new(vec![0, 1, 2], Some(vec![false, false]));
        assert!(!positions.may_have_nulls());
        assert!(positions.is_dense_single_valued());
    }
}
