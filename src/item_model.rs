//! The view-facing interface shared by the table and tree models.

/// Position of an item inside a model.
///
/// Models here are at most two levels deep, so an index records the row of
/// its parent (if any) rather than a full ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    parent_row: Option<usize>,
    valid: bool,
}

impl ModelIndex {
    /// A top-level index.
    pub fn new(row: usize, column: usize) -> Self {
        Self {
            row,
            column,
            parent_row: None,
            valid: true,
        }
    }

    /// An index under the top-level item at `parent_row`.
    pub fn child(parent_row: usize, row: usize, column: usize) -> Self {
        Self {
            row,
            column,
            parent_row: Some(parent_row),
            valid: true,
        }
    }

    /// The root; also returned for out-of-range lookups.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn parent_row(&self) -> Option<usize> {
        self.parent_row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

pub trait ItemModel {
    /// Number of rows under `parent`; the invalid index is the root.
    fn row_count(&self, parent: &ModelIndex) -> usize;

    fn column_count(&self, parent: &ModelIndex) -> usize;

    /// Display text for the item, `None` when there is nothing to show.
    fn data(&self, index: &ModelIndex) -> Option<String>;

    /// Builds an index, or the invalid index when out of bounds.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    fn header_data(&self, section: usize, orientation: Orientation) -> Option<String>;

    fn alignment(&self, _index: &ModelIndex) -> Alignment {
        Alignment::Left
    }

    fn has_children(&self, parent: &ModelIndex) -> bool {
        self.row_count(parent) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index() {
        let root = ModelIndex::invalid();
        assert!(!root.is_valid());
        assert_eq!(root.parent_row(), None);
    }

    #[test]
    fn test_child_index_records_parent() {
        let idx = ModelIndex::child(2, 5, 1);
        assert!(idx.is_valid());
        assert_eq!((idx.parent_row(), idx.row(), idx.column()), (Some(2), 5, 1));
        assert_ne!(idx, ModelIndex::new(5, 1));
    }
}
