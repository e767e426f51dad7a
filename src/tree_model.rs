//! Read-only category tree: one node per category, its records beneath.
//!
//! Built wholesale from a file or a table; it does not follow edits made
//! through [`RecordModel`](crate::record_model::RecordModel).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::formats;
use crate::item_model::{Alignment, ItemModel, ModelIndex, Orientation};
use crate::models::{Record, LABEL, PRICE};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub name: String,
    pub total: f64,
    pub members: Vec<Record>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTreeModel {
    records: Vec<Record>,
    categories: Vec<CategoryNode>,
}

impl CategoryTreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: impl AsRef<Path>, date_format: &str) -> Result<()> {
        let table = formats::read_records(path.as_ref(), date_format)?;
        self.set_records(table.records());
        debug!(path = %path.as_ref().display(), categories = self.categories.len(), "built category tree");
        Ok(())
    }

    pub fn from_table(table: &Table) -> Self {
        let mut model = Self::new();
        model.set_records(table.records());
        model
    }

    fn set_records(&mut self, records: Vec<Record>) {
        let mut by_name: BTreeMap<&str, CategoryNode> = BTreeMap::new();
        for rec in &records {
            let node = by_name
                .entry(rec.category.as_str())
                .or_insert_with(|| CategoryNode {
                    name: rec.category.clone(),
                    total: 0.0,
                    members: Vec::new(),
                });
            node.total += rec.price;
            node.members.push(rec.clone());
        }
        self.categories = by_name.into_values().collect();
        self.records = records;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn categories(&self) -> &[CategoryNode] {
        &self.categories
    }

    pub fn category_total(&self, name: &str) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.total)
    }

    fn member(&self, index: &ModelIndex) -> Option<&Record> {
        let parent = index.parent_row()?;
        self.categories.get(parent)?.members.get(index.row())
    }
}

impl ItemModel for CategoryTreeModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if !parent.is_valid() {
            return self.categories.len();
        }
        match parent.parent_row() {
            None => self
                .categories
                .get(parent.row())
                .map_or(0, |c| c.members.len()),
            Some(_) => 0,
        }
    }

    fn column_count(&self, _parent: &ModelIndex) -> usize {
        2
    }

    fn data(&self, index: &ModelIndex) -> Option<String> {
        if !index.is_valid() {
            return None;
        }
        if index.parent_row().is_some() {
            let rec = self.member(index)?;
            return match index.column() {
                0 => Some(rec.label.clone()),
                1 => Some(format!("{:.2}", rec.price)),
                _ => None,
            };
        }
        let category = self.categories.get(index.row())?;
        match index.column() {
            0 => Some(category.name.clone()),
            _ => None,
        }
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column >= 2 {
            return ModelIndex::invalid();
        }
        if !parent.is_valid() {
            return if row < self.categories.len() {
                ModelIndex::new(row, column)
            } else {
                ModelIndex::invalid()
            };
        }
        if parent.parent_row().is_some() || row >= self.row_count(parent) {
            return ModelIndex::invalid();
        }
        ModelIndex::child(parent.row(), row, column)
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        match index.parent_row() {
            Some(p) if index.is_valid() => ModelIndex::new(p, 0),
            _ => ModelIndex::invalid(),
        }
    }

    fn header_data(&self, section: usize, orientation: Orientation) -> Option<String> {
        match (orientation, section) {
            (Orientation::Horizontal, 0) => Some(LABEL.to_string()),
            (Orientation::Horizontal, 1) => Some(PRICE.to_string()),
            _ => None,
        }
    }

    fn alignment(&self, index: &ModelIndex) -> Alignment {
        if index.column() == 1 {
            Alignment::Right
        } else {
            Alignment::Left
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> CategoryTreeModel {
        CategoryTreeModel::from_table(&Table::from_records(&[
            Record::new(d(2024, 1, 1), "Food", "Bread", 2.50),
            Record::new(d(2024, 1, 2), "Transport", "Bus", 1.80),
            Record::new(d(2024, 1, 3), "Food", "Milk", 1.20),
        ]))
    }

    #[test]
    fn test_row_counts() {
        let tree = sample();
        let root = ModelIndex::invalid();
        assert_eq!(tree.row_count(&root), 2);
        let food = tree.index(0, 0, &root);
        let transport = tree.index(1, 0, &root);
        assert_eq!(tree.row_count(&food), 2);
        assert_eq!(tree.row_count(&transport), 1);
        let bread = tree.index(0, 0, &food);
        assert_eq!(tree.row_count(&bread), 0);
        assert!(!tree.index(2, 0, &root).is_valid());
        assert!(!tree.index(2, 0, &food).is_valid());
    }

    #[test]
    fn test_display_data() {
        let tree = sample();
        let root = ModelIndex::invalid();
        let food = tree.index(0, 0, &root);
        assert_eq!(tree.data(&food).as_deref(), Some("Food"));
        assert_eq!(tree.data(&tree.index(0, 1, &root)), None);

        let milk_label = tree.index(1, 0, &food);
        let milk_price = tree.index(1, 1, &food);
        assert_eq!(tree.data(&milk_label).as_deref(), Some("Milk"));
        assert_eq!(tree.data(&milk_price).as_deref(), Some("1.20"));
        assert_eq!(tree.alignment(&milk_price), Alignment::Right);
    }

    #[test]
    fn test_parent_navigation() {
        let tree = sample();
        let root = ModelIndex::invalid();
        let transport = tree.index(1, 0, &root);
        let bus = tree.index(0, 1, &transport);
        assert_eq!(tree.parent(&bus), transport);
        assert!(!tree.parent(&transport).is_valid());
    }

    #[test]
    fn test_category_totals_and_headers() {
        let tree = sample();
        assert!((tree.category_total("Food").unwrap() - 3.70).abs() < 1e-9);
        assert_eq!(tree.category_total("Loisirs"), None);
        assert_eq!(
            tree.header_data(0, Orientation::Horizontal).as_deref(),
            Some("Libellé")
        );
        assert_eq!(tree.header_data(1, Orientation::Horizontal).as_deref(), Some("Prix"));
        assert_eq!(tree.header_data(0, Orientation::Vertical), None);
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depenses.json");
        std::fs::write(
            &path,
            r#"[{"Date":"05/03/2024","Catégorie":"Santé","Libellé":"Pharmacie","Prix":12.5},
                {"Date":"06/03/2024","Catégorie":"Loisirs","Libellé":"Cinéma","Prix":9}]"#,
        )
        .unwrap();
        let mut tree = CategoryTreeModel::new();
        tree.load(&path, "%d/%m/%Y").unwrap();
        assert_eq!(tree.records().len(), 2);
        let names: Vec<&str> = tree.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Loisirs", "Santé"]);
    }
}
