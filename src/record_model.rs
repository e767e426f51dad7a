//! The tabular expense model: authoritative data, the view derived from
//! it, and the notifications a bound view needs to stay in step.
//!
//! Three tables are kept:
//!
//! - `original`: the records as loaded, plus row edits
//! - `working`: what is displayed; row-level, sorted, filtered or aggregated
//! - `pre_filter_snapshot`: `working` as of the last grouping-mode change,
//!   the base every filter expression runs against
//!
//! Row edits are only accepted while the view is row-level. They are
//! applied to all three tables, matched by hidden row id, so `save`
//! exports them and a filter rollback lands on the edited data.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DepensesError, Result};
use crate::fmt::DisplayConfig;
use crate::formats;
use crate::item_model::{Alignment, ItemModel, ModelIndex, Orientation};
use crate::models::{Record, Value, CATEGORY, DATE, LABEL, MONTH, PRICE, RECORD_COLUMNS, YEAR};
use crate::query;
use crate::signals::ModelSignals;
use crate::table::{Aggregator, ColumnRef, Table};
use crate::validate;

#[derive(Default)]
pub struct RecordModel {
    original: Option<Table>,
    working: Table,
    pre_filter_snapshot: Table,
    is_grouped: bool,
    signals: ModelSignals,
    display: DisplayConfig,
}

impl RecordModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display(display: DisplayConfig) -> Self {
        Self {
            display,
            ..Self::default()
        }
    }

    pub fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    pub fn display_config(&self) -> &DisplayConfig {
        &self.display
    }

    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    pub fn is_grouped(&self) -> bool {
        self.is_grouped
    }

    /// The table currently exposed for display.
    pub fn get_data(&self) -> &Table {
        &self.working
    }

    pub fn original(&self) -> Option<&Table> {
        self.original.as_ref()
    }

    pub fn pre_filter_snapshot(&self) -> &Table {
        &self.pre_filter_snapshot
    }

    fn report(&self, err: DepensesError) -> DepensesError {
        warn!(error = %err, "model operation failed");
        self.signals.error_occurred.emit(err.to_string());
        err
    }

    fn source(&self) -> Result<&Table> {
        self.original
            .as_ref()
            .ok_or_else(|| DepensesError::Validation("no data loaded".into()))
    }

    // -----------------------------------------------------------------------
    // Load / save
    // -----------------------------------------------------------------------

    /// Loads a CSV, JSON or XLSX expense file, replacing every table.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let table = formats::read_records(path, &self.display.date_format)
            .map_err(|e| self.report(e))?;
        debug!(path = %path.display(), rows = table.len(), "loaded records");
        self.load_table(table);
        Ok(())
    }

    /// Installs an already-parsed row-level table as the model's data.
    pub fn load_table(&mut self, table: Table) {
        self.signals.emit_layout_changed(|| {
            self.working = table.clone();
            self.pre_filter_snapshot = table.clone();
            self.original = Some(table);
            self.is_grouped = false;
        });
    }

    /// Writes `original` (never the aggregated view) in the format given by
    /// the extension of `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let original = self.source().map_err(|e| self.report(e))?;
        formats::write_table(path, original, &self.display.date_format)
            .map_err(|e| self.report(e))?;
        debug!(path = %path.display(), rows = original.len(), "saved records");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Row edits
    // -----------------------------------------------------------------------

    fn ensure_row_level(&self) -> Result<()> {
        if self.is_grouped {
            return Err(DepensesError::Validation(
                "rows cannot be edited in a grouped view".into(),
            ));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.working.len() {
            return Err(DepensesError::Validation(format!(
                "row {index} is out of range (0..{})",
                self.working.len()
            )));
        }
        Ok(())
    }

    /// Appends a record and returns its position in the working table.
    pub fn add_row(&mut self, record: Record) -> Result<usize> {
        self.ensure_row_level()?;
        validate::check_record(&record)?;

        if self.original.is_none() {
            self.load_table(Table::new(RECORD_COLUMNS));
        }
        let id = self
            .original
            .as_ref()
            .map(Table::next_id)
            .unwrap_or_default()
            .max(self.working.next_id())
            .max(self.pre_filter_snapshot.next_id());
        let values = record.to_values();
        let position = self.working.len();

        self.signals.emit_rows_inserted(position, position, || {
            self.working.push_with_id(id, values.clone());
            self.pre_filter_snapshot.push_with_id(id, values.clone());
            if let Some(original) = self.original.as_mut() {
                original.push_with_id(id, values);
            }
        });
        debug!(position, label = %record.label, "added row");
        Ok(position)
    }

    /// Overwrites the given columns of one row.
    ///
    /// Every field is checked before anything changes: the column must
    /// exist, `Date` takes a date (or text in the configured pattern),
    /// `Prix` a number (or numeric text) and `Libellé` a valid label.
    pub fn update_row<C, I>(&mut self, index: usize, fields: I) -> Result<()>
    where
        C: Into<ColumnRef>,
        I: IntoIterator<Item = (C, Value)>,
    {
        self.ensure_row_level()?;
        self.check_index(index)?;

        let mut updates = Vec::new();
        for (column, value) in fields {
            let column = self.working.resolve(&column.into())?;
            let value = self.coerce_field(column, value)?;
            updates.push((column, value));
        }

        let Some(id) = self.working.row_id(index) else {
            return Err(DepensesError::Validation(format!("row {index} is out of range")));
        };
        for (column, value) in &updates {
            self.working.set_cell(index, *column, value.clone());
            if let Some(pos) = self.pre_filter_snapshot.position_of(id) {
                self.pre_filter_snapshot.set_cell(pos, *column, value.clone());
            }
            if let Some(original) = self.original.as_mut() {
                if let Some(pos) = original.position_of(id) {
                    original.set_cell(pos, *column, value.clone());
                }
            }
        }

        let last = self.working.column_count().saturating_sub(1);
        self.signals
            .data_changed
            .emit((ModelIndex::new(index, 0), ModelIndex::new(index, last)));
        debug!(index, fields = updates.len(), "updated row");
        Ok(())
    }

    fn coerce_field(&self, column: usize, value: Value) -> Result<Value> {
        let name = self.working.columns()[column].as_str();
        match (name, value) {
            (DATE, Value::Date(d)) => Ok(Value::Date(d)),
            (DATE, Value::Text(s)) => {
                validate::parse_date_input(&s, &self.display.date_format).map(Value::Date)
            }
            (PRICE, Value::Number(n)) => {
                validate::check_price(n)?;
                Ok(Value::Number(n))
            }
            (PRICE, Value::Text(s)) => validate::parse_price_input(&s).map(Value::Number),
            (LABEL, Value::Text(s)) => {
                validate::check_label(&s)?;
                Ok(Value::Text(s.trim().to_string()))
            }
            (CATEGORY, Value::Text(s)) => Ok(Value::Text(s.trim().to_string())),
            (name, other) => Err(DepensesError::Validation(format!(
                "column '{name}' cannot hold a {} value",
                other.kind()
            ))),
        }
    }

    /// Removes one row; later rows shift down by one.
    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        self.ensure_row_level()?;
        self.check_index(index)?;
        let Some(id) = self.working.row_id(index) else {
            return Err(DepensesError::Validation(format!("row {index} is out of range")));
        };

        self.signals.emit_rows_removed(index, index, || {
            self.working.remove(index);
            if let Some(pos) = self.pre_filter_snapshot.position_of(id) {
                self.pre_filter_snapshot.remove(pos);
            }
            if let Some(original) = self.original.as_mut() {
                if let Some(pos) = original.position_of(id) {
                    original.remove(pos);
                }
            }
        });
        debug!(index, "deleted row");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Stable sort of the working table by position or by name.
    pub fn sort(&mut self, column: impl Into<ColumnRef>, ascending: bool) -> Result<()> {
        let column = self.working.resolve(&column.into())?;
        self.signals
            .emit_layout_changed(|| self.working.sort_by_column(column, ascending));
        debug!(column, ascending, "sorted");
        Ok(())
    }

    fn set_grouped_view(&mut self, table: Table) {
        self.signals.emit_layout_changed(|| {
            self.pre_filter_snapshot = table.clone();
            self.working = table;
            self.is_grouped = true;
        });
    }

    fn with_year(table: &Table) -> Result<Table> {
        let date = table.resolve(&DATE.into())?;
        Ok(table.with_derived(YEAR, date, |v| match v.as_date() {
            Some(d) => Value::Text(d.format("%Y").to_string()),
            None => Value::Empty,
        }))
    }

    fn with_month(table: &Table) -> Result<Table> {
        let date = table.resolve(&DATE.into())?;
        Ok(table.with_derived(MONTH, date, |v| match v.as_date() {
            Some(d) => Value::month_of(d),
            None => Value::Empty,
        }))
    }

    /// Sums `Prix` per distinct value of `column` in `original`.
    pub fn group_by(&mut self, column: impl Into<ColumnRef>) -> Result<()> {
        let column = column.into();
        let grouped = self
            .source()
            .and_then(|t| {
                let key = t.resolve(&column)?;
                t.group_sum(key, t.resolve(&PRICE.into())?)
            })
            .map_err(|e| self.report(e))?;
        debug!(%column, groups = grouped.len(), "grouped");
        self.set_grouped_view(grouped);
        Ok(())
    }

    fn group_by_derived(&mut self, derive: fn(&Table) -> Result<Table>) -> Result<()> {
        let grouped = self
            .source()
            .and_then(derive)
            .and_then(|t| {
                let key = t.column_count() - 1;
                t.group_sum(key, t.resolve(&PRICE.into())?)
            })
            .map_err(|e| self.report(e))?;
        self.set_grouped_view(grouped);
        Ok(())
    }

    /// Monthly totals keyed by `Mois`.
    pub fn per_month(&mut self) -> Result<()> {
        self.group_by_derived(Self::with_month)?;
        debug!(months = self.working.len(), "grouped per month");
        Ok(())
    }

    /// Yearly totals keyed by `Année`, rendered as plain text.
    pub fn per_year(&mut self) -> Result<()> {
        self.group_by_derived(Self::with_year)?;
        debug!(years = self.working.len(), "grouped per year");
        Ok(())
    }

    /// Cross-tabulates `aggregator(value)` by `row_key` and `column_key`,
    /// with a trailing `Total annuel` column. `Année` and `Mois` are
    /// available as keys. On failure `working` is left unchanged.
    pub fn pivot(
        &mut self,
        value: impl Into<ColumnRef>,
        row_key: impl Into<ColumnRef>,
        column_key: impl Into<ColumnRef>,
        aggregator: Aggregator,
    ) -> Result<()> {
        let (value, row_key, column_key) = (value.into(), row_key.into(), column_key.into());
        let pivoted = self
            .source()
            .and_then(Self::with_year)
            .and_then(|t| Self::with_month(&t))
            .and_then(|t| {
                t.pivot(
                    t.resolve(&value)?,
                    t.resolve(&row_key)?,
                    t.resolve(&column_key)?,
                    aggregator,
                )
            })
            .map_err(|e| self.report(e))?;
        debug!(%value, %row_key, %column_key, aggregator = aggregator.key(), "pivoted");
        self.set_grouped_view(pivoted);
        Ok(())
    }

    /// Every row of `original` with its category's max, min and mean price.
    pub fn resume(&mut self) -> Result<()> {
        let summary = self
            .source()
            .and_then(|t| t.broadcast_stats(t.resolve(&CATEGORY.into())?, t.resolve(&PRICE.into())?))
            .map_err(|e| self.report(e))?;
        debug!(rows = summary.len(), "summarized per category");
        self.set_grouped_view(summary);
        Ok(())
    }

    /// Replaces `working` with the rows of the snapshot matching
    /// `expression`. A blank expression shows the whole snapshot.
    ///
    /// A failing expression returns the view to the row-level original
    /// data and reports the error.
    pub fn filter(&mut self, expression: &str) -> Result<()> {
        let expression = expression.trim();
        if expression.is_empty() {
            self.signals
                .emit_layout_changed(|| self.working = self.pre_filter_snapshot.clone());
            return Ok(());
        }

        match query::filter_table(&self.pre_filter_snapshot, expression) {
            Ok(filtered) => {
                debug!(expression, rows = filtered.len(), "filtered");
                self.signals.emit_layout_changed(|| self.working = filtered);
                Ok(())
            }
            Err(err) => {
                let err = match err {
                    DepensesError::Filter(_) => err,
                    other => DepensesError::Filter(other.to_string()),
                };
                self.signals.emit_layout_changed(|| {
                    let original = self.original.clone().unwrap_or_default();
                    if self.is_grouped {
                        self.pre_filter_snapshot = original.clone();
                        self.is_grouped = false;
                    }
                    self.working = original;
                });
                Err(self.report(err))
            }
        }
    }

    /// Shows `original` again and leaves any grouped mode. No-op before load.
    pub fn to_original(&mut self) {
        let Some(original) = self.original.clone() else {
            return;
        };
        self.signals.emit_layout_changed(|| {
            self.pre_filter_snapshot = original.clone();
            self.working = original;
            self.is_grouped = false;
        });
    }

    // -----------------------------------------------------------------------
    // Display helpers
    // -----------------------------------------------------------------------

    /// Total price and row count of the working table; `None` when grouped.
    pub fn totals(&self) -> Option<(f64, usize)> {
        if self.is_grouped {
            return None;
        }
        let price = self.working.column_position(PRICE)?;
        Some((self.working.column_sum(price), self.working.len()))
    }

    pub fn display(&self, row: usize, column: usize) -> Option<String> {
        self.working
            .cell(row, column)
            .map(|v| self.display.format_value(v))
    }

    /// The price column is right-aligned, everything else left.
    pub fn column_alignment(&self, column: usize) -> Alignment {
        if self.working.column_position(PRICE) == Some(column) {
            Alignment::Right
        } else {
            Alignment::Left
        }
    }
}

impl ItemModel for RecordModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() {
            0
        } else {
            self.working.len()
        }
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() {
            0
        } else {
            self.working.column_count()
        }
    }

    fn data(&self, index: &ModelIndex) -> Option<String> {
        if !index.is_valid() {
            return None;
        }
        self.display(index.row(), index.column())
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if parent.is_valid() || row >= self.working.len() || column >= self.working.column_count() {
            return ModelIndex::invalid();
        }
        ModelIndex::new(row, column)
    }

    fn parent(&self, _index: &ModelIndex) -> ModelIndex {
        ModelIndex::invalid()
    }

    fn header_data(&self, section: usize, orientation: Orientation) -> Option<String> {
        match orientation {
            Orientation::Horizontal => self.working.columns().get(section).cloned(),
            Orientation::Vertical if section < self.working.len() => Some(section.to_string()),
            Orientation::Vertical => None,
        }
    }

    fn alignment(&self, index: &ModelIndex) -> Alignment {
        self.column_alignment(index.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn three_rows() -> Table {
        Table::from_records(&[
            Record::new(d(2024, 1, 1), "Food", "Bread", 2.50),
            Record::new(d(2024, 1, 2), "Transport", "Bus", 1.80),
            Record::new(d(2024, 1, 3), "Food", "Milk", 1.20),
        ])
    }

    fn loaded() -> RecordModel {
        let mut model = RecordModel::new();
        model.load_table(three_rows());
        model
    }

    fn labels(model: &RecordModel) -> Vec<String> {
        model
            .get_data()
            .rows()
            .map(|r| r[2].to_string())
            .collect()
    }

    fn record_events(model: &RecordModel) -> Arc<Mutex<Vec<String>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let s = model.signals();
        let e = events.clone();
        s.layout_about_to_change.connect(move |_| e.lock().push("layout?".into()));
        let e = events.clone();
        s.layout_changed.connect(move |_| e.lock().push("layout".into()));
        let e = events.clone();
        s.rows_about_to_be_inserted
            .connect(move |(a, b)| e.lock().push(format!("insert? {a}-{b}")));
        let e = events.clone();
        s.rows_inserted.connect(move |(a, b)| e.lock().push(format!("insert {a}-{b}")));
        let e = events.clone();
        s.rows_about_to_be_removed
            .connect(move |(a, b)| e.lock().push(format!("remove? {a}-{b}")));
        let e = events.clone();
        s.rows_removed.connect(move |(a, b)| e.lock().push(format!("remove {a}-{b}")));
        let e = events.clone();
        s.data_changed.connect(move |(tl, br)| {
            e.lock().push(format!(
                "changed {},{}..{},{}",
                tl.row(),
                tl.column(),
                br.row(),
                br.column()
            ))
        });
        let e = events.clone();
        s.error_occurred.connect(move |msg| e.lock().push(format!("error {msg}")));
        events
    }

    #[test]
    fn test_group_by_category_sums_prices() {
        let mut model = loaded();
        model.group_by("category").unwrap();
        let data = model.get_data();
        assert!(model.is_grouped());
        assert_eq!(data.columns(), &[CATEGORY.to_string(), PRICE.to_string()]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.cell(0, 0), Some(&Value::from("Food")));
        assert!((data.cell(0, 1).unwrap().as_f64().unwrap() - 3.70).abs() < 1e-9);
        assert_eq!(data.cell(1, 0), Some(&Value::from("Transport")));
        assert!((data.cell(1, 1).unwrap().as_f64().unwrap() - 1.80).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_starts_from_original() {
        let mut model = loaded();
        model.filter("Prix > 2").unwrap();
        model.group_by(CATEGORY).unwrap();
        assert_eq!(model.get_data().len(), 2);
        assert_eq!(model.pre_filter_snapshot(), model.get_data());
    }

    #[test]
    fn test_filter_price() {
        let mut model = loaded();
        model.filter("price > 2").unwrap();
        assert_eq!(labels(&model), vec!["Bread"]);
    }

    #[test]
    fn test_filters_do_not_compound() {
        let mut model = loaded();
        model.filter("Prix > 2").unwrap();
        model.filter("Prix < 2").unwrap();
        assert_eq!(labels(&model), vec!["Bus", "Milk"]);
    }

    #[test]
    fn test_empty_filter_restores_snapshot() {
        let mut model = loaded();
        model.group_by(CATEGORY).unwrap();
        model.filter("Prix > 2").unwrap();
        assert_eq!(model.get_data().len(), 1);
        model.filter("   ").unwrap();
        assert_eq!(model.get_data(), model.pre_filter_snapshot());
        assert_eq!(model.get_data().len(), 2);
    }

    #[test]
    fn test_malformed_filter_restores_original_and_reports() {
        let mut model = loaded();
        model.group_by(CATEGORY).unwrap();
        let events = record_events(&model);

        let err = model.filter("Prix >").unwrap_err();
        assert!(matches!(err, DepensesError::Filter(_)));
        assert_eq!(Some(model.get_data()), model.original());
        assert!(!model.is_grouped());

        let events = events.lock();
        assert_eq!(events[0], "layout?");
        assert_eq!(events[1], "layout");
        assert!(events[2].starts_with("error Erreur lors du filtrage : "));
    }

    #[test]
    fn test_filter_on_unknown_column_fails() {
        let mut model = loaded();
        assert!(model.filter("Montant > 2").is_err());
        assert_eq!(model.get_data().len(), 3);
    }

    #[test]
    fn test_add_then_delete() {
        let mut model = loaded();
        let events = record_events(&model);

        let pos = model
            .add_row(Record::new(d(2024, 1, 4), "Food", "Eggs", 3.00))
            .unwrap();
        assert_eq!(pos, 3);
        model.delete_row(0).unwrap();

        assert_eq!(labels(&model), vec!["Bus", "Milk", "Eggs"]);
        assert_eq!(
            *events.lock(),
            vec!["insert? 3-3", "insert 3-3", "remove? 0-0", "remove 0-0"]
        );
        let original = model.original().unwrap();
        assert_eq!(original, model.get_data());
    }

    #[test]
    fn test_add_row_validates_label() {
        let mut model = loaded();
        assert!(model.add_row(Record::new(d(2024, 1, 4), "Food", "", 3.0)).is_err());
        assert!(model.add_row(Record::new(d(2024, 1, 4), "Food", "3.5", 3.0)).is_err());
        assert_eq!(model.get_data().len(), 3);
    }

    #[test]
    fn test_add_row_on_empty_model() {
        let mut model = RecordModel::new();
        model
            .add_row(Record::new(d(2024, 1, 4), "Food", "Eggs", 3.0))
            .unwrap();
        assert_eq!(model.get_data().columns().len(), 4);
        assert_eq!(model.original().map(Table::len), Some(1));
    }

    #[test]
    fn test_row_edits_rejected_when_grouped() {
        let mut model = loaded();
        model.per_year().unwrap();
        let rec = Record::new(d(2024, 1, 4), "Food", "Eggs", 3.0);
        assert!(matches!(model.add_row(rec), Err(DepensesError::Validation(_))));
        assert!(model.delete_row(0).is_err());
        assert!(model.update_row(0, [(PRICE, Value::from(1.0))]).is_err());
    }

    #[test]
    fn test_delete_keeps_order_and_count() {
        let mut model = loaded();
        model.delete_row(1).unwrap();
        assert_eq!(labels(&model), vec!["Bread", "Milk"]);
        assert_eq!(model.header_data(1, Orientation::Vertical), Some("1".into()));
        assert_eq!(model.header_data(2, Orientation::Vertical), None);
    }

    #[test]
    fn test_delete_out_of_range_is_validation_failure() {
        let mut model = loaded();
        assert!(matches!(model.delete_row(3), Err(DepensesError::Validation(_))));
        assert_eq!(model.get_data().len(), 3);
    }

    #[test]
    fn test_update_changes_only_targets() {
        let mut model = loaded();
        let before = model.get_data().clone();
        let events = record_events(&model);

        model
            .update_row(1, [("price", Value::from("2.10")), (LABEL, Value::from("Tram"))])
            .unwrap();

        let after = model.get_data();
        assert_eq!(after.len(), before.len());
        assert_eq!(after.row(0), before.row(0));
        assert_eq!(after.row(2), before.row(2));
        let row = after.row(1).unwrap();
        assert_eq!(row[0], before.row(1).unwrap()[0]);
        assert_eq!(row[1], Value::from("Transport"));
        assert_eq!(row[2], Value::from("Tram"));
        assert_eq!(row[3], Value::from(2.10));
        assert_eq!(*events.lock(), vec!["changed 1,0..1,3"]);
        assert_eq!(model.original().unwrap().row(1), Some(row));
    }

    #[test]
    fn test_update_rejects_bad_input_without_changes() {
        let mut model = loaded();
        let before = model.get_data().clone();
        assert!(model.update_row(5, [(PRICE, Value::from(1.0))]).is_err());
        assert!(model
            .update_row(0, [(PRICE, Value::from(1.0)), (LABEL, Value::from(""))])
            .is_err());
        assert!(model.update_row(0, [(PRICE, Value::from("abc"))]).is_err());
        assert!(model.update_row(0, [(DATE, Value::from("2024-01-09"))]).is_err());
        assert!(matches!(
            model.update_row(0, [("Montant", Value::from(1.0))]),
            Err(DepensesError::UnknownColumn(_))
        ));
        assert_eq!(model.get_data(), &before);
    }

    #[test]
    fn test_update_on_filtered_view_reaches_original() {
        let mut model = loaded();
        model.filter("Catégorie == 'Food'").unwrap();
        model.update_row(1, [(PRICE, Value::from(9.0))]).unwrap();
        let original = model.original().unwrap();
        assert_eq!(original.cell(2, 3), Some(&Value::from(9.0)));
        assert_eq!(original.cell(1, 3), Some(&Value::from(1.80)));
    }

    #[test]
    fn test_per_year_two_rows() {
        let mut model = RecordModel::new();
        model.load_table(Table::from_records(&[
            Record::new(d(2023, 3, 1), "Food", "Bread", 2.0),
            Record::new(d(2024, 1, 2), "Food", "Milk", 1.5),
            Record::new(d(2023, 11, 9), "Transport", "Bus", 3.0),
        ]));
        model.per_year().unwrap();
        let data = model.get_data();
        assert_eq!(data.columns(), &[YEAR.to_string(), PRICE.to_string()]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.cell(0, 0), Some(&Value::from("2023")));
        assert_eq!(data.cell(0, 1), Some(&Value::from(5.0)));
        assert_eq!(data.cell(1, 0), Some(&Value::from("2024")));
        assert_eq!(data.cell(1, 1), Some(&Value::from(1.5)));
    }

    #[test]
    fn test_per_month_displays_french_month() {
        let mut model = loaded();
        model.per_month().unwrap();
        assert_eq!(model.get_data().len(), 1);
        assert_eq!(model.display(0, 0).as_deref(), Some("Janvier 2024"));
        assert_eq!(model.display(0, 1).as_deref(), Some("5.50"));
        assert_eq!(model.column_alignment(1), Alignment::Right);
        assert_eq!(model.totals(), None);
    }

    #[test]
    fn test_filter_month_view() {
        let mut model = RecordModel::new();
        model.load_table(Table::from_records(&[
            Record::new(d(2024, 1, 5), "Food", "Bread", 2.0),
            Record::new(d(2024, 2, 7), "Food", "Milk", 1.5),
            Record::new(d(2024, 3, 9), "Transport", "Bus", 3.0),
        ]));
        model.per_month().unwrap();
        model.filter("Mois >= '02/2024'").unwrap();
        assert!(model.is_grouped());
        assert_eq!(model.get_data().len(), 2);
        assert_eq!(model.display(0, 0).as_deref(), Some("Février 2024"));
    }

    #[test]
    fn test_pivot_year_by_category() {
        let mut model = RecordModel::new();
        model.load_table(Table::from_records(&[
            Record::new(d(2023, 3, 1), "Food", "Bread", 2.0),
            Record::new(d(2024, 1, 2), "Food", "Milk", 1.5),
            Record::new(d(2023, 11, 9), "Transport", "Bus", 3.0),
        ]));
        model.pivot(PRICE, YEAR, CATEGORY, Aggregator::Sum).unwrap();
        let data = model.get_data();
        assert_eq!(data.columns(), &["Année", "Food", "Transport", "Total annuel"]);
        assert_eq!(data.row(0).unwrap()[3], Value::from(5.0));
        assert!(data.row(1).unwrap()[2].is_empty());
        assert_eq!(data.row(1).unwrap()[3], Value::from(1.5));
    }

    #[test]
    fn test_failed_pivot_leaves_working_unchanged() {
        let mut model = loaded();
        model.sort(PRICE, true).unwrap();
        let before = model.get_data().clone();
        let events = record_events(&model);

        assert!(model.pivot(LABEL, YEAR, CATEGORY, Aggregator::Sum).is_err());
        assert_eq!(model.get_data(), &before);
        assert!(!model.is_grouped());
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error "));
    }

    #[test]
    fn test_resume_broadcasts_category_stats() {
        let mut model = loaded();
        model.resume().unwrap();
        let data = model.get_data();
        assert!(model.is_grouped());
        assert_eq!(data.len(), 3);
        assert_eq!(data.column_count(), 7);
        let bread = data.row(0).unwrap();
        assert_eq!(bread[4], Value::from(2.5));
        assert_eq!(bread[5], Value::from(1.2));
        let bus = data.row(1).unwrap();
        assert_eq!(bus[4], Value::from(1.8));
        assert_eq!(bus[6], Value::from(1.8));
    }

    #[test]
    fn test_sort_by_name_and_position() {
        let mut model = loaded();
        let events = record_events(&model);
        model.sort("Prix", true).unwrap();
        assert_eq!(labels(&model), vec!["Milk", "Bus", "Bread"]);
        model.sort(2usize, false).unwrap();
        assert_eq!(labels(&model), vec!["Milk", "Bus", "Bread"]);
        assert_eq!(events.lock().len(), 4);
        assert!(model.sort("Montant", true).is_err());
    }

    #[test]
    fn test_to_original_is_idempotent() {
        let mut model = loaded();
        model.group_by(LABEL).unwrap();
        model.to_original();
        let once = model.get_data().clone();
        model.to_original();
        assert_eq!(model.get_data(), &once);
        assert_eq!(Some(&once), model.original());
        assert!(!model.is_grouped());
    }

    #[test]
    fn test_to_original_before_load_is_noop() {
        let mut model = RecordModel::new();
        let events = record_events(&model);
        model.to_original();
        assert!(events.lock().is_empty());
        assert!(!model.is_loaded());
    }

    #[test]
    fn test_totals_and_headers() {
        let model = loaded();
        let (total, count) = model.totals().unwrap();
        assert!((total - 5.5).abs() < 1e-9);
        assert_eq!(count, 3);
        assert_eq!(
            model.header_data(1, Orientation::Horizontal).as_deref(),
            Some(CATEGORY)
        );
        assert_eq!(model.display(0, 0).as_deref(), Some("01/01/2024"));
        assert_eq!(model.column_alignment(3), Alignment::Right);
        assert_eq!(model.column_alignment(2), Alignment::Left);
        let root = ModelIndex::invalid();
        assert_eq!(model.row_count(&root), 3);
        assert_eq!(model.column_count(&root), 4);
        assert!(!model.index(3, 0, &root).is_valid());
        assert_eq!(model.data(&model.index(1, 2, &root)).as_deref(), Some("Bus"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut model = loaded();
        model
            .add_row(Record::new(d(2024, 2, 29), "Santé", "Pharmacie", 12.40))
            .unwrap();
        model.group_by(CATEGORY).unwrap();

        for ext in ["csv", "json", "xlsx"] {
            let path = dir.path().join(format!("depenses.{ext}"));
            model.save(&path).unwrap();

            let mut reloaded = RecordModel::new();
            reloaded.load(&path).unwrap();
            let got = reloaded.get_data().records();
            let want = model.original().unwrap().records();
            assert_eq!(got.len(), want.len(), "{ext}");
            for (g, w) in got.iter().zip(&want) {
                assert_eq!(g.date, w.date, "{ext}");
                assert_eq!(g.category, w.category, "{ext}");
                assert_eq!(g.label, w.label, "{ext}");
                assert!((g.price - (w.price * 100.0).round() / 100.0).abs() < 1e-9, "{ext}");
            }
        }
    }

    #[test]
    fn test_save_unknown_extension_reports() {
        let dir = TempDir::new().unwrap();
        let model = loaded();
        let events = record_events(&model);
        let err = model.save(dir.path().join("depenses.ods")).unwrap_err();
        assert!(matches!(err, DepensesError::UnsupportedFormat(_)));
        assert!(events.lock()[0].starts_with("error Format non supporté"));
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Date,Catégorie,Libellé,Prix\n2024-01-01,Food,Bread,2.5\n").unwrap();

        let mut model = loaded();
        let events = record_events(&model);
        let err = model.load(&path).unwrap_err();
        assert!(matches!(err, DepensesError::DataLoad(_)));
        assert_eq!(model.get_data(), &three_rows());
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_load_emits_layout_signals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depenses.csv");
        std::fs::write(
            &path,
            "Date,Catégorie,Libellé,Prix (€)\n01/01/2024,Food,Bread,2.50\n",
        )
        .unwrap();

        let mut model = RecordModel::new();
        let events = record_events(&model);
        model.load(&path).unwrap();
        assert_eq!(*events.lock(), vec!["layout?", "layout"]);
        assert_eq!(model.get_data().len(), 1);
        assert_eq!(model.pre_filter_snapshot(), model.get_data());
    }
}
