//! In-memory tables and the aggregation transforms built on them.
//!
//! A [`Table`] is an ordered column schema plus rows of [`Value`]s. Every
//! row carries a hidden [`RowId`] so the record model can find "the same"
//! row in its original and working copies after sorting or filtering.
//! Row ids never appear as a column and are ignored by equality.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{DepensesError, Result};
use crate::models::{Record, Value, ANNUAL_TOTAL, COLUMN_ALIASES, PRICE_MAX, PRICE_MEAN, PRICE_MIN, RECORD_COLUMNS};

pub type RowId = u64;

#[derive(Debug, Clone)]
pub struct Row {
    pub id: RowId,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_id: RowId,
}

/// A column named either by position or by name.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::Name(s.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(s: String) -> Self {
        ColumnRef::Name(s)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{i}"),
            ColumnRef::Name(n) => f.write_str(n),
        }
    }
}

/// Reduction applied to each pivot cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    #[default]
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl Aggregator {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }

    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Count => values.len() as f64,
        }
    }
}

impl FromStr for Aggregator {
    type Err = DepensesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            other => Err(DepensesError::Aggregation(format!("unknown aggregator '{other}'"))),
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.values == b.values)
    }
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            next_id: 0,
        }
    }

    pub fn from_records(records: &[Record]) -> Self {
        let mut table = Self::new(RECORD_COLUMNS);
        for rec in records {
            table.push(rec.to_values());
        }
        table
    }

    /// Appends a row, padding or truncating it to the schema width.
    pub fn push(&mut self, mut values: Vec<Value>) -> RowId {
        values.resize(self.columns.len(), Value::Empty);
        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(Row { id, values });
        id
    }

    /// Appends a row under an id minted elsewhere.
    pub(crate) fn push_with_id(&mut self, id: RowId, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Empty);
        self.next_id = self.next_id.max(id + 1);
        self.rows.push(Row { id, values });
    }

    pub(crate) fn next_id(&self) -> RowId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(|r| r.values.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.rows.iter().map(|r| r.values.as_slice())
    }

    pub fn row_id(&self, index: usize) -> Option<RowId> {
        self.rows.get(index).map(|r| r.id)
    }

    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.values.get(column))
    }

    pub(crate) fn set_cell(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.values.get_mut(column)) {
            *cell = value;
        }
    }

    pub(crate) fn remove(&mut self, index: usize) -> Row {
        self.rows.remove(index)
    }

    /// Finds a column by exact name, then case-insensitively, then by alias.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.columns.iter().position(|c| c == name) {
            return Some(i);
        }
        let lower = name.trim().to_lowercase();
        if let Some(i) = self.columns.iter().position(|c| c.to_lowercase() == lower) {
            return Some(i);
        }
        COLUMN_ALIASES
            .iter()
            .filter(|(alias, _)| *alias == lower)
            .find_map(|(_, canonical)| self.columns.iter().position(|c| c == canonical))
    }

    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        match column {
            ColumnRef::Index(i) if *i < self.columns.len() => Ok(*i),
            ColumnRef::Name(name) => self
                .column_position(name)
                .ok_or_else(|| DepensesError::UnknownColumn(name.clone())),
            _ => Err(DepensesError::UnknownColumn(column.to_string())),
        }
    }

    /// Stable sort on one column. Empty cells stay last in both directions.
    pub fn sort_by_column(&mut self, column: usize, ascending: bool) {
        self.rows.sort_by(|a, b| {
            let (x, y) = (&a.values[column], &b.values[column]);
            match (x.is_empty(), y.is_empty()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                _ if ascending => x.cmp(y),
                _ => y.cmp(x),
            }
        });
    }

    /// Keeps the rows for which `keep` returns true; the closure may fail.
    pub fn try_retain<F>(&self, mut keep: F) -> Result<Table>
    where
        F: FnMut(&[Value]) -> Result<bool>,
    {
        let mut out = Table::new(self.columns.clone());
        for row in &self.rows {
            if keep(&row.values)? {
                out.push_with_id(row.id, row.values.clone());
            }
        }
        out.next_id = out.next_id.max(self.next_id);
        Ok(out)
    }

    /// Returns a copy with one more column computed from an existing one.
    pub fn with_derived<F>(&self, name: &str, source: usize, derive: F) -> Table
    where
        F: Fn(&Value) -> Value,
    {
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let mut out = Table::new(columns);
        for row in &self.rows {
            let mut values = row.values.clone();
            values.push(derive(&row.values[source]));
            out.push_with_id(row.id, values);
        }
        out
    }

    fn numbers(&self, column: usize) -> Result<Vec<(usize, f64)>> {
        let mut out = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            match &row.values[column] {
                Value::Number(n) => out.push((i, *n)),
                Value::Empty => {}
                other => {
                    return Err(DepensesError::Aggregation(format!(
                        "column '{}' holds a {} value, expected numbers",
                        self.columns[column],
                        other.kind()
                    )))
                }
            }
        }
        Ok(out)
    }

    /// One row per distinct key (ordered), with `value` summed.
    /// Rows with an empty key are dropped.
    pub fn group_sum(&self, key: usize, value: usize) -> Result<Table> {
        let mut sums: BTreeMap<&Value, f64> = BTreeMap::new();
        for (i, n) in self.numbers(value)? {
            let k = &self.rows[i].values[key];
            if !k.is_empty() {
                *sums.entry(k).or_default() += n;
            }
        }
        // keys whose values were all empty still get a zero row
        for row in &self.rows {
            let k = &row.values[key];
            if !k.is_empty() {
                sums.entry(k).or_default();
            }
        }
        let mut out = Table::new([self.columns[key].clone(), self.columns[value].clone()]);
        for (k, total) in sums {
            out.push(vec![k.clone(), Value::Number(total)]);
        }
        Ok(out)
    }

    /// Cross-tabulates `aggregator(value)` with `row_key` values as rows and
    /// `column_key` values as columns, then appends the row-wise total.
    pub fn pivot(
        &self,
        value: usize,
        row_key: usize,
        column_key: usize,
        aggregator: Aggregator,
    ) -> Result<Table> {
        let numeric: Vec<(usize, f64)> = if aggregator == Aggregator::Count {
            self.rows
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.values[value].is_empty())
                .map(|(i, _)| (i, 1.0))
                .collect()
        } else {
            self.numbers(value)?
        };

        let mut cells: BTreeMap<(&Value, &Value), Vec<f64>> = BTreeMap::new();
        let mut row_keys: BTreeSet<&Value> = BTreeSet::new();
        let mut column_keys: BTreeSet<&Value> = BTreeSet::new();
        for (i, n) in numeric {
            let r = &self.rows[i].values[row_key];
            let c = &self.rows[i].values[column_key];
            if r.is_empty() || c.is_empty() {
                continue;
            }
            row_keys.insert(r);
            column_keys.insert(c);
            cells.entry((r, c)).or_default().push(n);
        }

        let mut columns = vec![self.columns[row_key].clone()];
        columns.extend(column_keys.iter().map(|v| header_label(v)));
        columns.push(ANNUAL_TOTAL.to_string());
        let mut out = Table::new(columns);
        for r in &row_keys {
            let mut values = vec![(*r).clone()];
            let mut total = 0.0;
            for c in &column_keys {
                match cells.get(&(*r, *c)) {
                    Some(found) => {
                        let cell = if aggregator == Aggregator::Count {
                            found.len() as f64
                        } else {
                            aggregator.apply(found)
                        };
                        total += cell;
                        values.push(Value::Number(cell));
                    }
                    None => values.push(Value::Empty),
                }
            }
            values.push(Value::Number(total));
            out.push(values);
        }
        Ok(out)
    }

    /// Joins per-group max/min/mean of `value` onto every row of the group.
    pub fn broadcast_stats(&self, group: usize, value: usize) -> Result<Table> {
        let mut stats: BTreeMap<&Value, Vec<f64>> = BTreeMap::new();
        for (i, n) in self.numbers(value)? {
            stats.entry(&self.rows[i].values[group]).or_default().push(n);
        }
        let summary: BTreeMap<&Value, [f64; 3]> = stats
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    [
                        Aggregator::Max.apply(&v),
                        Aggregator::Min.apply(&v),
                        Aggregator::Mean.apply(&v),
                    ],
                )
            })
            .collect();

        let mut columns = self.columns.clone();
        columns.extend([PRICE_MAX, PRICE_MIN, PRICE_MEAN].map(String::from));
        let mut out = Table::new(columns);
        for row in &self.rows {
            let mut values = row.values.clone();
            match summary.get(&row.values[group]) {
                Some(s) => values.extend(s.iter().map(|n| Value::Number(*n))),
                None => values.extend([Value::Empty, Value::Empty, Value::Empty]),
            }
            out.push_with_id(row.id, values);
        }
        Ok(out)
    }

    /// Sum of a numeric column, skipping empty and non-numeric cells.
    pub fn column_sum(&self, column: usize) -> f64 {
        self.rows
            .iter()
            .filter_map(|r| r.values.get(column).and_then(Value::as_f64))
            .sum()
    }

    /// Rows read back as records; only meaningful for row-level tables.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .filter_map(|r| Record::from_values(&r.values))
            .collect()
    }
}

fn header_label(value: &Value) -> String {
    match value {
        Value::Number(n) if n.fract() == 0.0 => format!("{n:.0}"),
        other => other.to_string(),
    }
}
