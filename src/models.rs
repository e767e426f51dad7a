use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};

pub const DATE: &str = "Date";
pub const CATEGORY: &str = "Catégorie";
pub const LABEL: &str = "Libellé";
pub const PRICE: &str = "Prix";
pub const MONTH: &str = "Mois";
pub const YEAR: &str = "Année";
pub const ANNUAL_TOTAL: &str = "Total annuel";
pub const PRICE_MAX: &str = "Prix max";
pub const PRICE_MIN: &str = "Prix min";
pub const PRICE_MEAN: &str = "Prix moyen";

/// Column order of a row-level expense table.
pub const RECORD_COLUMNS: [&str; 4] = [DATE, CATEGORY, LABEL, PRICE];

/// English spellings accepted wherever a record column is named.
pub const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("date", DATE),
    ("category", CATEGORY),
    ("categorie", CATEGORY),
    ("label", LABEL),
    ("libelle", LABEL),
    ("price", PRICE),
    ("prix (€)", PRICE),
    ("month", MONTH),
    ("mois", MONTH),
    ("year", YEAR),
    ("annee", YEAR),
];

/// A single table cell.
///
/// `Month` always holds the first day of its month.
#[derive(Debug, Clone)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Month(NaiveDate),
}

impl Value {
    pub fn month_of(date: NaiveDate) -> Self {
        // day 1 exists in every month
        Value::Month(date.with_day(1).unwrap_or(date))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) | Value::Month(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Date(_) => "date",
            Value::Month(_) => "month",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Date(_) => 1,
            Value::Month(_) => 2,
            Value::Text(_) => 3,
            Value::Empty => 4,
        }
    }
}

// Total order: numbers, dates, months, text, then empty cells last.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Date(a), Value::Date(b)) | (Value::Month(a), Value::Month(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Empty, Value::Empty) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n:.2}"),
            Value::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
            Value::Month(d) => write!(f, "{}", d.format("%m/%Y")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// One expense entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub category: String,
    pub label: String,
    pub price: f64,
}

impl Record {
    pub fn new(date: NaiveDate, category: &str, label: &str, price: f64) -> Self {
        Self {
            date,
            category: category.to_string(),
            label: label.to_string(),
            price,
        }
    }

    /// Cells in `RECORD_COLUMNS` order.
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.category.clone()),
            Value::Text(self.label.clone()),
            Value::Number(self.price),
        ]
    }

    pub fn from_values(values: &[Value]) -> Option<Self> {
        match values {
            [Value::Date(date), category, label, Value::Number(price), ..] => Some(Self {
                date: *date,
                category: category.as_str()?.to_string(),
                label: label.as_str()?.to_string(),
                price: *price,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_value_ordering_puts_empty_last() {
        let mut values = vec![
            Value::Empty,
            Value::from("b"),
            Value::from(2.0),
            Value::from("a"),
            Value::from(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::from(-1.0),
                Value::from(2.0),
                Value::from("a"),
                Value::from("b"),
                Value::Empty,
            ]
        );
    }

    #[test]
    fn test_month_of_truncates_to_first_day() {
        assert_eq!(Value::month_of(d(2024, 3, 17)), Value::Month(d(2024, 3, 1)));
    }

    #[test]
    fn test_record_values_roundtrip() {
        let rec = Record::new(d(2024, 1, 1), "Food", "Bread", 2.5);
        let values = rec.to_values();
        assert_eq!(values.len(), RECORD_COLUMNS.len());
        assert_eq!(Record::from_values(&values), Some(rec));
    }

    #[test]
    fn test_record_from_values_rejects_wrong_kinds() {
        let values = vec![
            Value::from("01/01/2024"),
            Value::from("Food"),
            Value::from("Bread"),
            Value::from(2.5),
        ];
        assert_eq!(Record::from_values(&values), None);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Value::from(1.2).to_string(), "1.20");
        assert_eq!(Value::Date(d(2024, 1, 3)).to_string(), "03/01/2024");
        assert_eq!(Value::Empty.to_string(), "");
    }
}
