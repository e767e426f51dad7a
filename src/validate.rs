use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{DepensesError, Result};
use crate::models::Record;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"))
}

/// True for plain integers or decimals such as `12`, `-3.5`.
pub fn is_decimal_or_integer(s: &str) -> bool {
    number_re().is_match(s)
}

pub fn check_label(label: &str) -> Result<()> {
    let label = label.trim();
    if label.is_empty() {
        return Err(DepensesError::Validation("label is empty".into()));
    }
    if is_decimal_or_integer(label) {
        return Err(DepensesError::Validation(format!("label '{label}' looks like a number")));
    }
    Ok(())
}

pub fn check_price(price: f64) -> Result<()> {
    if !price.is_finite() {
        return Err(DepensesError::Validation(format!("price {price} is not a number")));
    }
    Ok(())
}

/// Parses a price typed by the user; only plain decimals are accepted.
pub fn parse_price_input(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if !is_decimal_or_integer(raw) {
        return Err(DepensesError::Validation(format!("price '{raw}' is not a number")));
    }
    raw.parse()
        .map_err(|_| DepensesError::Validation(format!("price '{raw}' is not a number")))
}

pub fn parse_date_input(raw: &str, date_format: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), date_format).map_err(|_| {
        DepensesError::Validation(format!("date '{raw}' does not match {date_format}"))
    })
}

pub fn check_record(record: &Record) -> Result<()> {
    check_label(&record.label)?;
    check_price(record.price)
}

/// Builds a record from the four text fields of an entry form.
pub fn record_from_input(
    date: &str,
    category: &str,
    label: &str,
    price: &str,
    date_format: &str,
) -> Result<Record> {
    let record = Record {
        date: parse_date_input(date, date_format)?,
        category: category.trim().to_string(),
        label: label.trim().to_string(),
        price: parse_price_input(price)?,
    };
    check_record(&record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_decimal_or_integer() {
        assert!(is_decimal_or_integer("12"));
        assert!(is_decimal_or_integer("-3.50"));
        assert!(!is_decimal_or_integer("3."));
        assert!(!is_decimal_or_integer("3,5"));
        assert!(!is_decimal_or_integer("abc"));
        assert!(!is_decimal_or_integer(""));
    }

    #[test]
    fn test_check_label() {
        assert!(check_label("Pain").is_ok());
        assert!(check_label("   ").is_err());
        assert!(check_label("42").is_err());
        assert!(check_label("42 ans").is_ok());
    }

    #[test]
    fn test_record_from_input() {
        let rec = record_from_input("04/01/2024", "Food", " Eggs ", "3.00", "%d/%m/%Y").unwrap();
        assert_eq!(rec.label, "Eggs");
        assert_eq!(rec.price, 3.0);
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn test_record_from_input_rejects_bad_fields() {
        let fmt = "%d/%m/%Y";
        assert!(record_from_input("2024-01-04", "Food", "Eggs", "3", fmt).is_err());
        assert!(record_from_input("04/01/2024", "Food", "Eggs", "trois", fmt).is_err());
        assert!(record_from_input("04/01/2024", "Food", "", "3", fmt).is_err());
        assert!(record_from_input("04/01/2024", "Food", "12.5", "3", fmt).is_err());
    }
}
