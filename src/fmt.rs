use chrono::Locale;
use tracing::warn;

use crate::models::Value;

/// How dates, months and amounts are rendered for display.
///
/// Passed explicitly to every rendering call instead of living in
/// process-wide locale state.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub date_format: String,
    pub month_format: String,
    pub locale: Locale,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            month_format: "%B %Y".to_string(),
            locale: Locale::fr_FR,
        }
    }
}

impl DisplayConfig {
    /// Builds a config from settings strings, falling back to fr_FR.
    pub fn from_parts(date_format: &str, locale: &str) -> Self {
        let locale = Locale::try_from(locale).unwrap_or_else(|_| {
            warn!(locale, "unknown locale, using fr_FR");
            Locale::fr_FR
        });
        Self {
            date_format: date_format.to_string(),
            locale,
            ..Self::default()
        }
    }

    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Empty => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format!("{n:.2}"),
            Value::Date(d) => d.format(&self.date_format).to_string(),
            Value::Month(d) => {
                capitalize(&d.format_localized(&self.month_format, self.locale).to_string())
            }
        }
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format an amount the French way: 1 234,56 €
pub fn euros(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-{grouped},{dec_part} €")
    } else {
        format!("{grouped},{dec_part} €")
    }
}
