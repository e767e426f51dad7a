use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{DepensesError, Result};
use crate::models::{Value, COLUMN_ALIASES, DATE, PRICE, RECORD_COLUMNS};
use crate::table::Table;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses a price cell: tolerates a currency sign, spaces and a decimal comma.
pub fn parse_price(raw: &str) -> Option<f64> {
    let s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '"')
        .collect();
    let s = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.replace(',', "")
    };
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Text form of a cell as written to CSV/XLSX.
fn cell_text(value: &Value, date_format: &str) -> String {
    match value {
        Value::Empty => String::new(),
        Value::Text(s) => s.clone(),
        Value::Number(n) => format!("{:.2}", n),
        Value::Date(d) => d.format(date_format).to_string(),
        Value::Month(d) => d.format("%m/%Y").to_string(),
    }
}

// ---------------------------------------------------------------------------
// Format kinds: enum dispatch on the file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
    Xlsx,
}

const ALL_FORMATS: &[FileFormat] = &[FileFormat::Csv, FileFormat::Json, FileFormat::Xlsx];

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "Fichier CSV",
            Self::Json => "Fichier JSON",
            Self::Xlsx => "Fichier Excel",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ALL_FORMATS
            .iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
            .copied()
    }

    fn read_raw(&self, path: &Path) -> Result<RawTable> {
        match self {
            Self::Csv => read_csv(path),
            Self::Json => read_json(path),
            Self::Xlsx => read_xlsx(path),
        }
    }

    fn write(&self, path: &Path, table: &Table, date_format: &str) -> Result<()> {
        match self {
            Self::Csv => write_csv(path, table, date_format),
            Self::Json => write_json(path, table, date_format),
            Self::Xlsx => write_xlsx(path, table, date_format),
        }
    }
}

/// A cell as it comes out of a file, before the record schema is applied.
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Serial(f64),
}

#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

// ---------------------------------------------------------------------------
// read / write
// ---------------------------------------------------------------------------

/// Reads an expense file into a row-level table with the record columns.
pub fn read_records(path: &Path, date_format: &str) -> Result<Table> {
    let format = FileFormat::from_path(path).ok_or_else(|| {
        DepensesError::DataLoad(format!("unrecognized file type: {}", path.display()))
    })?;
    let raw = format
        .read_raw(path)
        .map_err(|e| match e {
            DepensesError::DataLoad(_) => e,
            other => DepensesError::DataLoad(other.to_string()),
        })?;
    let table = into_record_table(raw, date_format)?;
    debug!(path = %path.display(), rows = table.len(), format = format.extension(), "read expense file");
    Ok(table)
}

/// Writes any table in the format given by the destination's extension.
pub fn write_table(path: &Path, table: &Table, date_format: &str) -> Result<()> {
    let format = FileFormat::from_path(path)
        .ok_or_else(|| DepensesError::UnsupportedFormat(path.display().to_string()))?;
    format.write(path, table, date_format)?;
    debug!(path = %path.display(), rows = table.len(), format = format.extension(), "wrote table");
    Ok(())
}

fn find_header(headers: &[String], canonical: &str) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        h == canonical || {
            let lower = h.to_lowercase();
            lower == canonical.to_lowercase()
                || COLUMN_ALIASES
                    .iter()
                    .any(|(alias, target)| *alias == lower && *target == canonical)
        }
    })
}

fn into_record_table(raw: RawTable, date_format: &str) -> Result<Table> {
    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(RECORD_COLUMNS) {
        *slot = find_header(&raw.headers, name)
            .ok_or_else(|| DepensesError::DataLoad(format!("missing column '{name}'")))?;
    }
    let [idx_date, idx_cat, idx_label, idx_price] = positions;

    let mut table = Table::new(RECORD_COLUMNS);
    for (n, row) in raw.rows.iter().enumerate() {
        let line = n + 1;
        if row.iter().all(|c| *c == RawCell::Empty) {
            continue;
        }
        let cell = |i: usize| row.get(i).cloned().unwrap_or(RawCell::Empty);
        let date = match cell(idx_date) {
            RawCell::Text(s) => NaiveDate::parse_from_str(s.trim(), date_format).map_err(|_| {
                DepensesError::DataLoad(format!(
                    "row {line}: {DATE} '{s}' does not match {date_format}"
                ))
            })?,
            RawCell::Serial(f) | RawCell::Number(f) if (1.0..2_958_466.0).contains(&f) => {
                excel_serial_to_date(f).ok_or_else(|| {
                    DepensesError::DataLoad(format!("row {line}: invalid {DATE} serial {f}"))
                })?
            }
            other => {
                return Err(DepensesError::DataLoad(format!(
                    "row {line}: cannot read {DATE} from {other:?}"
                )))
            }
        };
        let price = match cell(idx_price) {
            RawCell::Number(f) | RawCell::Serial(f) => f,
            RawCell::Text(s) => parse_price(&s).ok_or_else(|| {
                DepensesError::DataLoad(format!("row {line}: {PRICE} '{s}' is not a number"))
            })?,
            RawCell::Empty => {
                return Err(DepensesError::DataLoad(format!("row {line}: missing {PRICE}")))
            }
        };
        let text = |c: RawCell| match c {
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(f) | RawCell::Serial(f) => f.to_string(),
            RawCell::Empty => String::new(),
        };
        table.push(vec![
            Value::Date(date),
            Value::Text(text(cell(idx_cat))),
            Value::Text(text(cell(idx_label))),
            Value::Number(price),
        ]);
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let headers = rdr.headers()?.iter().map(|h| h.trim_start_matches('\u{feff}').to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|f| {
                    if f.trim().is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(f.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(RawTable { headers, rows })
}

fn write_csv(path: &Path, table: &Table, date_format: &str) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| cell_text(v, date_format)))?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON: array of records, or the column orientation {"col": {"0": v}}
// ---------------------------------------------------------------------------

fn json_cell(value: &serde_json::Value) -> RawCell {
    match value {
        serde_json::Value::Null => RawCell::Empty,
        serde_json::Value::String(s) if s.trim().is_empty() => RawCell::Empty,
        serde_json::Value::String(s) => RawCell::Text(s.clone()),
        serde_json::Value::Number(n) => n.as_f64().map_or(RawCell::Empty, RawCell::Number),
        other => RawCell::Text(other.to_string()),
    }
}

fn read_json(path: &Path) -> Result<RawTable> {
    let content = std::fs::read_to_string(path)?;
    let doc: serde_json::Value = serde_json::from_str(&content)?;
    let mut raw = RawTable::default();
    match doc {
        serde_json::Value::Array(items) => {
            for item in &items {
                let Some(obj) = item.as_object() else {
                    return Err(DepensesError::DataLoad("JSON rows must be objects".into()));
                };
                for key in obj.keys() {
                    if !raw.headers.contains(key) {
                        raw.headers.push(key.clone());
                    }
                }
            }
            for item in &items {
                let row = raw
                    .headers
                    .iter()
                    .map(|h| item.get(h).map_or(RawCell::Empty, json_cell))
                    .collect();
                raw.rows.push(row);
            }
        }
        serde_json::Value::Object(columns) => {
            let mut index: Vec<String> = Vec::new();
            for inner in columns.values() {
                let Some(cells) = inner.as_object() else {
                    return Err(DepensesError::DataLoad("JSON columns must be objects".into()));
                };
                for key in cells.keys() {
                    if !index.contains(key) {
                        index.push(key.clone());
                    }
                }
            }
            index.sort_by_key(|k| k.parse::<u64>().unwrap_or(u64::MAX));
            raw.headers = columns.keys().cloned().collect();
            for key in &index {
                let row = columns
                    .values()
                    .map(|col| col.get(key).map_or(RawCell::Empty, json_cell))
                    .collect();
                raw.rows.push(row);
            }
        }
        _ => return Err(DepensesError::DataLoad("unexpected JSON document".into())),
    }
    Ok(raw)
}

fn write_json(path: &Path, table: &Table, date_format: &str) -> Result<()> {
    let items: Vec<serde_json::Value> = table
        .rows()
        .map(|row| {
            let obj: serde_json::Map<String, serde_json::Value> = table
                .columns()
                .iter()
                .zip(row)
                .map(|(name, v)| {
                    let json = match v {
                        Value::Empty => serde_json::Value::Null,
                        Value::Number(n) => serde_json::Value::from(round2(*n)),
                        other => serde_json::Value::from(cell_text(other, date_format)),
                    };
                    (name.clone(), json)
                })
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();
    let json = serde_json::to_string_pretty(&items)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// XLSX: read with calamine, write with rust_xlsxwriter
// ---------------------------------------------------------------------------

fn read_xlsx(path: &Path) -> Result<RawTable> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| DepensesError::DataLoad(format!("Failed to open XLSX: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DepensesError::DataLoad("workbook has no sheet".into()))?
        .map_err(|e| DepensesError::DataLoad(format!("Failed to read sheet: {e}")))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string()).collect(),
        None => return Ok(RawTable::default()),
    };
    let rows = rows
        .map(|row| {
            row.iter()
                .map(|c| match c {
                    Data::String(s) if s.trim().is_empty() => RawCell::Empty,
                    Data::String(s) | Data::DateTimeIso(s) => RawCell::Text(s.clone()),
                    Data::Float(f) => RawCell::Number(*f),
                    Data::Int(i) => RawCell::Number(*i as f64),
                    Data::DateTime(dt) => RawCell::Serial(dt.as_f64()),
                    Data::Bool(b) => RawCell::Text(b.to_string()),
                    _ => RawCell::Empty,
                })
                .collect()
        })
        .collect();
    Ok(RawTable { headers, rows })
}

fn write_xlsx(path: &Path, table: &Table, date_format: &str) -> Result<()> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, name) in table.columns().iter().enumerate() {
        sheet.write_string(0, c as u16, name.as_str())?;
    }
    for (r, row) in table.rows().enumerate() {
        let r = r as u32 + 1;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                Value::Empty => {}
                Value::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
                other => {
                    sheet.write_string(r, c, cell_text(other, date_format))?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}
