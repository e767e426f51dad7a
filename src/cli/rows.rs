use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use depenses::fmt::euros;
use depenses::models::{Value, CATEGORY, DATE, LABEL, PRICE};
use depenses::validate::record_from_input;

use super::open_model;

pub fn add(file: Option<&Path>, date: &str, category: &str, label: &str, price: &str) -> Result<()> {
    let (mut model, path, settings) = open_model(file)?;
    let record = record_from_input(date, category, label, price, &settings.date_format)?;
    let position = model.add_row(record.clone())?;
    model
        .save(&path)
        .with_context(|| format!("cannot save {}", path.display()))?;
    println!(
        "{} row {position}: {} {} {}",
        "Added".green(),
        record.label,
        record.category,
        euros(record.price)
    );
    Ok(())
}

pub fn update(
    file: &Path,
    row: usize,
    date: Option<String>,
    category: Option<String>,
    label: Option<String>,
    price: Option<String>,
) -> Result<()> {
    let fields: Vec<(&str, Value)> = [(DATE, date), (CATEGORY, category), (LABEL, label), (PRICE, price)]
        .into_iter()
        .filter_map(|(column, raw)| raw.map(|raw| (column, Value::Text(raw))))
        .collect();
    if fields.is_empty() {
        bail!("nothing to update: pass --date, --category, --label or --price");
    }

    let (mut model, path, _) = open_model(Some(file))?;
    let changed = fields.len();
    model.update_row(row, fields)?;
    model
        .save(&path)
        .with_context(|| format!("cannot save {}", path.display()))?;
    println!("{} row {row} ({changed} field(s))", "Updated".green());
    Ok(())
}

pub fn delete(file: &Path, row: usize) -> Result<()> {
    let (mut model, path, _) = open_model(Some(file))?;
    let label = model.display(row, 2).unwrap_or_default();
    model.delete_row(row)?;
    model
        .save(&path)
        .with_context(|| format!("cannot save {}", path.display()))?;
    println!("{} row {row}: {label}", "Deleted".red());
    Ok(())
}
