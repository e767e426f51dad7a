use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Table};

use depenses::settings::{load_settings, save_settings, settings_path};

pub fn run(date_format: Option<String>, locale: Option<String>, default_file: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let changed = date_format.is_some() || locale.is_some() || default_file.is_some();
    if let Some(fmt) = date_format {
        settings.date_format = fmt;
    }
    if let Some(locale) = locale {
        settings.locale = locale;
    }
    if let Some(file) = default_file {
        settings.default_file = Some(file).filter(|f| !f.is_empty());
    }
    if changed {
        save_settings(&settings)?;
        println!("{}", "Settings saved.".green());
    }

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("date_format"), Cell::new(&settings.date_format)]);
    table.add_row(vec![Cell::new("locale"), Cell::new(&settings.locale)]);
    table.add_row(vec![
        Cell::new("default_file"),
        Cell::new(settings.default_file.as_deref().unwrap_or("-")),
    ]);
    println!("{}\n{table}", settings_path().display());
    Ok(())
}
