use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};
use tracing::debug;

use depenses::chart::{self, ChartKind};
use depenses::fmt::euros;
use depenses::item_model::{Alignment, ItemModel, ModelIndex, Orientation};
use depenses::models::{CATEGORY, DATE, LABEL, PRICE};
use depenses::table::{Aggregator, ColumnRef};
use depenses::RecordModel;

use super::{open_model, GroupMode};

pub struct ShowOptions {
    pub file: Option<PathBuf>,
    pub group: GroupMode,
    pub sort: Option<String>,
    pub descending: bool,
    pub filter: Option<String>,
    pub pivot_value: String,
    pub pivot_rows: String,
    pub pivot_columns: String,
    pub aggregator: String,
    pub chart: Option<String>,
    pub chart_out: PathBuf,
}

pub fn run(opts: ShowOptions) -> Result<()> {
    let aggregator: Aggregator = opts.aggregator.parse()?;
    let kinds = opts
        .chart
        .as_deref()
        .map(str::parse::<ChartKind>)
        .transpose()?;

    let (mut model, path, _) = open_model(opts.file.as_deref())?;
    model
        .signals()
        .error_occurred
        .connect(|msg| eprintln!("{} {msg}", "Warning:".yellow().bold()));

    // grouping and filter failures are reported through the signal above
    // and leave a usable view behind
    if apply_group(&mut model, &opts, aggregator).is_err() {
        debug!(group = ?opts.group, "grouping failed, showing records");
    }
    // filter restarts from the grouped snapshot, so it runs before sort
    if let Some(expr) = &opts.filter {
        if model.filter(expr).is_err() {
            debug!(expr = %expr, "filter rolled back to the original records");
        }
    }
    if let Some(column) = &opts.sort {
        model
            .sort(column_ref(column), !opts.descending)
            .with_context(|| format!("cannot sort by '{column}'"))?;
    }

    let group = if model.is_grouped() { opts.group } else { GroupMode::Sans };
    println!("{}", title(&path, group).bold());
    println!("{}", render(&model));
    if let Some((total, count)) = model.totals() {
        println!(
            "Total des dépenses : {}  -  Nombre d'éléments : {count}",
            euros(total)
        );
    }

    let kinds = kinds.filter(|k| !k.is_empty());
    if kinds.is_some() && model.get_data().column_position(PRICE).is_none() {
        model
            .signals()
            .error_occurred
            .emit(format!("pas de graphique pour cette vue (colonne {PRICE} absente)"));
    } else if let Some(kinds) = kinds {
        let document = chart::render_svg(model.get_data(), 0, kinds, model.display_config())?;
        chart::save_svg(&opts.chart_out, &document)
            .with_context(|| format!("cannot write {}", opts.chart_out.display()))?;
        println!("Chart ({kinds}) written to {}", opts.chart_out.display());
    }
    Ok(())
}

fn apply_group(
    model: &mut RecordModel,
    opts: &ShowOptions,
    aggregator: Aggregator,
) -> depenses::Result<()> {
    match opts.group {
        GroupMode::Sans => {
            model.to_original();
            Ok(())
        }
        GroupMode::Date => model.group_by(DATE),
        GroupMode::Categorie => model.group_by(CATEGORY),
        GroupMode::Libelle => model.group_by(LABEL),
        GroupMode::Mois => model.per_month(),
        GroupMode::Annee => model.per_year(),
        GroupMode::Resume => model.resume(),
        GroupMode::Pivot => model.pivot(
            opts.pivot_value.as_str(),
            opts.pivot_rows.as_str(),
            opts.pivot_columns.as_str(),
            aggregator,
        ),
    }
}

fn column_ref(raw: &str) -> ColumnRef {
    match raw.trim().parse::<usize>() {
        Ok(i) => ColumnRef::Index(i),
        Err(_) => ColumnRef::Name(raw.to_string()),
    }
}

fn title(path: &Path, group: GroupMode) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match group {
        GroupMode::Sans => name,
        other => format!("{name} ({other:?})"),
    }
}

/// Renders any flat item model as a terminal table.
pub(crate) fn render(model: &impl ItemModel) -> Table {
    let root = ModelIndex::invalid();
    let columns = model.column_count(&root);

    let mut table = Table::new();
    let mut header = vec![Cell::new("#")];
    header.extend(
        (0..columns).map(|c| Cell::new(model.header_data(c, Orientation::Horizontal).unwrap_or_default())),
    );
    table.set_header(header);

    for r in 0..model.row_count(&root) {
        let mut cells = vec![Cell::new(
            model.header_data(r, Orientation::Vertical).unwrap_or_default(),
        )];
        for c in 0..columns {
            let index = model.index(r, c, &root);
            let cell = Cell::new(model.data(&index).unwrap_or_default());
            cells.push(match model.alignment(&index) {
                Alignment::Right => cell.set_alignment(CellAlignment::Right),
                Alignment::Left => cell,
            });
        }
        table.add_row(cells);
    }
    table
}
