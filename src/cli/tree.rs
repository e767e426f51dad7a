use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use depenses::fmt::euros;
use depenses::item_model::{ItemModel, ModelIndex, Orientation};
use depenses::settings::load_settings;
use depenses::CategoryTreeModel;

pub fn run(file: Option<&Path>) -> Result<()> {
    let settings = load_settings();
    let path = settings.resolve_file(file)?;
    let mut tree = CategoryTreeModel::new();
    tree.load(&path, &settings.date_format)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let root = ModelIndex::invalid();
    let mut table = Table::new();
    table.set_header(
        (0..tree.column_count(&root))
            .map(|c| tree.header_data(c, Orientation::Horizontal).unwrap_or_default())
            .collect::<Vec<_>>(),
    );

    for (r, category) in tree.categories().iter().enumerate() {
        let node = tree.index(r, 0, &root);
        let name = tree.data(&node).unwrap_or_default();
        table.add_row(vec![
            Cell::new(name.bold()),
            Cell::new(euros(category.total).bold()).set_alignment(CellAlignment::Right),
        ]);
        for m in 0..tree.row_count(&node) {
            let label = tree.data(&tree.index(m, 0, &node)).unwrap_or_default();
            let price = tree.data(&tree.index(m, 1, &node)).unwrap_or_default();
            table.add_row(vec![
                Cell::new(format!("  {label}")),
                Cell::new(price).set_alignment(CellAlignment::Right),
            ]);
        }
    }

    println!("Dépenses par catégorie\n{table}");
    Ok(())
}
