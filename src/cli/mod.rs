pub mod config;
pub mod export;
pub mod rows;
pub mod show;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use depenses::settings::{load_settings, Settings};
use depenses::RecordModel;

/// Loads `file` (or the configured default file) into a fresh model.
pub(crate) fn open_model(file: Option<&Path>) -> Result<(RecordModel, PathBuf, Settings)> {
    let settings = load_settings();
    let path = settings.resolve_file(file)?;
    let mut model = RecordModel::with_display(settings.display_config());
    model
        .load(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok((model, path, settings))
}

#[derive(Parser)]
#[command(name = "depenses", about = "Track expenses kept in CSV, JSON or XLSX files.")]
pub struct Cli {
    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// How `show` groups the records before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GroupMode {
    /// Row-level records
    #[default]
    Sans,
    Date,
    Categorie,
    Libelle,
    Mois,
    Annee,
    /// Per-category max/min/mean next to every record
    Resume,
    /// Cross-tabulation, see --value/--rows/--columns/--agg
    Pivot,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the records, optionally grouped, sorted, filtered and charted.
    Show {
        /// Expense file (default: default_file from settings)
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = GroupMode::Sans)]
        group: GroupMode,
        /// Column to sort by, by name or position
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Row filter, e.g. "Prix > 20 and Catégorie == 'Loisirs'"
        #[arg(long)]
        filter: Option<String>,
        /// Pivot value column
        #[arg(long, default_value = "Prix")]
        value: String,
        /// Pivot row key
        #[arg(long, default_value = "Année")]
        rows: String,
        /// Pivot column key
        #[arg(long, default_value = "Catégorie")]
        columns: String,
        /// Pivot aggregator: sum, mean, min, max, count
        #[arg(long, default_value = "sum")]
        agg: String,
        /// Chart kinds, e.g. bar,line or pie
        #[arg(long)]
        chart: Option<String>,
        /// Where the SVG chart is written
        #[arg(long = "chart-out", default_value = "depenses.svg")]
        chart_out: PathBuf,
    },
    /// Print the records grouped by category.
    Tree {
        /// Expense file (default: default_file from settings)
        file: Option<PathBuf>,
    },
    /// Append a record and save the file.
    Add {
        /// Expense file (default: default_file from settings)
        file: Option<PathBuf>,
        #[arg(long)]
        date: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        price: String,
    },
    /// Change fields of one record and save the file.
    Update {
        file: PathBuf,
        /// Row position as shown by `show`
        row: usize,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
    /// Remove one record and save the file.
    Delete {
        file: PathBuf,
        /// Row position as shown by `show`
        row: usize,
    },
    /// Convert an expense file to another format (by extension).
    Export { file: PathBuf, output: PathBuf },
    /// Show or change settings.
    Config {
        #[arg(long = "date-format")]
        date_format: Option<String>,
        #[arg(long)]
        locale: Option<String>,
        #[arg(long = "default-file")]
        default_file: Option<String>,
    },
}
