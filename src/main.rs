mod cli;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::show::ShowOptions;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    init_logger(level);

    let result = match cli.command {
        Commands::Show {
            file,
            group,
            sort,
            desc,
            filter,
            value,
            rows,
            columns,
            agg,
            chart,
            chart_out,
        } => cli::show::run(ShowOptions {
            file,
            group,
            sort,
            descending: desc,
            filter,
            pivot_value: value,
            pivot_rows: rows,
            pivot_columns: columns,
            aggregator: agg,
            chart,
            chart_out,
        }),
        Commands::Tree { file } => cli::tree::run(file.as_deref()),
        Commands::Add {
            file,
            date,
            category,
            label,
            price,
        } => cli::rows::add(file.as_deref(), &date, &category, &label, &price),
        Commands::Update {
            file,
            row,
            date,
            category,
            label,
            price,
        } => cli::rows::update(&file, row, date, category, label, price),
        Commands::Delete { file, row } => cli::rows::delete(&file, row),
        Commands::Export { file, output } => cli::export::run(&file, &output),
        Commands::Config {
            date_format,
            locale,
            default_file,
        } => cli::config::run(date_format, locale, default_file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Logs to stderr. `RUST_LOG` wins over the `-v` level when set.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
