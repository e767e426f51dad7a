use std::path::Path;

use anyhow::{Context, Result};

use depenses::formats::FileFormat;

use super::open_model;

pub fn run(file: &Path, output: &Path) -> Result<()> {
    let (model, _, _) = open_model(Some(file))?;
    model
        .save(output)
        .with_context(|| format!("cannot export to {}", output.display()))?;
    let kind = FileFormat::from_path(output).map_or("file", |f| f.name());
    let rows = model.original().map_or(0, |t| t.len());
    println!("Exported {rows} rows to {} ({kind})", output.display());
    Ok(())
}
