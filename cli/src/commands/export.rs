use anyhow::Result;
use ucmap::{ShapeLayer, UnitsCsv, UnitsDb, export_units};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ExportArgs) -> Result<()> {
    let ucm = ShapeLayer::open(&args.ucm)?;

    if let Some(path) = &args.db {
        let written = export_units(&ucm, &mut UnitsDb::open(path)?)?;
        eprintln!("[export] {written} units written to {}", path.display());
    }
    if let Some(path) = &args.csv {
        let written = export_units(&ucm, &mut UnitsCsv::new(path))?;
        eprintln!("[export] {written} units written to {}", path.display());
    }

    Ok(())
}
