use anyhow::{Context, Result};
use ucmap::{ShapeLayer, repair_id_case};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RepairArgs) -> Result<()> {
    eprintln!("[repair] loading unit map from {}", args.ucm.display());
    let mut ucm = ShapeLayer::open(&args.ucm)?;

    let marked = repair_id_case(&mut ucm, &args.id_crop, &args.id_soil, &args.id_meteo)?;
    let removed = ucm.compact()
        .with_context(|| format!("[repair] failed to rewrite {}", args.ucm.display()))?;
    debug_assert_eq!(marked, removed);

    eprintln!("[repair] removed {removed} incomplete polygons, {} remain", ucm.record_count());
    Ok(())
}
