use std::path::Path;

use anyhow::{Context, Result};
use ucmap::{ShapeLayer, UcmBuilder, UcmConfig, UcmSummary, UnitsCsv, UnitsDb, export_units};

use crate::progress::SpinnerProgress;

/// Config file values, overridden by whatever was passed on the command line.
fn merged_config(args: &crate::cli::BuildArgs) -> Result<UcmConfig> {
    let mut config = match &args.config {
        Some(path) => UcmConfig::read_from_json(path)?,
        None => UcmConfig::default(),
    };

    if args.crop.is_some() { config.crop = args.crop.clone() }
    if args.soil.is_some() { config.soil = args.soil.clone() }
    if args.meteo.is_some() { config.meteo = args.meteo.clone() }
    if args.output.is_some() { config.output = args.output.clone() }
    if let Some(name) = &args.id_crop { config.id_crop = name.clone() }
    if let Some(name) = &args.id_soil { config.id_soil = name.clone() }
    if let Some(name) = &args.id_meteo { config.id_meteo = name.clone() }
    if args.cell_size.is_some() { config.cell_size = args.cell_size }
    if args.db.is_some() { config.units_db = args.db.clone() }
    if args.csv.is_some() { config.units_csv = args.csv.clone() }

    config.validate()?;
    Ok(config)
}

fn open_layer(path: Option<&Path>, what: &str) -> Result<ShapeLayer> {
    let path = path.with_context(|| format!("[build] no {what} layer configured"))?;
    eprintln!("[build] loading {what} layer from {}", path.display());
    ShapeLayer::open(path).with_context(|| format!("[build] failed to load {what} layer"))
}

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BuildArgs) -> Result<()> {
    let config = merged_config(args)?;

    let crop = open_layer(config.crop.as_deref(), "crop")?;
    let soil = open_layer(config.soil.as_deref(), "soil")?;
    let meteo = open_layer(config.meteo.as_deref(), "meteo")?;
    let output = config.output.as_deref().context("[build] no output configured")?;

    let builder = UcmBuilder::from_config(&config)?;
    let progress = SpinnerProgress::new(cli.verbose > 0);
    let ucm = builder.build(&crop, &soil, &meteo, output, &progress)
        .with_context(|| format!("[build] unit map {} is unusable and should be discarded", output.display()))?;

    let summary = UcmSummary::of(&ucm)?;
    eprintln!(
        "[build] wrote {}: {} polygons, {} units, {:.2} ha",
        ucm.path().display(), summary.polygons, summary.units, summary.area_ha
    );

    if let Some(path) = &config.units_db {
        let written = export_units(&ucm, &mut UnitsDb::open(path)?)?;
        eprintln!("[build] {written} units written to {}", path.display());
    }
    if let Some(path) = &config.units_csv {
        let written = export_units(&ucm, &mut UnitsCsv::new(path))?;
        eprintln!("[build] {written} units written to {}", path.display());
    }

    Ok(())
}
