//! CSV writing operations.

use std::{fs::File, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, NamedFrom}, series::Series};

use crate::ucm::ComputationUnit;
use super::super::{UNIT_COLUMNS, UnitsSink};

/// Write a DataFrame to a CSV file.
fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// One column per unit attribute, in [`UNIT_COLUMNS`] order.
fn units_frame(units: &[ComputationUnit]) -> Result<DataFrame> {
    let text = |f: fn(&ComputationUnit) -> &str| units.iter().map(f).collect::<Vec<_>>();
    let [case, crop, meteo, soil, ha] = UNIT_COLUMNS;

    Ok(DataFrame::new(vec![
        Series::new(case.into(), text(|u| u.id_case.as_str())).into(),
        Series::new(crop.into(), text(|u| u.id_crop.as_str())).into(),
        Series::new(meteo.into(), text(|u| u.id_meteo.as_str())).into(),
        Series::new(soil.into(), text(|u| u.id_soil.as_str())).into(),
        Series::new(ha.into(), units.iter().map(|u| u.area_ha).collect::<Vec<_>>()).into(),
    ])?)
}

/// Units written to a CSV file, replacing it on every write.
#[derive(Debug, Clone)]
pub struct UnitsCsv {
    path: PathBuf,
}

impl UnitsCsv {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl UnitsSink for UnitsCsv {
    fn write_units(&mut self, units: &[ComputationUnit]) -> Result<()> {
        let mut df = units_frame(units)?;
        write_csv(&mut df, &self.path)?;

        log::debug!("[io::csv::write] wrote {} units to {}", units.len(), self.path.display());
        Ok(())
    }
}
