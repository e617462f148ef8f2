use ahash::AHashSet;
use geo::Area;
use serde::Serialize;

use crate::{error::{Result, UcmError}, io::UnitsSink, shape::ShapeLayer};
use super::case::{HA, ID_CASE, ID_CROP, ID_METEO, ID_SOIL};

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// One distinct crop x soil x meteo combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputationUnit {
    pub id_case: String,
    pub id_crop: String,
    pub id_meteo: String,
    pub id_soil: String,
    pub area_ha: f64,
}

/// Totals over a unit map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UcmSummary {
    pub polygons: usize,
    pub units: usize,
    pub area_ha: f64,
}

impl UcmSummary {
    pub fn of(layer: &ShapeLayer) -> Result<Self> {
        let units = collect_units(layer)?;
        let polygons = (0..layer.record_count()).filter(|&i| !layer.is_deleted(i)).count();
        let area_ha = (0..layer.record_count())
            .filter(|&i| !layer.is_deleted(i))
            .map(|i| area_ha(layer, i))
            .sum::<Result<f64>>()?;
        Ok(Self { polygons, units: units.len(), area_ha })
    }
}

/// Distinct units in first-seen record order. Records without a case or
/// marked for deletion are skipped. A repeated case keeps the area of its
/// first polygon; later fragments are not added.
pub fn collect_units(layer: &ShapeLayer) -> Result<Vec<ComputationUnit>> {
    let lookup = |name: &str| layer.field_index(name)
        .ok_or_else(|| UcmError::Schema(format!("field {name:?} not found in {}", layer.path().display())));

    let id_case = lookup(ID_CASE)?;
    let id_crop = lookup(ID_CROP)?;
    let id_meteo = lookup(ID_METEO)?;
    let id_soil = lookup(ID_SOIL)?;

    let mut seen = AHashSet::new();
    let mut units = Vec::new();
    for record in (0..layer.record_count()).filter(|&i| !layer.is_deleted(i)) {
        let case = layer.read_string(record, &id_case)?;
        if case.is_empty() || !seen.insert(case.clone()) {
            continue;
        }
        units.push(ComputationUnit {
            id_case: case,
            id_crop: layer.read_string(record, &id_crop)?,
            id_meteo: layer.read_string(record, &id_meteo)?,
            id_soil: layer.read_string(record, &id_soil)?,
            area_ha: area_ha(layer, record)?,
        });
    }
    Ok(units)
}

/// Collect the units of `layer` and hand them to `sink` in one batch.
/// Returns the number of units written.
pub fn export_units(layer: &ShapeLayer, sink: &mut dyn UnitsSink) -> Result<usize> {
    let units = collect_units(layer)?;
    sink.write_units(&units).map_err(|e| UcmError::Persistence(format!("{e:#}")))?;

    log::info!("[ucm] exported {} units from {}", units.len(), layer.path().display());
    Ok(units.len())
}

/// `HA` attribute, or the planar polygon area when the layer has no such
/// field or the value is null.
fn area_ha(layer: &ShapeLayer, record: usize) -> Result<f64> {
    if layer.exist_field(HA) {
        if let Some(ha) = layer.read_numeric(record, HA)? {
            return Ok(ha);
        }
    }
    Ok(layer.polygon(record)?.unsigned_area() / SQUARE_METRES_PER_HECTARE)
}
