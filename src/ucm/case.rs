use crate::{error::{Result, UcmError}, shape::{FieldIndex, ShapeLayer}, zonal::NODATA};

/// Composite case identifier column.
pub const ID_CASE: &str = "ID_CASE";
/// Crop identifier column added when the crop layer lacks one.
pub const ID_CROP: &str = "ID_CROP";
/// Prevailing soil zone column.
pub const ID_SOIL: &str = "ID_SOIL";
/// Prevailing meteo cell column.
pub const ID_METEO: &str = "ID_METEO";
/// Polygon area in hectares.
pub const HA: &str = "HA";

pub const ID_CASE_WIDTH: u8 = 20;
pub const ID_CROP_WIDTH: u8 = 5;

/// Trim an identifier and map the no-data sentinel to the empty string.
pub fn normalize_identifier(raw: &str) -> String {
    let id = raw.trim();
    if id == NODATA { String::new() } else { id.to_string() }
}

/// `M<meteo>S<soil>C<crop>` once all three identifiers are present after
/// normalization, otherwise the empty string.
pub fn compose_id_case(crop: &str, soil: &str, meteo: &str) -> String {
    let (crop, soil, meteo) = (normalize_identifier(crop), normalize_identifier(soil), normalize_identifier(meteo));
    if crop.is_empty() || soil.is_empty() || meteo.is_empty() {
        return String::new();
    }
    format!("M{meteo}S{soil}C{crop}")
}

/// Columns read and written by the case fill loop, resolved once after the
/// last schema change.
#[derive(Debug, Clone, Copy)]
pub(super) struct CaseColumns {
    pub crop: FieldIndex,
    pub soil: FieldIndex,
    pub meteo: FieldIndex,
    pub id_case: FieldIndex,
    /// Set when the crop identifier must be copied into `ID_CROP`.
    pub id_crop: Option<FieldIndex>,
}

impl CaseColumns {
    pub fn resolve(layer: &ShapeLayer, crop: &str, soil: &str, meteo: &str, write_crop: bool) -> Result<Self> {
        let lookup = |name: &str| layer.field_index(name)
            .ok_or_else(|| UcmError::Schema(format!("field {name:?} not found in {}", layer.path().display())));

        Ok(Self {
            crop: lookup(crop)?,
            soil: lookup(soil)?,
            meteo: lookup(meteo)?,
            id_case: lookup(ID_CASE)?,
            id_crop: if write_crop { Some(lookup(ID_CROP)?) } else { None },
        })
    }
}

/// Recompute `ID_CASE` for every record and mark records with an empty case
/// for deletion. Returns the number of records marked.
pub(super) fn fill_id_case(layer: &mut ShapeLayer, columns: &CaseColumns) -> Result<usize> {
    let mut marked = 0;
    for record in 0..layer.record_count() {
        let crop = normalize_identifier(&layer.read_string(record, &columns.crop)?);
        let soil = layer.read_string(record, &columns.soil)?;
        let meteo = layer.read_string(record, &columns.meteo)?;
        let id_case = compose_id_case(&crop, &soil, &meteo);

        if let Some(id_crop) = &columns.id_crop {
            layer.write_string(record, id_crop, &crop)?;
        }
        layer.write_string(record, &columns.id_case, &id_case)?;

        if id_case.is_empty() {
            layer.mark_deleted(record)?;
            marked += 1;
        }
    }
    Ok(marked)
}
