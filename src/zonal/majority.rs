use rayon::prelude::*;

use crate::{error::{Result, UcmError}, shape::ShapeLayer};
use super::overlay::OverlayMatrix;

/// Value written for polygons that received no candidate.
pub const NODATA: &str = "-9999";

/// Width needed to hold [`NODATA`] in the output column.
const NODATA_WIDTH: u8 = NODATA.len() as u8;

/// For every reference record, copy the `id_field` value of its majority
/// candidate into `out_field` of `reference`. The output column takes the
/// candidate column's kind and width; an existing column that cannot hold
/// those values is recreated. Records without a
/// majority candidate receive [`NODATA`]. Returns the number of records that
/// received a candidate value.
pub fn assign_majority(
    reference: &mut ShapeLayer,
    candidates: &ShapeLayer,
    matrix: &OverlayMatrix,
    id_field: &str,
    out_field: &str,
) -> Result<usize> {
    let id_index = candidates.field_index(id_field)
        .ok_or_else(|| UcmError::ZonalStatistic(format!(
            "field {id_field:?} not found in {}", candidates.path().display()
        )))?;

    if matrix.len() != reference.record_count() {
        return Err(UcmError::ZonalStatistic(format!(
            "overlay matrix covers {} records, reference layer has {}",
            matrix.len(), reference.record_count()
        )));
    }

    let mut out_def = candidates.field_def(&id_index)?.renamed(out_field);
    out_def.width = out_def.width.max(NODATA_WIDTH);
    let nodata = out_def.parse(NODATA)?;

    // Votes only read the matrix, so they can run in parallel; writes stay on this thread.
    let votes = (0..matrix.len())
        .into_par_iter()
        .map(|i| matrix.majority(i))
        .collect::<Vec<_>>();

    let (out_index, _) = reference.fit_field(out_def)
        .map_err(|e| UcmError::ZonalStatistic(e.to_string()))?;

    let mut assigned = 0;
    for (record, vote) in votes.into_iter().enumerate() {
        let value = match vote {
            Some(candidate) => {
                assigned += 1;
                candidates.value(candidate as usize, &id_index)?.clone()
            }
            None => nodata.clone(),
        };
        reference.write_value(record, &out_index, value)
            .map_err(|e| UcmError::ZonalStatistic(e.to_string()))?;
    }

    log::info!(
        "[zonal] {out_field}: {assigned} of {} polygons matched in {}",
        reference.record_count(), candidates.path().display()
    );
    Ok(assigned)
}
