use crate::{error::Result, shape::ShapeLayer};
use super::case::{CaseColumns, fill_id_case};

/// Recompute `ID_CASE` on an existing unit map from the given identifier
/// fields and mark records whose case comes out empty for deletion.
///
/// Every field is resolved before anything is written, so a missing field
/// leaves the layer untouched. Deletion marks only reach disk through
/// [`ShapeLayer::compact`]. Returns the number of records marked.
pub fn repair_id_case(layer: &mut ShapeLayer, id_crop: &str, id_soil: &str, id_meteo: &str) -> Result<usize> {
    let columns = CaseColumns::resolve(layer, id_crop, id_soil, id_meteo, false)?;
    let marked = fill_id_case(layer, &columns)?;

    log::info!(
        "[ucm] repaired {}: {marked} of {} records without a complete case",
        layer.path().display(), layer.record_count()
    );
    Ok(marked)
}
