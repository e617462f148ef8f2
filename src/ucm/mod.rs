//! Computation unit maps: crop polygons tagged with their prevailing soil and
//! meteo zones, keyed by a composite case identifier.

mod build;
mod case;
mod repair;
mod units;

pub use build::{UcmBuilder, UcmSchema, extend_ucm_schema};
pub use case::{HA, ID_CASE, ID_CASE_WIDTH, ID_CROP, ID_CROP_WIDTH, ID_METEO, ID_SOIL, compose_id_case, normalize_identifier};
pub use repair::repair_id_case;
pub use units::{ComputationUnit, UcmSummary, collect_units, export_units};
