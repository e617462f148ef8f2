#![doc = "Unit crop map (UCM) builder: crop x soil x meteo computation units"]
mod common;
mod config;
mod error;
mod io;
mod progress;
mod raster;
mod shape;
mod ucm;
mod zonal;

#[doc(inline)]
pub use config::UcmConfig;

#[doc(inline)]
pub use error::{Result, UcmError};

#[doc(inline)]
pub use io::{UNIT_COLUMNS, UnitsCsv, UnitsDb, UnitsSink};

#[doc(inline)]
pub use progress::{LogProgress, NoProgress, Progress};

#[doc(inline)]
pub use raster::{NO_SHAPE, RasterGrid, rasterize};

#[doc(inline)]
pub use shape::{FieldDef, FieldIndex, FieldKind, MAX_FIELD_NAME_LEN, ShapeLayer};

#[doc(inline)]
pub use ucm::{
    ComputationUnit, HA, ID_CASE, ID_CASE_WIDTH, ID_CROP, ID_CROP_WIDTH, ID_METEO, ID_SOIL,
    UcmBuilder, UcmSchema, UcmSummary, collect_units, compose_id_case, export_units,
    extend_ucm_schema, normalize_identifier, repair_id_case,
};

#[doc(inline)]
pub use zonal::{NODATA, OverlayMatrix, assign_majority};
