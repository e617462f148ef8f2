//! Shapefile-backed polygon layers with a mutable dbf attribute table.

mod field;
mod io;
mod layer;

pub use field::{FieldDef, FieldIndex, FieldKind, MAX_FIELD_NAME_LEN};
pub use layer::ShapeLayer;
