//! Sinks for the deduplicated computation unit list.
//!
//! - `sqlite` - the `computational_units` table of a SQLite database
//! - `csv` - a flat CSV file with the same columns

mod csv;
mod sqlite;

pub use csv::UnitsCsv;
pub use sqlite::UnitsDb;

use crate::ucm::ComputationUnit;

/// Column names shared by every sink, in output order.
pub const UNIT_COLUMNS: [&str; 5] = ["ID_CASE", "ID_CROP", "ID_METEO", "ID_SOIL", "HA"];

/// Receives the unit list in one batch. Implementations either store the
/// whole batch or fail with a message that is reported to the caller as-is.
pub trait UnitsSink {
    fn write_units(&mut self, units: &[ComputationUnit]) -> anyhow::Result<()>;
}
