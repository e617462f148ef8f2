//! CSV writing of the unit list.

mod write;

pub use write::UnitsCsv;
