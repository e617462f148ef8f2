//! Uniform cell grids and polygon burning.

mod grid;
mod rasterize;

pub use grid::{NO_SHAPE, RasterGrid};
pub use rasterize::rasterize;
