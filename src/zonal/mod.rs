//! Overlay histograms between two aligned grids and the majority vote built on them.

mod majority;
mod overlay;

pub use majority::{NODATA, assign_majority};
pub use overlay::OverlayMatrix;
