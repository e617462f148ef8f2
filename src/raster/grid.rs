use geo::Rect;
use ndarray::Array2;

use crate::{error::{Result, UcmError}, shape::ShapeLayer};

/// Cell value for "no polygon covers this cell".
pub const NO_SHAPE: i32 = -1;

/// Upper bound on grid size (256 Mi cells, 1 GiB per grid), to fail fast on a
/// cell size far too small for the extent.
const MAX_CELLS: usize = 1 << 28;

/// A north-up grid of shape indices covering a spatial extent.
///
/// Row 0 is the northernmost row; cell `(row, col)` spans
/// `[x_min + col * cell, x_min + (col + 1) * cell)` horizontally.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    x_min: f64,
    y_max: f64,
    cell_size: f64,
    cells: Array2<i32>,
}

impl RasterGrid {
    /// Grid covering `bounds` at `cell_size`, every cell set to [`NO_SHAPE`].
    pub fn from_extent(bounds: Rect<f64>, cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(UcmError::InvalidCellSize(cell_size));
        }
        let cols = ((bounds.width() / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height() / cell_size).ceil() as usize).max(1);
        if rows.checked_mul(cols).is_none_or(|n| n > MAX_CELLS) {
            return Err(UcmError::InvalidCellSize(cell_size));
        }

        log::debug!("[raster] grid {rows}x{cols} at cell size {cell_size}");
        Ok(Self {
            x_min: bounds.min().x,
            y_max: bounds.max().y,
            cell_size,
            cells: Array2::from_elem((rows, cols), NO_SHAPE),
        })
    }

    /// Grid covering every live polygon of `layer`. An empty layer gets an
    /// empty grid at the origin.
    pub fn from_layer(layer: &ShapeLayer, cell_size: f64) -> Result<Self> {
        match layer.bounds() {
            Some(bounds) => Self::from_extent(bounds, cell_size),
            None => {
                if !cell_size.is_finite() || cell_size <= 0.0 {
                    return Err(UcmError::InvalidCellSize(cell_size));
                }
                Ok(Self { x_min: 0.0, y_max: 0.0, cell_size, cells: Array2::from_elem((0, 0), NO_SHAPE) })
            }
        }
    }

    /// Empty grid with the same origin, resolution and size as `self`.
    pub fn aligned(&self) -> Self {
        Self { cells: Array2::from_elem(self.cells.dim(), NO_SHAPE), ..*self }
    }

    #[inline] pub fn rows(&self) -> usize { self.cells.nrows() }

    #[inline] pub fn cols(&self) -> usize { self.cells.ncols() }

    #[inline] pub fn cell_size(&self) -> f64 { self.cell_size }

    /// Western edge of the grid.
    #[inline] pub fn x_min(&self) -> f64 { self.x_min }

    /// Northern edge of the grid.
    #[inline] pub fn y_max(&self) -> f64 { self.y_max }

    /// Shape index burned into a cell, if any.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.cells.get((row, col))
            .and_then(|&v| (v != NO_SHAPE).then_some(v as u32))
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: i32) {
        self.cells[(row, col)] = value;
    }

    /// Raw cell values.
    #[inline] pub fn cells(&self) -> &Array2<i32> { &self.cells }

    /// Centre of a cell in map coordinates.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_min + (col as f64 + 0.5) * self.cell_size,
            self.y_max - (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Check that two grids share origin, resolution and size.
    pub fn same_geometry(&self, other: &Self) -> bool {
        self.x_min == other.x_min
            && self.y_max == other.y_max
            && self.cell_size == other.cell_size
            && self.cells.dim() == other.cells.dim()
    }

    /// Set every cell back to [`NO_SHAPE`].
    pub fn reset(&mut self) {
        self.cells.fill(NO_SHAPE);
    }
}
