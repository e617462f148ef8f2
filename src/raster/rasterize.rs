use geo::{BoundingRect, Coord, MultiPolygon};

use crate::{error::Result, shape::ShapeLayer};
use super::grid::RasterGrid;

/// Burn the record index of every live polygon of `layer` into `grid`.
///
/// A cell belongs to a polygon when its centre lies inside it (even-odd rule,
/// so holes stay empty). Where polygons overlap, the later record wins.
/// Returns the number of cells written.
pub fn rasterize(grid: &mut RasterGrid, layer: &ShapeLayer) -> Result<usize> {
    grid.reset();

    let mut burned = 0;
    for record in 0..layer.record_count() {
        if layer.is_deleted(record) { continue }
        burned += burn_polygon(grid, &layer.polygon(record)?, record as i32);
    }

    log::debug!("[raster] burned {burned} cells from {}", layer.path().display());
    Ok(burned)
}

/// Scanline fill of one polygon, sampling at cell centres.
fn burn_polygon(grid: &mut RasterGrid, polygon: &MultiPolygon<f64>, value: i32) -> usize {
    let Some(rect) = polygon.bounding_rect() else { return 0 };
    if grid.rows() == 0 || grid.cols() == 0 { return 0 }

    let size = grid.cell_size();
    let last_row = grid.rows() as i64 - 1;
    let row_start = ((grid.y_max() - rect.max().y) / size - 0.5).ceil().max(0.0) as i64;
    let row_end = (((grid.y_max() - rect.min().y) / size - 0.5).floor() as i64).min(last_row);

    let edges: Vec<(Coord<f64>, Coord<f64>)> = polygon.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.lines())
        .map(|line| (line.start, line.end))
        .collect();

    let mut burned = 0;
    let mut crossings: Vec<f64> = Vec::new();
    for row in row_start..=row_end {
        let y = grid.y_max() - (row as f64 + 0.5) * size;

        crossings.clear();
        crossings.extend(edges.iter()
            .filter(|(a, b)| (a.y > y) != (b.y > y))
            .map(|(a, b)| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y)));
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // columns whose centre x lies in [span[0], span[1])
            let first = column_at(grid, span[0]);
            let end = column_at(grid, span[1]);
            for col in first..end {
                grid.set(row as usize, col, value);
                burned += 1;
            }
        }
    }
    burned
}

/// First column whose centre lies at or east of `x`, clamped to the grid.
fn column_at(grid: &RasterGrid, x: f64) -> usize {
    let col = ((x - grid.x_min()) / grid.cell_size() - 0.5).ceil();
    col.clamp(0.0, grid.cols() as f64) as usize
}
