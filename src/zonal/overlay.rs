use ahash::AHashMap;
use ndarray::Zip;

use crate::{error::{Result, UcmError}, raster::RasterGrid};

/// Per reference polygon histogram of overlapping candidate polygons, in cells.
#[derive(Debug, Clone)]
pub struct OverlayMatrix {
    counts: Vec<AHashMap<u32, u32>>,
    null_cells: Vec<u32>,
}

impl OverlayMatrix {
    /// Scan two aligned grids cell by cell. `reference` holds reference record
    /// indices (`n_reference` records), `values` the candidate record indices.
    /// Reference cells with no candidate are counted apart as null cells.
    pub fn build(reference: &RasterGrid, values: &RasterGrid, n_reference: usize) -> Result<Self> {
        if !reference.same_geometry(values) {
            return Err(UcmError::ZonalStatistic("reference and value grids are not aligned".into()));
        }

        let mut counts = vec![AHashMap::new(); n_reference];
        let mut null_cells = vec![0u32; n_reference];
        let mut out_of_range = 0usize;

        Zip::from(reference.cells())
            .and(values.cells())
            .for_each(|&r, &v| {
                let Ok(r) = usize::try_from(r) else { return };
                if r >= n_reference {
                    out_of_range += 1;
                } else if let Ok(v) = u32::try_from(v) {
                    *counts[r].entry(v).or_insert(0) += 1;
                } else {
                    null_cells[r] += 1;
                }
            });

        if out_of_range > 0 {
            return Err(UcmError::ZonalStatistic(format!(
                "{out_of_range} reference cells point past the {n_reference} reference records"
            )));
        }
        Ok(Self { counts, null_cells })
    }

    /// Number of reference polygons.
    #[inline] pub fn len(&self) -> usize { self.counts.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.counts.is_empty() }

    /// Candidate index -> overlapping cell count for one reference polygon.
    #[inline]
    pub fn candidates(&self, reference: usize) -> &AHashMap<u32, u32> {
        &self.counts[reference]
    }

    /// Reference cells not covered by any candidate.
    #[inline]
    pub fn null_cells(&self, reference: usize) -> u32 {
        self.null_cells[reference]
    }

    /// Cells burned for one reference polygon.
    pub fn total_cells(&self, reference: usize) -> u32 {
        self.counts[reference].values().sum::<u32>() + self.null_cells[reference]
    }

    /// Candidate with the largest overlap. Ties go to the lowest candidate
    /// index. Returns `None` when no cell was burned for the polygon or when
    /// uncovered cells outnumber the best candidate.
    pub fn majority(&self, reference: usize) -> Option<u32> {
        let (candidate, count) = self.counts[reference].iter()
            .map(|(&c, &n)| (c, n))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;

        (count >= self.null_cells[reference]).then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};

    fn grid(rows: &[&[i32]]) -> RasterGrid {
        let extent = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: rows[0].len() as f64, y: rows.len() as f64 });
        let mut grid = RasterGrid::from_extent(extent, 1.0).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                grid.set(r, c, v);
            }
        }
        grid
    }

    #[test]
    fn counts_overlaps_and_null_cells() {
        let reference = grid(&[&[0, 0, 1, 1], &[0, 0, 1, -1]]);
        let values = grid(&[&[5, 5, -1, -1], &[5, 7, 7, 7]]);
        let matrix = OverlayMatrix::build(&reference, &values, 2).unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.candidates(0).get(&5), Some(&3));
        assert_eq!(matrix.candidates(0).get(&7), Some(&1));
        assert_eq!(matrix.null_cells(0), 0);
        assert_eq!(matrix.candidates(1).get(&7), Some(&1));
        assert_eq!(matrix.null_cells(1), 2);
        assert_eq!(matrix.total_cells(1), 3);
    }

    #[test]
    fn majority_prefers_largest_overlap() {
        let reference = grid(&[&[0, 0, 0, 0, 0]]);
        let values = grid(&[&[3, 3, 3, 1, -1]]);
        let matrix = OverlayMatrix::build(&reference, &values, 1).unwrap();
        assert_eq!(matrix.majority(0), Some(3));
    }

    #[test]
    fn ties_go_to_lowest_candidate_index() {
        let reference = grid(&[&[0, 0, 0, 0]]);
        let values = grid(&[&[9, 2, 9, 2]]);
        let matrix = OverlayMatrix::build(&reference, &values, 1).unwrap();
        assert_eq!(matrix.majority(0), Some(2));
    }

    #[test]
    fn uncovered_cells_can_prevail() {
        let reference = grid(&[&[0, 0, 0, 1, 1]]);
        let values = grid(&[&[4, -1, -1, 4, -1]]);
        let matrix = OverlayMatrix::build(&reference, &values, 3).unwrap();

        assert_eq!(matrix.majority(0), None);
        assert_eq!(matrix.majority(1), Some(4));
        assert_eq!(matrix.majority(2), None);
        assert_eq!(matrix.total_cells(2), 0);
    }

    #[test]
    fn misaligned_grids_are_rejected() {
        let reference = grid(&[&[0, 0]]);
        let values = grid(&[&[0, 0, 0]]);
        assert!(matches!(OverlayMatrix::build(&reference, &values, 1), Err(UcmError::ZonalStatistic(_))));
    }

    #[test]
    fn reference_indices_past_the_layer_are_rejected() {
        let reference = grid(&[&[0, 4]]);
        let values = grid(&[&[1, 1]]);
        assert!(OverlayMatrix::build(&reference, &values, 1).is_err());
    }
}
