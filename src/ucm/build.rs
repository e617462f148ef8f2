use std::path::Path;

use crate::{
    common,
    config::UcmConfig,
    error::{Result, UcmError},
    progress::Progress,
    raster::{RasterGrid, rasterize},
    shape::{FieldDef, ShapeLayer},
    zonal::{OverlayMatrix, assign_majority},
};
use super::case::{CaseColumns, ID_CASE, ID_CASE_WIDTH, ID_CROP, ID_CROP_WIDTH, ID_METEO, ID_SOIL, fill_id_case};

/// Builds a computation unit map by overlaying crop, soil and meteo layers.
#[derive(Debug, Clone, PartialEq)]
pub struct UcmBuilder {
    id_crop: String,
    id_soil: String,
    id_meteo: String,
    cell_size: f64,
    id_case_width: u8,
}

/// Outcome of the schema extension step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UcmSchema {
    /// `ID_CROP` was present before the extension, so it is left untouched.
    pub crop_existed: bool,
}

/// Add `ID_CASE` and, when missing, `ID_CROP`. Safe to call on a layer that
/// already carries either field; an `ID_CASE` column narrower than
/// `id_case_width` or of another kind is recreated.
pub fn extend_ucm_schema(layer: &mut ShapeLayer, id_case_width: u8) -> Result<UcmSchema> {
    layer.fit_field(FieldDef::character(ID_CASE, id_case_width))?;
    let (_, crop_existed) = layer.ensure_field(FieldDef::character(ID_CROP, ID_CROP_WIDTH))?;
    Ok(UcmSchema { crop_existed })
}

impl UcmBuilder {
    /// `id_crop`, `id_soil` and `id_meteo` name the identifier fields of the
    /// crop, soil and meteo layers respectively.
    pub fn new(id_crop: &str, id_soil: &str, id_meteo: &str, cell_size: f64) -> Self {
        Self {
            id_crop: id_crop.to_string(),
            id_soil: id_soil.to_string(),
            id_meteo: id_meteo.to_string(),
            cell_size,
            id_case_width: ID_CASE_WIDTH,
        }
    }

    pub fn from_config(config: &UcmConfig) -> Result<Self> {
        let cell_size = config.cell_size
            .ok_or_else(|| UcmError::Config("cell_size is required".into()))?;
        Ok(Self::new(&config.id_crop, &config.id_soil, &config.id_meteo, cell_size)
            .with_id_case_width(config.id_case_width))
    }

    /// Override the width of the `ID_CASE` column.
    pub fn with_id_case_width(mut self, width: u8) -> Self {
        self.id_case_width = width;
        self
    }

    #[inline] pub fn cell_size(&self) -> f64 { self.cell_size }

    /// Run the overlay. The crop layer's files on disk are cloned to `output`
    /// and the clone becomes the returned unit map; polygons without a crop,
    /// soil and meteo identifier are removed from it.
    ///
    /// On failure the clone is left in an unspecified state and must be
    /// discarded by the caller.
    pub fn build(
        &self,
        crop: &ShapeLayer,
        soil: &ShapeLayer,
        meteo: &ShapeLayer,
        output: &Path,
        progress: &dyn Progress,
    ) -> Result<ShapeLayer> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(UcmError::InvalidCellSize(self.cell_size));
        }
        if !crop.exist_field(&self.id_crop) {
            return Err(UcmError::Schema(format!(
                "crop field {:?} not found in {}", self.id_crop, crop.path().display()
            )));
        }

        let mut ucm = open_working_copy(crop.path(), output)?;
        log::info!("[ucm] working copy {} ({} polygons)", ucm.path().display(), ucm.record_count());

        let result = self.overlay(&mut ucm, soil, meteo, progress).and_then(|()| {
            progress.set_text("[8/8] Write UCM...");
            self.write_cases(&mut ucm)
        });
        progress.close();
        let incomplete = result?;

        let removed = ucm.compact()?;
        debug_assert_eq!(incomplete, removed);

        log::info!("[ucm] {} units kept, {removed} incomplete polygons removed", ucm.record_count());
        Ok(ucm)
    }

    /// Extend the schema and fill `ID_CASE`. Returns the number of records
    /// marked incomplete.
    fn write_cases(&self, ucm: &mut ShapeLayer) -> Result<usize> {
        let schema = extend_ucm_schema(ucm, self.id_case_width)?;
        let columns = CaseColumns::resolve(ucm, &self.id_crop, ID_SOIL, ID_METEO, !schema.crop_existed)?;
        fill_id_case(ucm, &columns)
    }

    /// Rasterize and vote against meteo then soil. Both grids and the
    /// histogram are dropped before this returns, whatever the outcome.
    fn overlay(&self, ucm: &mut ShapeLayer, soil: &ShapeLayer, meteo: &ShapeLayer, progress: &dyn Progress) -> Result<()> {
        let mut raster_ref = RasterGrid::from_layer(ucm, self.cell_size)?;
        let mut raster_val = raster_ref.aligned();

        progress.start("[1/8] Rasterize crop (reference)...", 0);
        rasterize(&mut raster_ref, ucm)?;

        progress.set_text("[2/8] Rasterize meteo grid...");
        rasterize(&mut raster_val, meteo)?;

        progress.set_text("[3/8] Compute matrix crop/meteo...");
        let matrix = OverlayMatrix::build(&raster_ref, &raster_val, ucm.record_count())?;

        progress.set_text("[4/8] Zonal statistic crop/meteo...");
        assign_majority(ucm, meteo, &matrix, &self.id_meteo, ID_METEO).map_err(as_zonal)?;

        progress.set_text("[5/8] Rasterize soil...");
        rasterize(&mut raster_val, soil)?;

        progress.set_text("[6/8] Compute matrix crop/soil...");
        let matrix = OverlayMatrix::build(&raster_ref, &raster_val, ucm.record_count())?;

        progress.set_text("[7/8] Zonal statistic crop/soil...");
        assign_majority(ucm, soil, &matrix, &self.id_soil, ID_SOIL).map_err(as_zonal)?;

        Ok(())
    }
}

/// Clone the crop files to `output` and open the clone. If either step fails,
/// only the files this call wrote are removed.
fn open_working_copy(crop_path: &Path, output: &Path) -> Result<ShapeLayer> {
    let copy = common::clone_shapefile(crop_path, output)
        .map_err(|e| UcmError::LayerOpen { path: output.with_extension("shp"), reason: e.to_string() })?;

    match ShapeLayer::open(&copy.shp) {
        Ok(layer) => Ok(layer),
        Err(e) => {
            copy.discard();
            Err(e)
        }
    }
}

/// Keep zonal errors as they are; anything else raised during a vote is
/// reported as a zonal failure.
fn as_zonal(e: UcmError) -> UcmError {
    match e {
        UcmError::ZonalStatistic(_) => e,
        other => UcmError::ZonalStatistic(other.to_string()),
    }
}
