use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, UcmError},
    shape::MAX_FIELD_NAME_LEN,
    ucm::{ID_CROP, ID_METEO, ID_SOIL, ID_CASE_WIDTH},
};

fn default_id_crop() -> String { ID_CROP.to_string() }
fn default_id_soil() -> String { ID_SOIL.to_string() }
fn default_id_meteo() -> String { ID_METEO.to_string() }
fn default_id_case_width() -> u8 { ID_CASE_WIDTH }

/// Settings for one unit map run, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UcmConfig {
    /// Crop polygons; the unit map is derived from a copy of this layer.
    pub crop: Option<PathBuf>,
    pub soil: Option<PathBuf>,
    pub meteo: Option<PathBuf>,
    /// Output shapefile of the unit map.
    pub output: Option<PathBuf>,

    /// Crop identifier field of the crop layer.
    #[serde(default = "default_id_crop")]
    pub id_crop: String,
    /// Soil identifier field of the soil layer.
    #[serde(default = "default_id_soil")]
    pub id_soil: String,
    /// Meteo identifier field of the meteo layer.
    #[serde(default = "default_id_meteo")]
    pub id_meteo: String,

    /// Raster cell size in layer units.
    #[serde(default)]
    pub cell_size: Option<f64>,
    #[serde(default = "default_id_case_width")]
    pub id_case_width: u8,

    /// SQLite database receiving the unit list.
    #[serde(default)]
    pub units_db: Option<PathBuf>,
    /// CSV file receiving the unit list.
    #[serde(default)]
    pub units_csv: Option<PathBuf>,
}

impl Default for UcmConfig {
    fn default() -> Self {
        Self {
            crop: None,
            soil: None,
            meteo: None,
            output: None,
            id_crop: default_id_crop(),
            id_soil: default_id_soil(),
            id_meteo: default_id_meteo(),
            cell_size: None,
            id_case_width: default_id_case_width(),
            units_db: None,
            units_csv: None,
        }
    }
}

impl UcmConfig {
    /// Read a config file. Relative paths inside it are taken relative to
    /// the file's directory.
    pub fn read_from_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| UcmError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| UcmError::Config(format!("cannot parse {}: {e}", path.display())))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let paths = [
            &mut self.crop,
            &mut self.soil,
            &mut self.meteo,
            &mut self.output,
            &mut self.units_db,
            &mut self.units_csv,
        ];
        for path in paths.into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Check that every setting needed for a build is present and sane.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("crop", self.crop.is_none()),
            ("soil", self.soil.is_none()),
            ("meteo", self.meteo.is_none()),
            ("output", self.output.is_none()),
            ("cell_size", self.cell_size.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(UcmError::Config(format!("missing settings: {}", missing.join(", "))));
        }

        if let Some(cell_size) = self.cell_size.filter(|c| !c.is_finite() || *c <= 0.0) {
            return Err(UcmError::InvalidCellSize(cell_size));
        }

        for (key, name) in [("id_crop", &self.id_crop), ("id_soil", &self.id_soil), ("id_meteo", &self.id_meteo)] {
            if name.trim().is_empty() || name.len() > MAX_FIELD_NAME_LEN {
                return Err(UcmError::Config(format!("{key}: invalid field name {name:?}")));
            }
        }

        if self.id_case_width == 0 {
            return Err(UcmError::Config("id_case_width must be positive".into()));
        }
        Ok(())
    }
}
