use std::path::Path;

use shapefile::{self as shp, dbase::{self, Record, TableWriterBuilder}};

use crate::{common, error::{Result, UcmError}};
use super::{field::{FieldDef, FieldKind, infer_decimals, kind_from_dbase, value_to_f64}, layer::ShapeLayer};

/// Pseudo-column some dbase versions report ahead of the real fields.
const DELETION_FLAG: &str = "DeletionFlag";

impl ShapeLayer {
    /// Load every polygon and attribute record of the shapefile at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.with_extension("shp");
        let fail = |reason: String| UcmError::LayerOpen { path: path.clone(), reason };

        // Header field order and widths come from the dbf itself
        let infos = dbase::Reader::from_path(path.with_extension("dbf"))
            .map_err(|e| fail(e.to_string()))?
            .fields()
            .iter()
            .filter(|info| info.name() != DELETION_FLAG)
            .map(|info| (info.name().to_string(), kind_from_dbase(info.field_type()), info.length()))
            .collect::<Vec<_>>();

        let mut reader = shp::Reader::from_path(&path)
            .map_err(|e| fail(e.to_string()))?;

        let mut polygons = Vec::new();
        let mut raw_records: Vec<Record> = Vec::new();
        for (n, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = result.map_err(|e| fail(format!("record {n}: {e}")))?;
            let polygon = common::shape_to_polygon(shape)
                .ok_or_else(|| fail(format!("record {n} is not a polygon")))?;
            polygons.push(polygon);
            raw_records.push(record);
        }

        let fields = infos.into_iter()
            .map(|(name, kind, width)| {
                let decimals = match kind {
                    FieldKind::Numeric | FieldKind::Float => infer_decimals(
                        raw_records.iter().filter_map(|r| r.get(&name).and_then(value_to_f64)),
                        width,
                    ),
                    _ => 0,
                };
                FieldDef { name, kind, width, decimals }
            })
            .collect::<Vec<_>>();

        let records = raw_records.iter()
            .map(|record| fields.iter()
                .map(|field| field.coerce(record.get(&field.name).cloned()))
                .collect::<Vec<_>>())
            .collect::<Vec<_>>();

        log::debug!("[shape] opened {} ({} records, {} fields)", path.display(), records.len(), fields.len());

        Ok(Self {
            deleted: vec![false; records.len()],
            path,
            fields,
            polygons,
            records,
            generation: 0,
        })
    }

    /// Write geometry and attributes back to the layer path (.shp/.shx/.dbf).
    /// Deletion marks are not persisted; use [`ShapeLayer::compact`] to drop them.
    pub fn save(&self) -> Result<()> {
        let builder = self.fields.iter()
            .try_fold(TableWriterBuilder::new(), |builder, field| field.add_to(builder))?;

        let mut writer = shp::Writer::from_path(&self.path, builder)?;
        for (polygon, values) in self.polygons.iter().zip(&self.records) {
            let mut record = Record::default();
            for (field, value) in self.fields.iter().zip(values) {
                record.insert(field.name.clone(), value.clone());
            }
            writer.write_shape_and_record(polygon, &record)?;
        }
        drop(writer);

        log::debug!("[shape] saved {} ({} records)", self.path.display(), self.records.len());
        Ok(())
    }
}
