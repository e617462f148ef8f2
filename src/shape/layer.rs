use std::path::{Path, PathBuf};

use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use shapefile::{self as shp, dbase::FieldValue};

use crate::{common, error::{Result, UcmError}};
use super::field::{FieldDef, FieldIndex, is_null, value_to_f64, value_to_string};

/// An owned polygon layer with a dbf attribute table, loaded fully into memory.
///
/// Edits (field changes, attribute writes, deletion marks) stay in memory
/// until [`ShapeLayer::save`] or [`ShapeLayer::compact`] writes the layer back
/// to its path.
#[derive(Debug, Clone)]
pub struct ShapeLayer {
    pub(super) path: PathBuf,
    pub(super) fields: Vec<FieldDef>,
    pub(super) polygons: Vec<shp::Polygon>,
    pub(super) records: Vec<Vec<FieldValue>>,
    pub(super) deleted: Vec<bool>,
    pub(super) generation: u64,
}

impl ShapeLayer {
    /// Create an empty layer that will be saved at `path`.
    pub fn create(path: &Path, fields: Vec<FieldDef>) -> Result<Self> {
        for (i, field) in fields.iter().enumerate() {
            field.validate()?;
            if fields[..i].iter().any(|f| f.name.eq_ignore_ascii_case(&field.name)) {
                return Err(UcmError::Schema(format!("duplicate field {:?}", field.name)));
            }
        }
        Ok(Self {
            path: path.with_extension("shp"),
            fields,
            polygons: Vec::new(),
            records: Vec::new(),
            deleted: Vec::new(),
            generation: 0,
        })
    }

    /// Append a polygon with one text value per field (empty text is null).
    pub fn push_record(&mut self, polygon: &MultiPolygon<f64>, values: &[&str]) -> Result<usize> {
        if values.len() != self.fields.len() {
            return Err(UcmError::Schema(format!(
                "expected {} attribute values, got {}", self.fields.len(), values.len()
            )));
        }
        let record = self.fields.iter().zip(values)
            .map(|(field, value)| field.parse(value))
            .collect::<Result<Vec<_>>>()?;

        self.polygons.push(common::geo_to_shp(polygon));
        self.records.push(record);
        self.deleted.push(false);
        Ok(self.records.len() - 1)
    }

    /// Path of the backing `.shp` file.
    #[inline] pub fn path(&self) -> &Path { &self.path }

    /// Attribute schema, in column order.
    #[inline] pub fn fields(&self) -> &[FieldDef] { &self.fields }

    /// Number of records, including those marked for deletion.
    #[inline] pub fn record_count(&self) -> usize { self.records.len() }

    /// Check whether a field exists (case-insensitive, like dBASE).
    pub fn exist_field(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Resolve a field name to an index tied to the current schema generation.
    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.position(name).map(|column| FieldIndex { column, generation: self.generation })
    }

    /// Schema entry behind a resolved index.
    pub fn field_def(&self, index: &FieldIndex) -> Result<&FieldDef> {
        Ok(&self.fields[self.column(index)?])
    }

    /// Append a field; every existing record receives a null value.
    pub fn add_field(&mut self, def: FieldDef) -> Result<FieldIndex> {
        def.validate()?;
        if self.exist_field(&def.name) {
            return Err(UcmError::Schema(format!("field {:?} already exists", def.name)));
        }
        let null = def.null_value();
        for record in &mut self.records {
            record.push(null.clone());
        }
        self.fields.push(def);
        self.generation += 1;

        Ok(FieldIndex { column: self.fields.len() - 1, generation: self.generation })
    }

    /// Add `def` unless a field with that name exists.
    /// Returns the field index and whether the field pre-existed.
    pub fn ensure_field(&mut self, def: FieldDef) -> Result<(FieldIndex, bool)> {
        match self.field_index(&def.name) {
            Some(index) => Ok((index, true)),
            None => Ok((self.add_field(def)?, false)),
        }
    }

    /// Like [`ShapeLayer::ensure_field`], but an existing field that cannot
    /// hold the values of `def` is dropped and recreated from `def`, losing its
    /// contents. Returns the field index and whether the field was kept.
    pub fn fit_field(&mut self, def: FieldDef) -> Result<(FieldIndex, bool)> {
        let Some(index) = self.field_index(&def.name) else {
            return Ok((self.add_field(def)?, false));
        };
        let existing = self.field_def(&index)?;
        if existing.holds(&def) {
            return Ok((index, true));
        }

        log::warn!(
            "[shape] field {} ({:?}, width {}) cannot hold {:?} width {}; recreating it",
            existing.name, existing.kind, existing.width, def.kind, def.width
        );
        self.remove_field(&def.name)?;
        Ok((self.add_field(def)?, false))
    }

    /// Drop a field and its values from every record.
    pub fn remove_field(&mut self, name: &str) -> Result<()> {
        let column = self.position(name)
            .ok_or_else(|| UcmError::Schema(format!("field {name:?} not found")))?;
        self.fields.remove(column);
        for record in &mut self.records {
            record.remove(column);
        }
        self.generation += 1;
        Ok(())
    }

    /// Read an attribute as trimmed text; nulls read as the empty string.
    pub fn read_string(&self, record: usize, index: &FieldIndex) -> Result<String> {
        Ok(value_to_string(self.value(record, index)?))
    }

    /// Write text into an attribute, converted to the column kind.
    pub fn write_string(&mut self, record: usize, index: &FieldIndex, text: &str) -> Result<()> {
        let column = self.column(index)?;
        self.check_record(record)?;
        self.records[record][column] = self.fields[column].parse(text)?;
        Ok(())
    }

    /// Read a numeric attribute by field name. Returns `None` for nulls.
    pub fn read_numeric(&self, record: usize, name: &str) -> Result<Option<f64>> {
        let index = self.field_index(name)
            .ok_or_else(|| UcmError::Schema(format!("field {name:?} not found")))?;
        Ok(value_to_f64(self.value(record, &index)?))
    }

    /// Raw attribute value.
    pub(crate) fn value(&self, record: usize, index: &FieldIndex) -> Result<&FieldValue> {
        let column = self.column(index)?;
        self.check_record(record)?;
        Ok(&self.records[record][column])
    }

    /// Store a raw value, coerced to the column kind. A value the column
    /// cannot represent is an error rather than a null.
    pub(crate) fn write_value(&mut self, record: usize, index: &FieldIndex, value: FieldValue) -> Result<()> {
        let column = self.column(index)?;
        self.check_record(record)?;

        let field = &self.fields[column];
        let was_null = is_null(&value);
        let coerced = field.coerce(Some(value.clone()));
        if is_null(&coerced) && !was_null {
            return Err(UcmError::Schema(format!(
                "cannot store {value:?} in {:?} field {:?}", field.kind, field.name
            )));
        }
        self.records[record][column] = coerced;
        Ok(())
    }

    /// Mark a record for removal by the next [`ShapeLayer::compact`].
    pub fn mark_deleted(&mut self, record: usize) -> Result<()> {
        self.check_record(record)?;
        self.deleted[record] = true;
        Ok(())
    }

    #[inline]
    pub fn is_deleted(&self, record: usize) -> bool {
        self.deleted.get(record).copied().unwrap_or(false)
    }

    /// Number of records currently marked for deletion.
    pub fn deleted_count(&self) -> usize {
        self.deleted.iter().filter(|&&d| d).count()
    }

    /// Physically drop deleted records, then save. Returns the number removed.
    pub fn compact(&mut self) -> Result<usize> {
        let removed = self.deleted_count();
        if removed > 0 {
            let mut keep = self.deleted.iter().map(|&d| !d);
            self.polygons.retain(|_| keep.next().unwrap_or(true));
            let mut keep = self.deleted.iter().map(|&d| !d);
            self.records.retain(|_| keep.next().unwrap_or(true));
            self.deleted = vec![false; self.records.len()];
        }
        self.save()?;

        log::debug!("[shape] compacted {}: removed {removed}, kept {}", self.path.display(), self.records.len());
        Ok(removed)
    }

    /// Polygon geometry of a record.
    pub fn polygon(&self, record: usize) -> Result<MultiPolygon<f64>> {
        self.check_record(record)?;
        Ok(common::shp_to_geo(&self.polygons[record]))
    }

    /// Bounding rectangle of every record not marked for deletion.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.polygons.iter().zip(&self.deleted)
            .filter(|(_, deleted)| !**deleted)
            .filter_map(|(polygon, _)| common::shp_to_geo(polygon).bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }

    /// Case-insensitive column lookup.
    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Validate an index against the current schema generation.
    fn column(&self, index: &FieldIndex) -> Result<usize> {
        if index.generation != self.generation || index.column >= self.fields.len() {
            let name = self.fields.get(index.column).map_or_else(String::new, |f| f.name.clone());
            return Err(UcmError::StaleFieldIndex(name));
        }
        Ok(index.column)
    }

    fn check_record(&self, record: usize) -> Result<()> {
        if record >= self.records.len() {
            return Err(UcmError::RecordOutOfRange { index: record, count: self.records.len() });
        }
        Ok(())
    }
}
