use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};

use crate::error::{Result, UcmError};

/// Longest field name a dBASE header can hold.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Storage kind of a dbf attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
}

/// Schema entry of a dbf attribute column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub width: u8,
    pub decimals: u8,
}

impl FieldDef {
    /// Fixed-width text column.
    pub fn character(name: &str, width: u8) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Character, width, decimals: 0 }
    }

    /// Fixed-point numeric column.
    pub fn numeric(name: &str, width: u8, decimals: u8) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Numeric, width, decimals }
    }

    /// Same kind and width as `self`, under another name.
    pub fn renamed(&self, name: &str) -> Self {
        Self { name: name.to_string(), ..self.clone() }
    }

    /// Whether a column defined as `self` can store every value of a column
    /// defined as `other` without loss.
    pub fn holds(&self, other: &FieldDef) -> bool {
        self.kind == other.kind && self.width >= other.width && self.decimals >= other.decimals
    }

    /// Reject definitions that cannot be written to a dbf header.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_FIELD_NAME_LEN || !self.name.is_ascii() {
            return Err(UcmError::Schema(format!(
                "invalid field name {:?}: expected 1 to {MAX_FIELD_NAME_LEN} ASCII characters", self.name
            )));
        }
        if self.width == 0 {
            return Err(UcmError::Schema(format!("field {:?} has zero width", self.name)));
        }
        Ok(())
    }

    /// Null value matching the column kind.
    pub(crate) fn null_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Character => FieldValue::Character(None),
            FieldKind::Numeric => FieldValue::Numeric(None),
            FieldKind::Float => FieldValue::Float(None),
            FieldKind::Logical => FieldValue::Logical(None),
            FieldKind::Date => FieldValue::Date(None),
        }
    }

    /// Append this column to a dbf table builder.
    pub(crate) fn add_to(&self, builder: TableWriterBuilder) -> Result<TableWriterBuilder> {
        let name = FieldName::try_from(self.name.as_str())
            .map_err(|_| UcmError::Schema(format!("invalid dbf field name: {:?}", self.name)))?;
        Ok(match self.kind {
            FieldKind::Character => builder.add_character_field(name, self.width),
            FieldKind::Numeric => builder.add_numeric_field(name, self.width, self.decimals),
            FieldKind::Float => builder.add_float_field(name, self.width, self.decimals),
            FieldKind::Logical => builder.add_logical_field(name),
            FieldKind::Date => builder.add_date_field(name),
        })
    }

    /// Coerce a value read from disk into something this column can write back.
    pub(crate) fn coerce(&self, value: Option<FieldValue>) -> FieldValue {
        let Some(value) = value else { return self.null_value() };
        match (self.kind, value) {
            (FieldKind::Numeric, FieldValue::Integer(n)) => FieldValue::Numeric(Some(n as f64)),
            (FieldKind::Numeric, FieldValue::Double(n)) => FieldValue::Numeric(Some(n)),
            (FieldKind::Numeric, FieldValue::Currency(n)) => FieldValue::Numeric(Some(n)),
            (FieldKind::Numeric, FieldValue::Character(s)) => FieldValue::Numeric(s.and_then(|s| s.trim().parse().ok())),
            (FieldKind::Character, FieldValue::Memo(s)) => FieldValue::Character(Some(s)),
            (FieldKind::Character, FieldValue::Character(s)) => FieldValue::Character(s),
            (FieldKind::Character, other) => FieldValue::Character(Some(value_to_string(&other))),
            (_, other) => other,
        }
    }

    /// Parse text into a value for this column. Empty text becomes null.
    pub(crate) fn parse(&self, text: &str) -> Result<FieldValue> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.null_value());
        }
        let invalid = || UcmError::Schema(format!("cannot store {text:?} in {:?} field {:?}", self.kind, self.name));
        match self.kind {
            FieldKind::Character => Ok(FieldValue::Character(Some(self.fit(text)))),
            FieldKind::Numeric => text.parse::<f64>().map(|n| FieldValue::Numeric(Some(n))).map_err(|_| invalid()),
            FieldKind::Float => text.parse::<f32>().map(|n| FieldValue::Float(Some(n))).map_err(|_| invalid()),
            FieldKind::Logical => match text.to_ascii_uppercase().as_str() {
                "T" | "Y" | "TRUE" => Ok(FieldValue::Logical(Some(true))),
                "F" | "N" | "FALSE" => Ok(FieldValue::Logical(Some(false))),
                _ => Err(invalid()),
            },
            FieldKind::Date => Err(invalid()),
        }
    }

    /// Truncate text to the column width, on a char boundary.
    fn fit(&self, text: &str) -> String {
        let width = self.width as usize;
        if text.len() <= width {
            return text.to_string();
        }
        let mut end = width;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        log::warn!("[shape] value {text:?} truncated to {width} characters in field {}", self.name);
        text[..end].to_string()
    }
}

/// Resolved column position, valid only for the schema generation it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIndex {
    pub(crate) column: usize,
    pub(crate) generation: u64,
}

impl FieldIndex {
    /// Zero-based column position.
    #[inline] pub fn column(&self) -> usize { self.column }
}

/// Map a dbf header field type onto a writable column kind.
pub(crate) fn kind_from_dbase(field_type: dbase::FieldType) -> FieldKind {
    match field_type {
        dbase::FieldType::Numeric
        | dbase::FieldType::Integer
        | dbase::FieldType::Double
        | dbase::FieldType::Currency => FieldKind::Numeric,
        dbase::FieldType::Float => FieldKind::Float,
        dbase::FieldType::Logical => FieldKind::Logical,
        dbase::FieldType::Date => FieldKind::Date,
        _ => FieldKind::Character,
    }
}

/// Decimal places needed to write `values` back into a numeric column of `width`.
pub(crate) fn infer_decimals(values: impl Iterator<Item = f64>, width: u8) -> u8 {
    let mut int_digits = 1usize;
    let mut fractional = false;
    for v in values.filter(|v| v.is_finite()) {
        int_digits = int_digits.max(format!("{:.0}", v.trunc()).len());
        fractional |= v.fract() != 0.0;
    }
    if !fractional {
        return 0;
    }
    (width as usize).saturating_sub(int_digits + 1).min(6) as u8
}

/// Render a numeric value, without fractional digits when it is integral.
pub(crate) fn format_numeric(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Render any dbf value as trimmed text; nulls become the empty string.
pub(crate) fn value_to_string(value: &FieldValue) -> String {
    match value {
        FieldValue::Character(Some(s)) => s.trim().to_string(),
        FieldValue::Memo(s) => s.trim().to_string(),
        FieldValue::Numeric(Some(n)) => format_numeric(*n),
        FieldValue::Float(Some(n)) => format_numeric(*n as f64),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Double(n) | FieldValue::Currency(n) => format_numeric(*n),
        FieldValue::Logical(Some(b)) => if *b { "T" } else { "F" }.to_string(),
        FieldValue::Date(Some(d)) => format!("{:04}{:02}{:02}", d.year(), d.month(), d.day()),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => String::new(),
        other => format!("{other:?}"),
    }
}

/// Numeric reading of a dbf value; text is parsed when possible.
pub(crate) fn value_to_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(n) => n.map(f64::from),
        FieldValue::Integer(n) => Some(*n as f64),
        FieldValue::Double(n) | FieldValue::Currency(n) => Some(*n),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True for the null of every kind, and for blank text.
pub(crate) fn is_null(value: &FieldValue) -> bool {
    match value {
        FieldValue::Character(s) => s.as_deref().is_none_or(|s| s.trim().is_empty()),
        FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_render_without_trailing_zeros() {
        assert_eq!(format_numeric(-9999.0), "-9999");
        assert_eq!(format_numeric(12.0), "12");
        assert_eq!(format_numeric(2.5), "2.5");
        assert_eq!(value_to_string(&FieldValue::Numeric(None)), "");
        assert_eq!(value_to_string(&FieldValue::Character(Some(" C1  ".into()))), "C1");
    }

    #[test]
    fn holds_requires_same_kind_and_enough_room() {
        let narrow = FieldDef::character("ID_CASE", 4);
        let wide = FieldDef::character("ID_CASE", 20);
        assert!(wide.holds(&narrow));
        assert!(!narrow.holds(&wide));
        assert!(!FieldDef::numeric("ID_METEO", 20, 0).holds(&FieldDef::character("ID_METEO", 5)));
        assert!(!FieldDef::numeric("HA", 12, 0).holds(&FieldDef::numeric("HA", 12, 4)));
    }

    #[test]
    fn blank_text_counts_as_null() {
        assert!(is_null(&FieldValue::Character(Some("  ".into()))));
        assert!(is_null(&FieldValue::Numeric(None)));
        assert!(!is_null(&FieldValue::Character(Some("M1".into()))));
        assert!(!is_null(&FieldValue::Numeric(Some(0.0))));
    }

    #[test]
    fn character_parse_truncates_to_width() {
        let def = FieldDef::character("ID_CROP", 5);
        assert_eq!(def.parse("ABCDEFG").unwrap(), FieldValue::Character(Some("ABCDE".into())));
        assert_eq!(def.parse("  ").unwrap(), FieldValue::Character(None));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let def = FieldDef::character("NAME", 3);
        assert_eq!(def.parse("aéb").unwrap(), FieldValue::Character(Some("aé".into())));
    }

    #[test]
    fn numeric_parse_rejects_text() {
        let def = FieldDef::numeric("ID_METEO", 10, 0);
        assert_eq!(def.parse("-9999").unwrap(), FieldValue::Numeric(Some(-9999.0)));
        assert!(def.parse("M1").is_err());
    }

    #[test]
    fn coerce_maps_wide_numeric_types() {
        let def = FieldDef::numeric("HA", 12, 4);
        assert_eq!(def.coerce(Some(FieldValue::Integer(7))), FieldValue::Numeric(Some(7.0)));
        assert_eq!(def.coerce(Some(FieldValue::Double(1.5))), FieldValue::Numeric(Some(1.5)));
        assert_eq!(def.coerce(None), FieldValue::Numeric(None));
    }

    #[test]
    fn decimals_are_inferred_from_values() {
        assert_eq!(infer_decimals([1.0, 20.0].into_iter(), 10), 0);
        assert_eq!(infer_decimals([1.25, 300.5].into_iter(), 10), 6);
        assert_eq!(infer_decimals([1.25, 300.5].into_iter(), 6), 2);
    }

    #[test]
    fn field_names_are_validated() {
        assert!(FieldDef::character("ID_CASE", 20).validate().is_ok());
        assert!(FieldDef::character("TOO_LONG_NAME", 20).validate().is_err());
        assert!(FieldDef::character("", 20).validate().is_err());
        assert!(FieldDef::character("EMPTY", 0).validate().is_err());
    }
}
