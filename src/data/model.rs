use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrifyError};

// ---------------------------------------------------------------------------
// MetadataValue – a single header keyword value
// ---------------------------------------------------------------------------

/// A dynamically-typed header value mirroring the scalar keyword types found
/// in instrument headers.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integers, and floats with no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            MetadataValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a header value from its textual form.
    pub fn parse(s: &str) -> MetadataValue {
        if s.is_empty() {
            return MetadataValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetadataValue::Float(f);
        }
        if s == "true" || s == "false" {
            return MetadataValue::Bool(s == "true");
        }
        MetadataValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Header – keyword lookup by name
// ---------------------------------------------------------------------------

/// Header keywords of one table. Keys are case-insensitive (stored upper-case).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    entries: BTreeMap<String, MetadataValue>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: MetadataValue) {
        self.entries.insert(key.to_ascii_uppercase(), value);
    }

    /// Builder-style [`Header::insert`].
    pub fn with(mut self, key: &str, value: MetadataValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(&key.to_ascii_uppercase())
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.entries.remove(&key.to_ascii_uppercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.entries.iter()
    }

    /// Look up a keyword; a missing keyword is a hard failure.
    pub fn require(&self, key: &str) -> Result<&MetadataValue> {
        self.get(key)
            .ok_or_else(|| SpectrifyError::MissingKey(key.to_ascii_uppercase()))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| invalid(key, value, "a number"))
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| invalid(key, value, "a string"))
    }

    /// Integer keyword that must be a strictly positive pixel count.
    pub fn require_extent(&self, key: &str) -> Result<usize> {
        let value = self.require(key)?;
        match value.as_i64() {
            Some(n) if n > 0 => Ok(n as usize),
            _ => Err(invalid(key, value, "a positive pixel count")),
        }
    }
}

fn invalid(key: &str, value: &MetadataValue, expected: &'static str) -> SpectrifyError {
    SpectrifyError::InvalidKey {
        key: key.to_ascii_uppercase(),
        value: value.to_string(),
        expected,
    }
}

// ---------------------------------------------------------------------------
// Column / EventTable – the photon events of one exposure
// ---------------------------------------------------------------------------

/// One column of an event table.
///
/// Undefined values are `NaN` in float columns and `None` in integer columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Int(Vec<Option<i64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer column with every value defined.
    pub fn ints(values: impl IntoIterator<Item = i64>) -> Self {
        Column::Int(values.into_iter().map(Some).collect())
    }

    /// View the column as floats; undefined integers become `NaN`.
    pub fn as_f64(&self) -> Cow<'_, [f64]> {
        match self {
            Column::Float(v) => Cow::Borrowed(v),
            Column::Int(v) => Cow::Owned(
                v.iter()
                    .map(|i| i.map(|i| i as f64).unwrap_or(f64::NAN))
                    .collect(),
            ),
        }
    }
}

/// Column-oriented photon event table for one exposure.
///
/// Row order is significant: every annotation is positional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub header: Header,
    columns: Vec<(String, Column)>,
}

impl EventTable {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            columns: Vec::new(),
        }
    }

    /// Add a column, checking that it matches the table's row count.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self> {
        self.push_column(name, column)?;
        Ok(self)
    }

    pub(crate) fn push_column(&mut self, name: &str, column: Column) -> Result<()> {
        if self.column(name).is_some() {
            return Err(SpectrifyError::DuplicateColumn(name.to_string()));
        }
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(SpectrifyError::ColumnLength {
                    name: name.to_string(),
                    got: column.len(),
                    expected: first.len(),
                });
            }
        }
        self.columns.push((name.to_string(), column));
        Ok(())
    }

    /// Replace the data of an existing column, keeping its position.
    pub(crate) fn replace_column(&mut self, name: &str, column: Column) -> Result<()> {
        let expected = self.len();
        let slot = self
            .columns
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| SpectrifyError::MissingColumn(name.to_string()))?;
        if column.len() != expected {
            return Err(SpectrifyError::ColumnLength {
                name: name.to_string(),
                got: column.len(),
                expected,
            });
        }
        slot.1 = column;
        Ok(())
    }

    /// Number of photon events.
    pub fn len(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column lookup by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| c)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| SpectrifyError::MissingColumn(name.to_string()))
    }

    /// Column values as floats.
    pub fn float_column(&self, name: &str) -> Result<Cow<'_, [f64]>> {
        Ok(self.require_column(name)?.as_f64())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }
}

// ---------------------------------------------------------------------------
// SpectralOrder / OrderTable – calibrated reference spectrum of the exposure
// ---------------------------------------------------------------------------

/// One row of the extracted 1-D spectrum: a single spectral order.
///
/// Every profile is sampled once per reference-grid column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralOrder {
    /// Instrument-defined order number.
    pub sporder: i64,
    /// Detector segment name (COS NUV stripes carry one per row).
    #[serde(default)]
    pub segment: Option<String>,
    /// Trace position (extraction location) per reference column.
    #[serde(default)]
    pub extrlocy: Vec<f64>,
    /// Wavelength per reference column.
    pub wavelength: Vec<f64>,
    /// Quality flags per reference column.
    #[serde(default)]
    pub dq: Option<Vec<i64>>,
    /// Calibrated flux per reference column.
    #[serde(default)]
    pub flux: Option<Vec<f64>>,
    /// Net count rate per reference column.
    #[serde(default)]
    pub net: Option<Vec<f64>>,
}

/// The per-exposure order reference table. Read-only for the annotators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTable {
    pub header: Header,
    pub orders: Vec<SpectralOrder>,
}

impl OrderTable {
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let header = Header::new().with("Detector", MetadataValue::String("FUV".into()));
        assert_eq!(header.require_str("DETECTOR").unwrap(), "FUV");
        assert_eq!(header.require_str("detector").unwrap(), "FUV");
    }

    #[test]
    fn missing_key_is_an_error() {
        let header = Header::new();
        match header.require_f64("tscal1") {
            Err(SpectrifyError::MissingKey(k)) => assert_eq!(k, "TSCAL1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_type_is_reported() {
        let header = Header::new().with("AXLEN1", MetadataValue::String("wide".into()));
        assert!(matches!(
            header.require_extent("axlen1"),
            Err(SpectrifyError::InvalidKey { .. })
        ));
    }

    #[test]
    fn parse_guesses_scalar_types() {
        assert_eq!(MetadataValue::parse("2048"), MetadataValue::Integer(2048));
        assert_eq!(MetadataValue::parse("1.25e-4"), MetadataValue::Float(1.25e-4));
        assert_eq!(MetadataValue::parse("true"), MetadataValue::Bool(true));
        assert_eq!(MetadataValue::parse("FUVA"), MetadataValue::String("FUVA".into()));
        assert_eq!(MetadataValue::parse(""), MetadataValue::Null);
    }

    #[test]
    fn column_length_is_enforced() {
        let table = EventTable::new(Header::new())
            .with_column("time", Column::Float(vec![0.0, 1.0]))
            .unwrap();
        let err = table
            .clone()
            .with_column("axis1", Column::Float(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, SpectrifyError::ColumnLength { got: 1, expected: 2, .. }));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn int_column_reads_as_float_with_nan() {
        let col = Column::Int(vec![Some(3), None]);
        let v = col.as_f64();
        assert_eq!(v[0], 3.0);
        assert!(v[1].is_nan());
    }
}
