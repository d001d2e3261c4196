use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::model::{Column, EventTable, Header, MetadataValue, OrderTable, SpectralOrder};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a photon event table.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per event attribute, header keywords stored as
///   schema metadata
pub fn load_events(path: &Path) -> Result<EventTable> {
    match extension(path).as_str() {
        "parquet" | "pq" => load_events_parquet(path),
        other => bail!("Unsupported event table extension: .{other}"),
    }
}

/// Load an order reference table from JSON.
///
/// Expected layout:
///
/// ```json
/// {
///   "header": { "INSTRUME": "STIS", "ROOTNAME": "o5ko01010", "SIZAXIS1": 1024 },
///   "orders": [
///     { "sporder": 1, "extrlocy": [...], "wavelength": [...], "dq": [...] }
///   ]
/// }
/// ```
pub fn load_orders(path: &Path) -> Result<OrderTable> {
    let text = std::fs::read_to_string(path).context("reading order table JSON")?;
    let file: OrderFile = serde_json::from_str(&text).context("parsing order table JSON")?;

    let mut header = Header::new();
    for (key, val) in &file.header {
        header.insert(key, json_to_metadata(val));
    }
    Ok(OrderTable {
        header,
        orders: file.orders,
    })
}

/// Write an order reference table as JSON.
pub fn write_orders(path: &Path, orders: &OrderTable) -> Result<()> {
    let file = OrderFile {
        header: orders
            .header
            .iter()
            .map(|(k, v)| (k.clone(), metadata_to_json(v)))
            .collect(),
        orders: orders.orders.clone(),
    };
    let text = serde_json::to_string_pretty(&file).context("serialising order table")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// Write an event table to Parquet. Header keywords go to the schema metadata.
pub fn write_events(path: &Path, table: &EventTable) -> Result<()> {
    let metadata: HashMap<String, String> = table
        .header
        .iter()
        .map(|(k, v)| (k.clone(), metadata_to_text(v)))
        .collect();

    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for (name, column) in table.columns() {
        match column {
            Column::Float(v) => {
                fields.push(Field::new(name, DataType::Float64, false));
                arrays.push(Arc::new(Float64Array::from(v.clone())));
            }
            Column::Int(v) => {
                fields.push(Field::new(name, DataType::Int64, true));
                arrays.push(Arc::new(Int64Array::from(v.clone())));
            }
        }
    }
    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Parquet event loader
// ---------------------------------------------------------------------------

/// Load a Parquet photon table.
///
/// Integer columns (any width, signed or not) load as [`Column::Int`] with
/// nulls kept as undefined; floating columns load as [`Column::Float`] with
/// nulls as `NaN`. Other column types are skipped. Record batches are
/// concatenated in file order.
fn load_events_parquet(path: &Path) -> Result<EventTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let mut header = Header::new();
    for (key, value) in builder.schema().metadata() {
        if key.starts_with("ARROW:") {
            continue;
        }
        header.insert(key, MetadataValue::parse(value));
    }

    let reader = builder.build().context("building parquet reader")?;
    let mut columns: Vec<(String, Column)> = Vec::new();
    let mut first_batch = true;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for (idx, field) in schema.fields().iter().enumerate() {
            let Some(chunk) = read_column(batch.column(idx))
                .with_context(|| format!("column '{}'", field.name()))?
            else {
                if first_batch {
                    warn!(
                        "skipping column '{}' of type {:?}",
                        field.name(),
                        field.data_type()
                    );
                }
                continue;
            };
            match columns.iter_mut().find(|(n, _)| n == field.name()) {
                Some((_, existing)) => extend_column(existing, chunk)
                    .with_context(|| format!("column '{}' changes type", field.name()))?,
                None => columns.push((field.name().clone(), chunk)),
            }
        }
        first_batch = false;
    }

    let mut table = EventTable::new(header);
    for (name, column) in columns {
        table = table.with_column(&name, column)?;
    }
    debug!("loaded {} events from {}", table.len(), path.display());
    Ok(table)
}

fn read_column(col: &ArrayRef) -> Result<Option<Column>> {
    let dt = col.data_type();
    if dt.is_floating() {
        let arr = cast(col, &DataType::Float64).context("casting to Float64")?;
        let arr = arr
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?;
        Ok(Some(Column::Float(
            arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        )))
    } else if dt.is_integer() {
        let arr = cast(col, &DataType::Int64).context("casting to Int64")?;
        let arr = arr
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?;
        Ok(Some(Column::Int(arr.iter().collect())))
    } else {
        Ok(None)
    }
}

fn extend_column(existing: &mut Column, chunk: Column) -> Result<()> {
    match (existing, chunk) {
        (Column::Float(a), Column::Float(b)) => a.extend(b),
        (Column::Int(a), Column::Int(b)) => a.extend(b),
        _ => bail!("mixed integer and floating record batches"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON order table helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct OrderFile {
    #[serde(default)]
    header: JsonMap<String, JsonValue>,
    orders: Vec<SpectralOrder>,
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

fn metadata_to_json(val: &MetadataValue) -> JsonValue {
    match val {
        MetadataValue::String(s) => JsonValue::String(s.clone()),
        MetadataValue::Integer(i) => JsonValue::from(*i),
        MetadataValue::Float(f) => JsonValue::from(*f),
        MetadataValue::Bool(b) => JsonValue::Bool(*b),
        MetadataValue::Null => JsonValue::Null,
    }
}

fn metadata_to_text(val: &MetadataValue) -> String {
    match val {
        MetadataValue::Null => String::new(),
        other => other.to_string(),
    }
}
