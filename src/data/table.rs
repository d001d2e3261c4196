use crate::error::{Result, SpectrifyError};

use super::model::{Column, EventTable};

/// Attach newly computed columns to an event table.
///
/// Returns a new table; the input is left untouched. Row count and order are
/// preserved, existing columns are never overwritten.
pub fn append_cols(table: &EventTable, names: &[&str], data: Vec<Column>) -> Result<EventTable> {
    if names.len() != data.len() {
        return Err(SpectrifyError::ColumnLength {
            name: "<appended columns>".to_string(),
            got: data.len(),
            expected: names.len(),
        });
    }
    let mut out = table.clone();
    for (name, column) in names.iter().zip(data) {
        out.push_column(name, column)?;
    }
    Ok(out)
}
