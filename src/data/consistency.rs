use crate::error::{Result, SpectrifyError};

use super::model::Header;

/// Keyword identifying the exposure a table belongs to.
const OBSERVATION_KEY: &str = "ROOTNAME";

/// Check that every header describes the same exposure.
///
/// All headers must carry `ROOTNAME`, and the values must agree
/// (case-insensitive, surrounding whitespace ignored).
pub fn same_obs(headers: &[&Header]) -> Result<()> {
    let mut reference: Option<String> = None;
    for (i, header) in headers.iter().enumerate() {
        let root = header
            .require_str(OBSERVATION_KEY)
            .map_err(|e| SpectrifyError::Consistency(format!("table {i}: {e}")))?
            .trim()
            .to_ascii_lowercase();
        match &reference {
            None => reference = Some(root),
            Some(r) if *r == root => {}
            Some(r) => {
                return Err(SpectrifyError::Consistency(format!(
                    "table {i} is from {root}, expected {r}"
                )))
            }
        }
    }
    Ok(())
}
