use thiserror::Error;

/// Errors raised while annotating a photon event table.
///
/// Every variant is fatal for the exposure being processed: annotation is
/// all-or-nothing, so no partially annotated table is ever returned.
#[derive(Debug, Error)]
pub enum SpectrifyError {
    #[error("spectral annotation is not implemented for the {0} instrument")]
    UnsupportedInstrument(String),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("tables do not describe the same observation: {0}")]
    Consistency(String),

    #[error("numerical degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("header keyword '{0}' not found")]
    MissingKey(String),

    #[error("header keyword '{key}' has value '{value}', expected {expected}")]
    InvalidKey {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("column '{name}' has {got} rows, table has {expected}")]
    ColumnLength {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("profile has {values} values for a grid of {grid} pixels")]
    ProfileLength { grid: usize, values: usize },

    #[error("flux calibration failed: {0}")]
    Calibration(String),
}

pub type Result<T> = std::result::Result<T, SpectrifyError>;
