use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributionError {
    /// Malformed or incomplete input, reported before any computation.
    #[error("Invalid input{}: {field}: {reason}", describe_row(.row))]
    Validation {
        row: Option<usize>,
        field: String,
        reason: String,
    },

    /// Arithmetic produced a non-finite effect from finite inputs.
    #[error("Computation failure: {0}")]
    Computation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Narrative summary failed: {0}")]
    Narrative(String),
}

impl AttributionError {
    pub fn validation(
        row: Option<usize>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AttributionError::Validation {
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Row index carried by a validation failure, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            AttributionError::Validation { row, .. } => *row,
            _ => None,
        }
    }
}

fn describe_row(row: &Option<usize>) -> String {
    match row {
        Some(r) => format!(" at row {r}"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(e: serde_json::Error) -> Self {
        AttributionError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for AttributionError {
    fn from(e: std::io::Error) -> Self {
        AttributionError::Io(e.to_string())
    }
}

#[cfg(feature = "csv")]
impl From<csv::Error> for AttributionError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            AttributionError::Io(e.to_string())
        } else {
            AttributionError::Parse(e.to_string())
        }
    }
}

#[cfg(feature = "narrative")]
impl From<reqwest::Error> for AttributionError {
    fn from(e: reqwest::Error) -> Self {
        AttributionError::Narrative(e.to_string())
    }
}
