use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetireTaxError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RetireTaxError {
    fn from(e: serde_json::Error) -> Self {
        RetireTaxError::SerializationError(e.to_string())
    }
}
