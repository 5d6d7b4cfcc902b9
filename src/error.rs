use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid date `{input}`: {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("invalid interval: min={min}, max={max}")]
    InvalidInterval { min: i64, max: i64 },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
