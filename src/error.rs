use thiserror::Error;

/// Main error type for the library.
///
/// Ingestion, alignment and range errors are fatal to the evaluation call that
/// raised them: no partial table is ever returned alongside them.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Malformed, duplicated or non-monotonic input table.
    #[error("Ingestion error: {0}")]
    Ingestion(String),
    /// Zero-length or (anti)parallel correspondence vectors.
    #[error("Degenerate alignment: {0}")]
    DegenerateAlignment(String),
    /// Query outside of the ground-truth time bounds.
    #[error("Timestamp {timestamp} is out of the range [{first}, {last}]")]
    OutOfRange { timestamp: i64, first: i64, last: i64 },
    /// A stream that must have elements is empty.
    #[error("Empty input: {0}")]
    EmptyInput(String),
    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl EvalError {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        EvalError::InvalidParameter(msg.to_string())
    }

    pub fn ingestion<T: ToString>(msg: T) -> Self {
        EvalError::Ingestion(msg.to_string())
    }

    pub fn degenerate_alignment<T: ToString>(msg: T) -> Self {
        EvalError::DegenerateAlignment(msg.to_string())
    }

    pub fn empty_input<T: ToString>(msg: T) -> Self {
        EvalError::EmptyInput(msg.to_string())
    }
}
