use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChemoprepError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compound lookup failed: {0}")]
    Lookup(String),

    #[error("Descriptor tool error: {0}")]
    Descriptor(String),

    #[error("Row alignment error at {stage}: expected {expected} rows, got {actual}")]
    Alignment {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChemoprepError>;
