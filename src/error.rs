use crate::submission::ValidationErrors;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CnabError {
    #[error("File '{name}' exceeds the maximum size of {}MB", megabytes(.max_bytes))]
    FileTooLarge { name: String, max_bytes: u64 },

    #[error("File '{0}' is not a valid CNAB file")]
    InvalidExtension(String),

    #[error("Could not read file '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Internal server error")]
    Persistence,
}
