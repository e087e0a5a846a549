use crate::error::CnabError;

use log::debug;
use std::env;
use std::path::Path;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_FILE_SIZE_ENV: &str = "CNAB_MAX_FILE_SIZE";

/// Checks a file has to pass before its text reaches the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Default policy, with the size limit taken from `CNAB_MAX_FILE_SIZE`
    /// when it holds a valid byte count.
    pub fn from_env() -> Self {
        match env::var(MAX_FILE_SIZE_ENV).ok().and_then(|v| v.trim().parse().ok()) {
            Some(max_file_size) => Self::new(max_file_size),
            None => Self::default(),
        }
    }

    pub fn check(&self, name: &str, size: u64) -> Result<(), CnabError> {
        if size > self.max_file_size {
            return Err(CnabError::FileTooLarge {
                name: name.to_string(),
                max_bytes: self.max_file_size,
            });
        }

        if !name.to_lowercase().ends_with(".txt") {
            return Err(CnabError::InvalidExtension(name.to_string()));
        }

        Ok(())
    }
}

fn read_error(name: &str) -> impl FnOnce(std::io::Error) -> CnabError + '_ {
    move |source| CnabError::Read {
        name: name.to_string(),
        source,
    }
}

/// Checks and reads a file synchronously. Invalid UTF-8 is replaced, not rejected.
pub fn read_file_sync(path: &str, policy: &UploadPolicy) -> Result<String, CnabError> {
    let size = std::fs::metadata(path).map_err(read_error(path))?.len();
    policy.check(file_name(path), size)?;

    let bytes = std::fs::read(path).map_err(read_error(path))?;
    debug!("Read {} bytes from {}", bytes.len(), path);

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Async counterpart of [`read_file_sync`], for reading several files at once.
pub async fn read_file(path: &str, policy: &UploadPolicy) -> Result<String, CnabError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(read_error(path))?
        .len();
    policy.check(file_name(path), size)?;

    let bytes = tokio::fs::read(path).await.map_err(read_error(path))?;
    debug!("Read {} bytes from {}", bytes.len(), path);

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
