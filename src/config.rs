use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bound::TruncationPolicy;

/// Default timeout for upstream document API calls (30 seconds).
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Default serialized-response budget (1 MiB).
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// A single configured document: a caller-facing name and the base URL of
/// the block-store API serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub name: String,
    #[serde(rename = "apiEndpoint")]
    pub api_endpoint: String,
}

/// Server configuration loaded from environment variables.
///
/// Immutable once loaded; shared read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub documents: Vec<DocumentConfig>,
    pub upstream_timeout: Duration,
    pub max_response_bytes: usize,
    pub truncation: TruncationPolicy,
}

/// On-disk / in-env configuration document shape.
#[derive(Debug, Deserialize)]
struct DocumentsFile {
    documents: Vec<DocumentConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("neither NOTES_DOCUMENTS nor NOTES_DOCUMENTS_FILE is set")]
    MissingDocuments,
    #[error("cannot read NOTES_DOCUMENTS_FILE ({path}): {source}")]
    UnreadableFile {
        path: String,
        source: std::io::Error,
    },
    #[error("document configuration must be {{\"documents\": [{{name, apiEndpoint}}, ...]}}: {0}")]
    InvalidDocumentsJson(#[from] serde_json::Error),
    #[error("document configuration must contain at least one document")]
    EmptyDocuments,
    #[error("document entry {index} has an empty `{field}` field")]
    EmptyField { index: usize, field: &'static str },
    #[error("duplicate document name: {0}")]
    DuplicateName(String),
    #[error("{var} must be a positive integer")]
    InvalidNumber { var: &'static str },
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `NOTES_DOCUMENTS` — inline JSON `{"documents": [{name, apiEndpoint}, ...]}`
    /// - `NOTES_DOCUMENTS_FILE` — path to a JSON file with the same shape
    ///   (consulted only when `NOTES_DOCUMENTS` is unset)
    /// - `NOTES_UPSTREAM_TIMEOUT_SECS` (optional, default 30)
    /// - `NOTES_MAX_RESPONSE_BYTES` (optional, default 1048576)
    /// - `NOTES_TRUNCATION_FILL_PERCENT` (optional, default 90)
    /// - `NOTES_TRUNCATION_STRING_CHARS` (optional, default 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = match std::env::var("NOTES_DOCUMENTS") {
            Ok(inline) => inline,
            Err(_) => {
                let path = std::env::var("NOTES_DOCUMENTS_FILE")
                    .map_err(|_| ConfigError::MissingDocuments)?;
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::UnreadableFile { path, source })?
            }
        };

        let documents = serde_json::from_str::<DocumentsFile>(&raw)?.documents;
        validate_documents(&documents)?;

        let upstream_timeout = Duration::from_secs(env_u64(
            "NOTES_UPSTREAM_TIMEOUT_SECS",
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?);

        let max_response_bytes =
            env_u64("NOTES_MAX_RESPONSE_BYTES", DEFAULT_MAX_RESPONSE_BYTES as u64)? as usize;

        let mut truncation = TruncationPolicy::default();
        let fill_percent = env_u64("NOTES_TRUNCATION_FILL_PERCENT", 90)?;
        if fill_percent == 0 || fill_percent > 100 {
            return Err(ConfigError::InvalidNumber {
                var: "NOTES_TRUNCATION_FILL_PERCENT",
            });
        }
        truncation.fill_ratio = fill_percent as f64 / 100.0;
        truncation.max_string_chars =
            env_u64("NOTES_TRUNCATION_STRING_CHARS", 1000)? as usize;

        Ok(Self {
            documents,
            upstream_timeout,
            max_response_bytes,
            truncation,
        })
    }
}

fn validate_documents(documents: &[DocumentConfig]) -> Result<(), ConfigError> {
    if documents.is_empty() {
        return Err(ConfigError::EmptyDocuments);
    }

    let mut seen = std::collections::HashSet::new();
    for (index, doc) in documents.iter().enumerate() {
        if doc.name.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                index,
                field: "name",
            });
        }
        if doc.api_endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                index,
                field: "apiEndpoint",
            });
        }
        if !seen.insert(doc.name.as_str()) {
            return Err(ConfigError::DuplicateName(doc.name.clone()));
        }
    }

    Ok(())
}

fn env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidNumber { var });
            }
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}
