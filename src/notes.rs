//! Multi-document aggregation.
//!
//! [`NotesService`] owns the read-only document set and fans search calls
//! out across every configured endpoint, one concurrent task per document.
//! Tasks settle independently: a failing endpoint (network error, timeout,
//! bad payload, even a panicked task) becomes that document's `error` entry
//! and never disturbs its siblings. The aggregated output is always
//! re-assembled in configuration order, whatever order the tasks finish in.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::bound::TruncationPolicy;
use crate::config::{DocumentConfig, ServerConfig};
use crate::upstream::{
    FetchBlocksRequest, SearchBlocksRequest, SearchResult, UpstreamClient, UpstreamError,
};

/// Serialized-response limits shared by every tool handler.
#[derive(Debug, Clone)]
pub struct ResponseLimits {
    pub max_bytes: usize,
    pub policy: TruncationPolicy,
}

/// The aggregator: configured documents plus the upstream client.
///
/// Constructed once at startup and shared read-only across transports.
pub struct NotesService {
    documents: Vec<DocumentConfig>,
    upstream: UpstreamClient,
    limits: ResponseLimits,
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// Combined result of a fan-out search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAllResponse {
    pub query: String,
    pub case_sensitive: bool,
    /// Sum of result counts across successful documents only.
    pub total_results: usize,
    /// Always the full configured count, independent of how many succeeded.
    pub documents_searched: usize,
    /// One entry per configured document, in configuration order.
    pub results: Vec<DocumentOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DocumentError>,
}

/// Per-document outcome of a fan-out search. The enum makes "exactly one of
/// results or error" structurally impossible to violate.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DocumentOutcome {
    Hits {
        #[serde(rename = "documentName")]
        document_name: String,
        results: Vec<SearchResult>,
    },
    Failed {
        #[serde(rename = "documentName")]
        document_name: String,
        error: String,
    },
}

/// A failed document, collected into the top-level `errors` array.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentError {
    #[serde(rename = "documentName")]
    pub document_name: String,
    pub error: String,
}

/// Soft lookup failure: the named document is not configured. Returned as a
/// success-shaped payload so callers can discover the valid names.
#[derive(Debug, Serialize)]
pub struct UnknownDocument {
    pub error: String,
    #[serde(rename = "availableDocuments")]
    pub available_documents: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchDocumentOutcome {
    Unknown(UnknownDocument),
    Found {
        #[serde(rename = "documentName")]
        document_name: String,
        query: String,
        #[serde(rename = "caseSensitive")]
        case_sensitive: bool,
        #[serde(rename = "totalResults")]
        total_results: usize,
        results: Vec<SearchResult>,
    },
    Failed(DocumentError),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReadDocumentOutcome {
    Unknown(UnknownDocument),
    Found {
        #[serde(rename = "documentName")]
        document_name: String,
        #[serde(rename = "maxDepth", skip_serializing_if = "Option::is_none")]
        max_depth: Option<u32>,
        /// Raw upstream payload: a single block or a block array.
        blocks: Value,
    },
    Failed(DocumentError),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReadBlockOutcome {
    Unknown(UnknownDocument),
    Found {
        #[serde(rename = "documentName")]
        document_name: String,
        #[serde(rename = "blockId")]
        block_id: String,
        block: Value,
    },
    Failed {
        #[serde(rename = "documentName")]
        document_name: String,
        #[serde(rename = "blockId")]
        block_id: String,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentConfig>,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

impl NotesService {
    pub fn from_config(config: &ServerConfig) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;
        Ok(Self {
            documents: config.documents.clone(),
            upstream,
            limits: ResponseLimits {
                max_bytes: config.max_response_bytes,
                policy: config.truncation.clone(),
            },
        })
    }

    pub fn limits(&self) -> &ResponseLimits {
        &self.limits
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn list_documents(&self) -> ListDocumentsResponse {
        ListDocumentsResponse {
            documents: self.documents.clone(),
            count: self.documents.len(),
        }
    }

    /// Search every configured document concurrently and settle all outcomes.
    pub async fn search_all_notes(&self, query: &str, case_sensitive: bool) -> SearchAllResponse {
        let mut handles = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            let upstream = self.upstream.clone();
            let endpoint = doc.api_endpoint.clone();
            let request = SearchBlocksRequest {
                pattern: query.to_string(),
                case_sensitive,
                before_block_count: None,
                after_block_count: None,
            };
            let handle =
                tokio::spawn(async move { upstream.search_blocks(&endpoint, &request).await });
            handles.push((doc.name.clone(), handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut errors = Vec::new();
        let mut total_results = 0usize;

        // Handles are awaited in configuration order; the tasks themselves
        // have been running concurrently since the spawn loop above.
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(mut hits)) => {
                    for hit in &mut hits {
                        hit.document_name = Some(name.clone());
                    }
                    total_results += hits.len();
                    DocumentOutcome::Hits {
                        document_name: name,
                        results: hits,
                    }
                }
                Ok(Err(err)) => {
                    warn!(document = %name, error = %err, "per-document search failed");
                    record_failure(name, err.to_string(), &mut errors)
                }
                Err(join_err) => {
                    warn!(document = %name, error = %join_err, "search task did not complete");
                    record_failure(name, format!("search task failed: {join_err}"), &mut errors)
                }
            };
            results.push(outcome);
        }

        SearchAllResponse {
            query: query.to_string(),
            case_sensitive,
            total_results,
            documents_searched: self.documents.len(),
            results,
            errors,
        }
    }

    /// Search a single named document.
    pub async fn search_document(
        &self,
        document_name: &str,
        query: &str,
        case_sensitive: bool,
    ) -> SearchDocumentOutcome {
        let Some(doc) = self.lookup(document_name) else {
            return SearchDocumentOutcome::Unknown(self.unknown(document_name));
        };

        let request = SearchBlocksRequest {
            pattern: query.to_string(),
            case_sensitive,
            before_block_count: None,
            after_block_count: None,
        };

        match self.upstream.search_blocks(&doc.api_endpoint, &request).await {
            Ok(mut hits) => {
                for hit in &mut hits {
                    hit.document_name = Some(doc.name.clone());
                }
                SearchDocumentOutcome::Found {
                    document_name: doc.name.clone(),
                    query: query.to_string(),
                    case_sensitive,
                    total_results: hits.len(),
                    results: hits,
                }
            }
            Err(err) => {
                warn!(document = %doc.name, error = %err, "document search failed");
                SearchDocumentOutcome::Failed(DocumentError {
                    document_name: doc.name.clone(),
                    error: err.to_string(),
                })
            }
        }
    }

    /// Read a document's root block tree.
    pub async fn read_document(
        &self,
        document_name: &str,
        max_depth: Option<u32>,
    ) -> ReadDocumentOutcome {
        let Some(doc) = self.lookup(document_name) else {
            return ReadDocumentOutcome::Unknown(self.unknown(document_name));
        };

        let request = FetchBlocksRequest {
            id: None,
            max_depth,
            fetch_metadata: None,
        };

        match self.upstream.fetch_blocks(&doc.api_endpoint, &request).await {
            Ok(blocks) => ReadDocumentOutcome::Found {
                document_name: doc.name.clone(),
                max_depth,
                blocks,
            },
            Err(err) => {
                warn!(document = %doc.name, error = %err, "document read failed");
                ReadDocumentOutcome::Failed(DocumentError {
                    document_name: doc.name.clone(),
                    error: err.to_string(),
                })
            }
        }
    }

    /// Read a single block subtree by id.
    pub async fn read_block(&self, document_name: &str, block_id: &str) -> ReadBlockOutcome {
        let Some(doc) = self.lookup(document_name) else {
            return ReadBlockOutcome::Unknown(self.unknown(document_name));
        };

        let request = FetchBlocksRequest {
            id: Some(block_id.to_string()),
            max_depth: None,
            fetch_metadata: None,
        };

        match self.upstream.fetch_blocks(&doc.api_endpoint, &request).await {
            Ok(block) => ReadBlockOutcome::Found {
                document_name: doc.name.clone(),
                block_id: block_id.to_string(),
                block,
            },
            Err(err) => {
                warn!(document = %doc.name, block_id, error = %err, "block read failed");
                ReadBlockOutcome::Failed {
                    document_name: doc.name.clone(),
                    block_id: block_id.to_string(),
                    error: err.to_string(),
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&DocumentConfig> {
        self.documents.iter().find(|d| d.name == name)
    }

    fn unknown(&self, name: &str) -> UnknownDocument {
        UnknownDocument {
            error: format!("Document '{name}' not found"),
            available_documents: self.documents.iter().map(|d| d.name.clone()).collect(),
        }
    }
}

fn record_failure(
    document_name: String,
    error: String,
    errors: &mut Vec<DocumentError>,
) -> DocumentOutcome {
    errors.push(DocumentError {
        document_name: document_name.clone(),
        error: error.clone(),
    });
    DocumentOutcome::Failed {
        document_name,
        error,
    }
}
