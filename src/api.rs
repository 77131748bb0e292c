//! Boundary operations shared by the CLI and the HTTP transport.
//!
//! Requests deserialize with every field optional so that a missing field is
//! reported as a validation failure rather than a parse error. Every response
//! carries a `success` flag; failures carry a human-readable `message`.

use crate::index::NoteIndex;
use crate::models::{NoteId, SearchHit};
use crate::{Error, SearchOptions};
use serde::{Deserialize, Serialize};

/// Message for a missing or empty search query.
pub const MSG_QUERY_REQUIRED: &str = "Query parameter 'q' is required";
/// Message for an add/update request lacking a field.
pub const MSG_NOTE_FIELDS_REQUIRED: &str = "note_id, title and content required";
/// Message for a remove request lacking the id.
pub const MSG_NOTE_ID_REQUIRED: &str = "note_id required";
/// Message for a successful add.
pub const MSG_ADDED: &str = "Embedding added";
/// Message for a successful update.
pub const MSG_UPDATED: &str = "Embedding updated";
/// Message for a successful remove.
pub const MSG_REMOVED: &str = "Embedding removed";

/// Query string of a semantic search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchQuery {
    /// Free-text query.
    pub q: Option<String>,
    /// Per-request threshold override.
    pub threshold: Option<f32>,
    /// Per-request result cap override.
    pub limit: Option<usize>,
}

/// Body of an add or update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteRequest {
    /// Note id.
    pub note_id: Option<i64>,
    /// Note title.
    pub title: Option<String>,
    /// Note body.
    pub content: Option<String>,
}

/// Body of an add request.
pub type AddRequest = NoteRequest;

/// Body of an update request.
pub type UpdateRequest = NoteRequest;

/// Body of a remove request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoveRequest {
    /// Note id.
    pub note_id: Option<i64>,
}

/// One ranked result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matching note id.
    pub note_id: i64,
    /// Cosine similarity.
    pub similarity: f32,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            note_id: hit.note_id.get(),
            similarity: hit.similarity,
        }
    }
}

/// Successful search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Always `true`.
    pub success: bool,
    /// Hits in descending similarity order.
    pub results: Vec<SearchResult>,
}

/// Mutation response, also used as the failure shape of every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Outcome description.
    pub message: String,
}

impl MutationResponse {
    /// A successful response.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failure response.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Failure class of a boundary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent a bad request (400).
    Validation,
    /// The operation failed server-side (500).
    Internal,
}

/// A failed boundary operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Failure class.
    pub kind: ErrorKind,
    /// Message returned to the caller.
    pub message: String,
}

impl ApiError {
    /// A validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    /// The failure body returned to the caller.
    #[must_use]
    pub fn response(&self) -> MutationResponse {
        MutationResponse::failure(self.message.clone())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(message) => Self::validation(message),
            other => {
                tracing::error!(error = %other, "Request failed");
                Self {
                    kind: ErrorKind::Internal,
                    message: other.to_string(),
                }
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a boundary operation.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Ranks notes against `query.q`.
///
/// # Errors
///
/// Validation failure for a missing query; internal failure if encoding fails.
pub fn semantic_search(index: &NoteIndex, query: &SearchQuery) -> ApiResult<SearchResponse> {
    let text = non_empty(query.q.as_deref()).ok_or_else(|| ApiError::validation(MSG_QUERY_REQUIRED))?;

    let mut options: SearchOptions = *index.options();
    if let Some(threshold) = query.threshold {
        options = options.with_threshold(threshold);
    }
    if let Some(limit) = query.limit {
        options = options.with_max_results(limit);
    }

    let hits = index.search_text_with(text, &options)?;
    Ok(SearchResponse {
        success: true,
        results: hits.into_iter().map(SearchResult::from).collect(),
    })
}

/// Indexes a newly created note.
///
/// # Errors
///
/// Validation failure for a missing field; internal failure if encoding or
/// persisting fails.
pub fn add_note_embedding(index: &NoteIndex, request: &AddRequest) -> ApiResult<MutationResponse> {
    let (id, title, content) = note_fields(request)?;
    index.add(id, title, content)?;
    Ok(MutationResponse::ok(MSG_ADDED))
}

/// Re-indexes an edited note.
///
/// # Errors
///
/// Validation failure for a missing field; internal failure if encoding or
/// persisting fails.
pub fn update_note_embedding(
    index: &NoteIndex,
    request: &UpdateRequest,
) -> ApiResult<MutationResponse> {
    let (id, title, content) = note_fields(request)?;
    index.update(id, title, content)?;
    Ok(MutationResponse::ok(MSG_UPDATED))
}

/// Drops a note from the index. Unknown ids succeed.
///
/// # Errors
///
/// Validation failure for a missing id; internal failure if the delete fails.
pub fn remove_note_embedding(
    index: &NoteIndex,
    request: &RemoveRequest,
) -> ApiResult<MutationResponse> {
    let id = note_id(request.note_id).ok_or_else(|| ApiError::validation(MSG_NOTE_ID_REQUIRED))?;
    index.remove(id)?;
    Ok(MutationResponse::ok(MSG_REMOVED))
}

fn note_fields(request: &NoteRequest) -> ApiResult<(NoteId, &str, &str)> {
    match (
        note_id(request.note_id),
        non_empty(request.title.as_deref()),
        non_empty(request.content.as_deref()),
    ) {
        (Some(id), Some(title), Some(content)) => Ok((id, title, content)),
        _ => Err(ApiError::validation(MSG_NOTE_FIELDS_REQUIRED)),
    }
}

fn note_id(raw: Option<i64>) -> Option<NoteId> {
    raw.map(NoteId::new).filter(|id| id.is_valid())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
