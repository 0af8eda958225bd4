//! Route handlers and the JSON error envelope.

use super::AppState;
use crate::error::{CapabilityError, ExtractError, IndexError};
use crate::extract;
use crate::llm::{self, CompletionRequest, Message, Provider};
use crate::prompts;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

const DEFAULT_COLLECTION: &str = "default";

/// JSON error envelope: `{"error": {"code": ..., "message": ...}}`.
pub(super) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        let status = match &err {
            IndexError::DimensionMismatch { .. } => StatusCode::CONFLICT,
            IndexError::InvalidDimension { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            IndexError::Capability(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            code: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<CapabilityError> for ApiError {
    fn from(err: CapabilityError) -> Self {
        let status = match &err {
            CapabilityError::MissingApiKey(_) | CapabilityError::UnknownProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            code: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        let status = match &err {
            ExtractError::UnsupportedFormat { .. } | ExtractError::Malformed { .. } => {
                StatusCode::BAD_REQUEST
            }
            ExtractError::FileRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request("INVALID_MULTIPART", err.to_string())
    }
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub(super) struct CollectionParams {
    collection: Option<String>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub collection: String,
    pub filename: String,
    pub chunks: usize,
}

/// One uploaded file, spooled to disk for the extractors.
struct SpooledUpload {
    filename: String,
    file: tempfile::NamedTempFile,
}

async fn spool_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<SpooledUpload, ApiError> {
    let filename = field
        .file_name()
        .map(|name| name.to_string())
        .ok_or_else(|| ApiError::bad_request("MISSING_FILENAME", "file part has no filename"))?;

    // Spool with the original extension so extractor dispatch works on the
    // temp path too.
    let suffix = Path::new(&filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let bytes = field.bytes().await?;
    let mut file = tempfile::Builder::new()
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "UPLOAD_SPOOL_FAILED",
            message: e.to_string(),
        })?;
    file.write_all(&bytes).map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "UPLOAD_SPOOL_FAILED",
        message: e.to_string(),
    })?;

    Ok(SpooledUpload { filename, file })
}

fn index_upload(
    state: &AppState,
    collection: &str,
    upload: &SpooledUpload,
) -> Result<usize, ApiError> {
    let extractor = extract::extractor_for(Path::new(&upload.filename))?;
    let document = extractor.extract(upload.file.path(), &upload.filename)?;

    // Called from spawn_blocking threads only; embedding is CPU-bound so the
    // write guard never parks a runtime worker.
    let mut engine = state.engine.blocking_write();
    Ok(engine.index_document(collection, &document.source, &document.content)?)
}

pub(super) async fn upload(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let collection = params
        .collection
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            upload = Some(spool_field(field).await?);
            break;
        }
    }
    let upload =
        upload.ok_or_else(|| ApiError::bad_request("MISSING_FILE", "no file part in request"))?;

    let chunks = {
        let state = state.clone();
        let collection = collection.clone();
        tokio::task::spawn_blocking(move || {
            let result = index_upload(&state, &collection, &upload);
            result.map(|chunks| (chunks, upload.filename))
        })
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "UPLOAD_FAILED",
            message: e.to_string(),
        })??
    };
    let (chunks, filename) = chunks;

    debug!(collection, filename, chunks, "upload indexed");
    Ok(Json(UploadResponse {
        message: format!("Indexed {chunks} chunks from '{filename}' into '{collection}'"),
        collection,
        filename,
        chunks,
    }))
}

#[derive(Serialize)]
pub(super) struct BatchFileResult {
    filename: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Uploads several files in one request. Per-file failures (unsupported
/// types, malformed archives) are reported in the result list instead of
/// failing the whole batch; capability failures still abort since nothing
/// later can succeed either.
pub(super) async fn upload_batch(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let collection = params
        .collection
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            uploads.push(spool_field(field).await?);
        }
    }
    if uploads.is_empty() {
        return Err(ApiError::bad_request(
            "MISSING_FILE",
            "no file parts in request",
        ));
    }

    let results = {
        let state = state.clone();
        let collection = collection.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<BatchFileResult>, ApiError> {
            let mut results = Vec::with_capacity(uploads.len());
            for upload in &uploads {
                match index_upload(&state, &collection, upload) {
                    Ok(chunks) => results.push(BatchFileResult {
                        filename: upload.filename.clone(),
                        status: "indexed",
                        chunks: Some(chunks),
                        detail: None,
                    }),
                    Err(err) if err.status == StatusCode::BAD_REQUEST => {
                        warn!(filename = %upload.filename, "skipping file: {}", err.message);
                        results.push(BatchFileResult {
                            filename: upload.filename.clone(),
                            status: "skipped",
                            chunks: None,
                            detail: Some(err.message),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "UPLOAD_FAILED",
            message: e.to_string(),
        })??
    };

    Ok(Json(json!({ "collection": collection, "files": results })))
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub collection: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

pub(super) async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request(
            "EMPTY_QUESTION",
            "question must not be empty",
        ));
    }

    let provider = request
        .provider
        .as_deref()
        .map(Provider::from_str)
        .transpose()?;

    let collection = request.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
    let top_k = state.settings.retrieval.top_k;

    let context = {
        let engine = state.engine.read().await;
        engine.answer_context(collection, &request.question, top_k)?
    };

    if context.is_empty() {
        return Ok(Json(AnswerResponse {
            answer: "No document content has been uploaded yet. Please upload documents first."
                .to_string(),
            sources: Vec::new(),
        }));
    }

    let sources = unique_sources(context.iter().map(|chunk| chunk.source.as_str()));
    let prompt = prompts::build_qa_prompt(&request.question, &context);
    let messages = [Message::user(prompt)];

    let client = llm::client_for(provider, request.model.clone(), &state.settings.llm)?;
    debug!(model = client.model(), collection, "requesting completion");

    let completion = client
        .complete(CompletionRequest {
            messages: &messages,
            system: Some(prompts::SYSTEM_PROMPT),
            temperature: state.settings.llm.temperature,
            max_tokens: state.settings.llm.max_tokens,
        })
        .await?;

    Ok(Json(AnswerResponse {
        answer: completion.content,
        sources,
    }))
}

/// Deduplicates source labels, keeping first-seen (ranking) order.
fn unique_sources<'a>(sources: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = Vec::new();
    for source in sources {
        if !seen.iter().any(|s| s == source) {
            seen.push(source.to_string());
        }
    }
    seen
}

pub(super) async fn collections(State(state): State<AppState>) -> Json<serde_json::Value> {
    let engine = state.engine.read().await;
    Json(json!({ "collections": engine.list_collections() }))
}

pub(super) async fn clear(
    State(state): State<AppState>,
    UrlPath(collection): UrlPath<String>,
) -> Json<serde_json::Value> {
    let existed = state.engine.write().await.clear(&collection);
    let message = if existed {
        format!("Cleared collection '{collection}'")
    } else {
        format!("Collection '{collection}' did not exist; nothing to clear")
    };
    Json(json!({ "message": message, "existed": existed }))
}

pub(super) async fn clear_all(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.engine.write().await.clear_all();
    Json(json!({
        "message": format!(
            "Cleared {} collections ({} chunks)",
            stats.collections, stats.chunks
        ),
        "collections": stats.collections,
        "chunks": stats.chunks,
    }))
}

/// Removes one document from a collection, or from every collection when the
/// collection segment is `*`.
pub(super) async fn remove_document(
    State(state): State<AppState>,
    UrlPath((collection, filename)): UrlPath<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut engine = state.engine.write().await;

    let removed = if collection == "*" {
        engine.remove_source_everywhere(&filename)?
    } else {
        if !engine.contains(&collection) {
            return Err(ApiError::not_found(format!(
                "Collection '{collection}' does not exist"
            )));
        }
        engine.remove_source(&collection, &filename)?
    };

    if removed == 0 {
        return Err(ApiError::not_found(format!(
            "Document '{filename}' not found"
        )));
    }

    Ok(Json(json!({
        "message": format!("Removed {removed} chunks of '{filename}'"),
        "removed_chunks": removed,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_deduplicated_in_ranking_order() {
        let sources = unique_sources(
            ["bob.txt", "alice.txt", "bob.txt", "carol.txt"]
                .into_iter(),
        );
        assert_eq!(sources, vec!["bob.txt", "alice.txt", "carol.txt"]);
    }

    #[test]
    fn extract_errors_map_to_client_or_server_status() {
        let err: ApiError = ExtractError::UnsupportedFormat {
            extension: "xlsx".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "UNSUPPORTED_FILE_TYPE");

        let err: ApiError = ExtractError::FileRead {
            path: "/tmp/x".into(),
            source: std::io::Error::other("disk gone"),
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn capability_errors_map_to_bad_gateway_except_caller_mistakes() {
        let err: ApiError = CapabilityError::Embedding("offline".into()).into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err: ApiError = CapabilityError::UnknownProvider("cohere".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = CapabilityError::MissingApiKey("OPENAI_API_KEY").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dimension_mismatch_is_a_conflict() {
        let err: ApiError = IndexError::DimensionMismatch {
            expected: 384,
            actual: 768,
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "DIMENSION_MISMATCH");
    }
}
