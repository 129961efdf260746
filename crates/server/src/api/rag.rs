//! `/rag/upload` and `/rag/query`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use cidrag_core::config::IngestConfig;
use cidrag_core::ChunkObject;
use cidrag_ingest::{extract_html, extract_text, ExtractedDocument};

use crate::error::{ApiError, ErrorBody};
use crate::pipeline::UploadedChunk;
use crate::state::AppState;

// ── Request/Response types ────────────────────────

/// JSON upload body. Without `type` the server-side knowledge file is ingested.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UploadRequest {
    /// `text` or `url`; PDFs go through multipart.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub uploaded: Vec<UploadedChunk>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct QueryResponse {
    pub answer: String,
    #[schema(value_type = Vec<Object>)]
    pub context: Vec<ChunkObject>,
}

/// Where the text of an upload comes from.
#[derive(Debug, PartialEq)]
enum UploadSource {
    Text(String),
    Url(String),
    File {
        filename: String,
        bytes: Bytes,
        pdf: bool,
    },
    KnowledgeFile,
}

// ── POST /rag/upload ──────────────────────────────

/// Ingest text, a web page, an uploaded file, or the knowledge file
///
/// Accepts either a JSON body (`{"type":"text","content":..}`,
/// `{"type":"url","url":..}`, or `{}` for the knowledge file) or
/// multipart/form-data with a `file` field and optional `type=pdf`.
#[utoipa::path(
    post,
    path = "/rag/upload",
    tag = "RAG",
    request_body(content = UploadRequest, description = "JSON body, or multipart/form-data with `type` and `file` fields"),
    responses(
        (status = 200, description = "Chunks stored and indexed, in source order", body = UploadResponse),
        (status = 400, description = "Bad input or no extractable text", body = ErrorBody),
        (status = 500, description = "Embedding, storage or indexing failed", body = ErrorBody)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UploadResponse>, ApiError> {
    let source = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        parse_json_body(&body)?
    };

    let ingest = &state.config.ingest;
    let (text, chunk_size) = match source {
        UploadSource::Text(content) => (content, ingest.text_chunk_size),
        UploadSource::Url(raw) => {
            let timeout = Duration::from_millis(ingest.url_fetch_timeout_ms);
            let (url, html) = fetch_page(&state.http, &raw, timeout).await?;
            let doc = extract_html(&html, url.as_str())
                .map_err(|e| ApiError::bad_request(format!("Text extraction failed: {e}")))?;
            (doc.full_text(), ingest.url_chunk_size)
        }
        UploadSource::File { filename, bytes, pdf } => {
            let doc = extract_blocking(bytes, extraction_name(&filename, pdf)).await?;
            let size = file_chunk_size(&doc.file_type, ingest);
            (doc.full_text(), size)
        }
        UploadSource::KnowledgeFile => {
            let path = &state.config.storage.knowledge_file;
            let doc = read_knowledge_file(path).await?;
            (doc.full_text(), ingest.text_chunk_size)
        }
    };

    if text.trim().is_empty() {
        return Err(ApiError::bad_request("No extractable text in upload"));
    }
    info!("upload: {} chars, chunk_size={}", text.chars().count(), chunk_size);

    let uploaded = state.pipeline.ingest_text(&text, chunk_size).await?;
    Ok(Json(UploadResponse { uploaded }))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn parse_json_body(body: &[u8]) -> Result<UploadSource, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UploadSource::KnowledgeFile);
    }
    let request: UploadRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;

    match request.kind.as_deref() {
        None => Ok(UploadSource::KnowledgeFile),
        Some("text") => request
            .content
            .map(UploadSource::Text)
            .ok_or_else(|| ApiError::bad_request("Missing 'content' for type 'text'")),
        Some("url") => request
            .url
            .map(UploadSource::Url)
            .ok_or_else(|| ApiError::bad_request("Missing 'url' for type 'url'")),
        Some("pdf") => Err(ApiError::bad_request(
            "PDF uploads must be multipart/form-data with a 'file' field",
        )),
        Some(other) => Err(ApiError::bad_request(format!("Unsupported upload type '{other}'"))),
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadSource, ApiError> {
    let mut kind: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), format!("Multipart error: {}", e.body_text())))?
    {
        match field.name() {
            Some("type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                kind = Some(value.trim().to_string());
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or(UNNAMED_UPLOAD).to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), format!("Failed to read file: {}", e.body_text())))?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let pdf = match kind.as_deref() {
        None | Some("") | Some("file") | Some("text") => false,
        Some("pdf") => true,
        Some(other) => return Err(ApiError::bad_request(format!("Unsupported upload type '{other}'"))),
    };
    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    Ok(UploadSource::File { filename, bytes, pdf })
}

/// Stands in for a multipart file sent without a filename.
const UNNAMED_UPLOAD: &str = "upload.txt";

fn file_chunk_size(file_type: &str, ingest: &IngestConfig) -> usize {
    if file_type == "pdf" {
        ingest.pdf_chunk_size
    } else {
        ingest.text_chunk_size
    }
}

/// Name used to pick the extractor. A declared PDF without the extension still parses as PDF.
fn extraction_name(filename: &str, pdf: bool) -> String {
    if pdf && !filename.to_lowercase().ends_with(".pdf") {
        format!("{filename}.pdf")
    } else {
        filename.to_string()
    }
}

async fn extract_blocking(bytes: Bytes, filename: String) -> Result<ExtractedDocument, ApiError> {
    let doc = tokio::task::spawn_blocking(move || extract_text(&bytes, &filename))
        .await
        .map_err(|e| ApiError::internal(format!("Extraction task failed: {e}")))?
        .map_err(|e| ApiError::bad_request(format!("Text extraction failed: {e}")))?;
    info!(
        "extracted '{}' (type={}): {} pages, {} chars",
        doc.filename,
        doc.file_type,
        doc.pages.len(),
        doc.total_chars()
    );
    Ok(doc)
}

async fn read_knowledge_file(path: &Path) -> Result<ExtractedDocument, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ApiError::internal(format!("Failed to read knowledge file {}: {e}", path.display()))
    })?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("knowledge.txt")
        .to_string();
    extract_blocking(Bytes::from(bytes), filename).await
}

async fn fetch_page(client: &reqwest::Client, raw: &str, timeout: Duration) -> Result<(Url, String), ApiError> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::bad_request(format!("Invalid url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::bad_request(format!("Unsupported url scheme '{}'", url.scheme())));
    }

    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, format!("Failed to fetch {url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            format!("Fetching {url} returned {status}"),
        ));
    }
    let html = response
        .text()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, format!("Failed to read {url}: {e}")))?;
    info!("fetched {} ({} bytes)", url, html.len());
    Ok((url, html))
}

// ── POST /rag/query ───────────────────────────────

/// Answer a question from the nearest stored chunks
#[utoipa::path(
    post,
    path = "/rag/query",
    tag = "RAG",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Model answer and the context it was given", body = QueryResponse),
        (status = 400, description = "Missing question", body = ErrorBody),
        (status = 500, description = "Embedding or completion failed", body = ErrorBody),
        (status = 503, description = "LLM provider not configured", body = ErrorBody)
    )
)]
pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question is required"));
    }

    let answer = state.pipeline.answer_question(question).await?;
    Ok(Json(QueryResponse {
        answer: answer.answer,
        context: answer.context,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_untyped_json_means_knowledge_file() {
        assert_eq!(parse_json_body(b"").unwrap(), UploadSource::KnowledgeFile);
        assert_eq!(parse_json_body(b" \n").unwrap(), UploadSource::KnowledgeFile);
        assert_eq!(parse_json_body(b"{}").unwrap(), UploadSource::KnowledgeFile);
    }

    #[test]
    fn json_modes() {
        assert_eq!(
            parse_json_body(br#"{"type":"text","content":"Hi."}"#).unwrap(),
            UploadSource::Text("Hi.".into())
        );
        assert_eq!(
            parse_json_body(br#"{"type":"url","url":"https://example.com"}"#).unwrap(),
            UploadSource::Url("https://example.com".into())
        );
    }

    #[test]
    fn json_errors_are_client_errors() {
        for body in [
            &br#"{"type":"text"}"#[..],
            br#"{"type":"url"}"#,
            br#"{"type":"pdf"}"#,
            br#"{"type":"video","url":"x"}"#,
            b"not json",
        ] {
            let err = parse_json_body(body).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn declared_pdf_gets_pdf_extension() {
        assert_eq!(extraction_name("scan", true), "scan.pdf");
        assert_eq!(extraction_name("Report.PDF", true), "Report.PDF");
        assert_eq!(extraction_name("notes.md", false), "notes.md");
    }

    #[test]
    fn unnamed_uploads_parse_as_text_or_declared_pdf() {
        assert_eq!(extraction_name(UNNAMED_UPLOAD, false), "upload.txt");
        assert_eq!(extraction_name(UNNAMED_UPLOAD, true), "upload.txt.pdf");
    }

    #[test]
    fn pdfs_use_their_own_chunk_size() {
        let ingest = IngestConfig {
            text_chunk_size: 100,
            pdf_chunk_size: 7,
            url_chunk_size: 1000,
            concurrency: 1,
            url_fetch_timeout_ms: 1000,
        };
        assert_eq!(file_chunk_size("pdf", &ingest), 7);
        assert_eq!(file_chunk_size("md", &ingest), 100);
        assert_eq!(file_chunk_size("html", &ingest), 100);
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let client = reqwest::Client::new();
        let err = fetch_page(&client, "ftp://example.com/x", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = fetch_page(&client, "not a url", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
