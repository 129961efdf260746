//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers and their schemas into
//! one OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cidrag API",
        version = "0.1.0",
        description = "Retrieval-augmented question answering over content-addressed chunks.",
    ),
    tags(
        (name = "Health", description = "Liveness and wiring"),
        (name = "RAG", description = "Document ingestion and question answering"),
    ),
    paths(
        crate::api::health::health,
        crate::api::rag::upload,
        crate::api::rag::query,
    ),
    components(schemas(
        crate::api::health::HealthResponse,
        crate::api::rag::UploadRequest,
        crate::api::rag::UploadResponse,
        crate::api::rag::QueryRequest,
        crate::api::rag::QueryResponse,
        crate::pipeline::UploadedChunk,
        crate::error::ErrorBody,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        assert_eq!(paths, ["/health", "/rag/query", "/rag/upload"]);
    }
}
