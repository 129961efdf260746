//! HTTP client for the cidrag server's `/rag/*` and `/health` endpoints.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use cidrag_core::ChunkObject;

pub struct ServerClient {
    base_url: String,
    http: reqwest::Client,
}

/// One stored chunk, as listed in an upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedChunk {
    pub cid: String,
    pub filename: String,
    pub preview: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    uploaded: Vec<UploadedChunk>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub context: Vec<ChunkObject>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ServerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("server not reachable at {}", self.base_url))?;
        read_json(resp).await
    }

    pub async fn add_text(&self, text: &str) -> Result<Vec<UploadedChunk>> {
        self.upload_json(json!({"type": "text", "content": text})).await
    }

    pub async fn add_url(&self, page: &str) -> Result<Vec<UploadedChunk>> {
        self.upload_json(json!({"type": "url", "url": page})).await
    }

    /// Ingest the knowledge file configured on the server.
    pub async fn add_knowledge_file(&self) -> Result<Vec<UploadedChunk>> {
        self.upload_json(json!({})).await
    }

    pub async fn add_pdf(&self, path: &Path) -> Result<Vec<UploadedChunk>> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.pdf")
            .to_string();

        let part = Part::bytes(bytes).file_name(filename).mime_str("application/pdf")?;
        let form = Form::new().text("type", "pdf").part("file", part);

        let url = format!("{}/rag/upload", self.base_url);
        debug!("uploading {} to {}", path.display(), url);
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("failed to upload PDF")?;
        let body: UploadResponse = read_json(resp).await?;
        Ok(body.uploaded)
    }

    pub async fn ask(&self, question: &str) -> Result<QueryAnswer> {
        let url = format!("{}/rag/query", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .await
            .context("failed to send question")?;
        read_json(resp).await
    }

    async fn upload_json(&self, body: serde_json::Value) -> Result<Vec<UploadedChunk>> {
        let url = format!("{}/rag/upload", self.base_url);
        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("failed to send upload")?;
        let body: UploadResponse = read_json(resp).await?;
        Ok(body.uploaded)
    }
}

/// Decode a success body, or turn the server's `{"error"}` into an error.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        bail!("server returned {}: {}", status, message);
    }
    resp.json().await.context("failed to parse server response")
}
