//! Chroma vector database over its REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use cidrag_core::ChunkMetadata;

use crate::error::IndexError;
use crate::{IndexHit, VectorIndex};

const API_PREFIX: &str = "/api/v1";

pub struct ChromaIndex {
    client: Client,
    base_url: String,
    collection: String,
    /// Collection id, resolved by get-or-create on first use.
    collection_id: OnceCell<String>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [Vec<f32>; 1],
    metadatas: [&'a ChunkMetadata; 1],
}

/// Chroma answers one list per query embedding; we always send one.
#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl ChromaIndex {
    pub fn new(client: Client, base_url: &str, collection: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            collection_id: OnceCell::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn collection_id(&self) -> Result<&str, IndexError> {
        let id = self
            .collection_id
            .get_or_try_init(|| async move {
                let response = self
                    .client
                    .post(self.url("/collections"))
                    .json(&json!({ "name": self.collection, "get_or_create": true }))
                    .send()
                    .await?;
                let created: CollectionResponse = check(response).await?.json().await?;
                info!(collection = %self.collection, id = %created.id, "Chroma collection ready");
                Ok::<_, IndexError>(created.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Api {
        status: status.as_u16(),
        body,
    })
}

fn hits_from(response: QueryResponse) -> Vec<IndexHit> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| IndexHit {
            id,
            metadata: metadatas
                .get(i)
                .cloned()
                .flatten()
                .and_then(|v| serde_json::from_value(v).ok()),
            distance: distances.get(i).copied().flatten(),
        })
        .collect()
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn add(&self, id: &str, embedding: Vec<f32>, metadata: ChunkMetadata) -> Result<(), IndexError> {
        let collection_id = self.collection_id().await?;
        let request = AddRequest {
            ids: [id],
            embeddings: [embedding],
            metadatas: [&metadata],
        };

        let response = self
            .client
            .post(self.url(&format!("/collections/{collection_id}/add")))
            .json(&request)
            .send()
            .await?;
        check(response).await?;

        debug!(id, index = metadata.index, "indexed chunk in Chroma");
        Ok(())
    }

    async fn query(&self, embedding: Vec<f32>, top_k: usize) -> Result<Vec<IndexHit>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .post(self.url(&format!("/collections/{collection_id}/query")))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": top_k,
                "include": ["metadatas", "distances"],
            }))
            .send()
            .await?;

        let parsed: QueryResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))?;
        Ok(hits_from(parsed))
    }

    fn name(&self) -> &str {
        "chroma"
    }
}
