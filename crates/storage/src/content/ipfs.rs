use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use cidrag_core::{ChunkObject, Cid};

use super::ContentStore;
use crate::error::StorageError;
use crate::gateway::GatewayFetcher;

/// Stores chunk objects on IPFS through a node's HTTP RPC API.
///
/// Each object is added inside a wrapping directory, so the returned CID
/// addresses the directory and the object lives at `{cid}/{filename}`.
/// Reads go through the public gateways.
pub struct IpfsContentStore {
    client: Client,
    api_url: String,
    api_token: Option<String>,
    fetcher: GatewayFetcher,
}

/// One line of the `/api/v0/add` response stream.
#[derive(Debug, Deserialize)]
struct AddEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsContentStore {
    pub fn new(client: Client, api_url: &str, api_token: Option<String>, fetcher: GatewayFetcher) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
            fetcher,
        }
    }

    fn add_url(&self) -> String {
        format!(
            "{}/api/v0/add?wrap-with-directory=true&cid-version=1",
            self.api_url
        )
    }
}

/// Pick the wrapping directory's CID out of an `add` response.
///
/// The node answers with newline-delimited JSON, one entry per added file
/// plus one with an empty name for the directory.
fn directory_cid(body: &str) -> Result<Cid, StorageError> {
    let entries = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str::<AddEntry>)
        .collect::<Result<Vec<_>, _>>()?;

    entries
        .iter()
        .find(|e| e.name.is_empty())
        .or_else(|| entries.last())
        .map(|e| e.hash.clone())
        .ok_or_else(|| StorageError::Other("IPFS add returned no entries".into()))
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    async fn put_json(&self, object: &ChunkObject, filename: &str) -> Result<Cid, StorageError> {
        let body = serde_json::to_vec(object)?;
        let part = Part::bytes(body)
            .file_name(filename.to_string())
            .mime_str("application/json")?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(self.add_url()).multipart(form);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        debug!(filename, "adding object to IPFS");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::Api {
                service: "ipfs",
                status: status.as_u16(),
                body: text,
            });
        }

        let cid = directory_cid(&text)?;
        info!(cid = %cid, filename, "stored chunk on IPFS");
        Ok(cid)
    }

    async fn get_json(&self, cid: &str, filename: &str) -> Result<Option<ChunkObject>, StorageError> {
        Ok(self.fetcher.fetch(cid, filename).await)
    }

    fn name(&self) -> &str {
        "ipfs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Multipart, Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use crate::retry::RetryPolicy;

    type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

    /// Minimal node: `add` keeps the upload in memory, the gateway serves it.
    async fn fake_node(require_token: Option<&'static str>) -> (String, Files) {
        let files: Files = Arc::default();
        let app = Router::new()
            .route(
                "/api/v0/add",
                post(
                    move |State(files): State<Files>,
                          Query(params): Query<HashMap<String, String>>,
                          headers: HeaderMap,
                          mut multipart: Multipart| async move {
                        if let Some(token) = require_token {
                            let expected = format!("Bearer {token}");
                            if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
                                return Err((StatusCode::UNAUTHORIZED, "missing token".to_string()));
                            }
                        }
                        assert_eq!(params.get("wrap-with-directory").map(String::as_str), Some("true"));
                        assert_eq!(params.get("cid-version").map(String::as_str), Some("1"));

                        let field = multipart.next_field().await.unwrap().unwrap();
                        let name = field.file_name().unwrap().to_string();
                        let data = field.bytes().await.unwrap().to_vec();
                        let dir = format!("bafydir{}", files.lock().unwrap().len());
                        files.lock().unwrap().insert(format!("{dir}/{name}"), data);

                        Ok(format!(
                            "{{\"Name\":\"{name}\",\"Hash\":\"bafyfile\",\"Size\":\"10\"}}\n{{\"Name\":\"\",\"Hash\":\"{dir}\",\"Size\":\"60\"}}\n"
                        ))
                    },
                ),
            )
            .route(
                "/ipfs/{cid}/{filename}",
                get(
                    |State(files): State<Files>, Path((cid, filename)): Path<(String, String)>| async move {
                        let stored = files.lock().unwrap().get(&format!("{cid}/{filename}")).cloned();
                        match stored {
                            Some(bytes) => Ok(Json(serde_json::from_slice::<ChunkObject>(&bytes).unwrap())),
                            None => Err(StatusCode::NOT_FOUND),
                        }
                    },
                ),
            )
            .with_state(files.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), files)
    }

    fn store_for(base: &str, token: Option<String>) -> IpfsContentStore {
        let fetcher = GatewayFetcher::new(
            Client::new(),
            vec![format!("{base}/ipfs/{{cid}}/{{filename}}")],
            RetryPolicy::new(1, Duration::ZERO, Duration::from_secs(2)),
        );
        IpfsContentStore::new(Client::new(), &format!("{base}/"), token, fetcher)
    }

    #[test]
    fn picks_directory_entry() {
        let body = "{\"Name\":\"chunk-0.json\",\"Hash\":\"bafyfile\",\"Size\":\"1\"}\n{\"Name\":\"\",\"Hash\":\"bafydir\",\"Size\":\"2\"}\n";
        assert_eq!(directory_cid(body).unwrap(), "bafydir");
    }

    #[test]
    fn empty_add_response_is_an_error() {
        assert!(directory_cid("\n").is_err());
        assert!(matches!(directory_cid("not json"), Err(StorageError::Serialize(_))));
    }

    #[tokio::test]
    async fn put_then_get_through_gateway() {
        let (base, files) = fake_node(None).await;
        let store = store_for(&base, None);

        let object = ChunkObject::for_index(0, "Sentence one. Sentence two.");
        let cid = store.put_json(&object, "chunk-0.json").await.unwrap();
        assert_eq!(cid, "bafydir0");

        let raw = files.lock().unwrap().get("bafydir0/chunk-0.json").cloned().unwrap();
        assert_eq!(raw, serde_json::to_vec(&object).unwrap());

        let fetched = store.get_json(&cid, "chunk-0.json").await.unwrap();
        assert_eq!(fetched, Some(object));
        assert_eq!(store.get_json("bafymissing", "chunk-0.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let (base, _) = fake_node(Some("secret")).await;

        let denied = store_for(&base, None)
            .put_json(&ChunkObject::for_index(1, "x"), "chunk-1.json")
            .await
            .unwrap_err();
        assert!(matches!(denied, StorageError::Api { status: 401, .. }));

        let cid = store_for(&base, Some("secret".into()))
            .put_json(&ChunkObject::for_index(1, "x"), "chunk-1.json")
            .await
            .unwrap();
        assert!(cid.starts_with("bafydir"));
    }
}
