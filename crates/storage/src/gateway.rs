use reqwest::Client;
use tracing::{debug, warn};

use cidrag_core::ChunkObject;

use crate::error::StorageError;
use crate::retry::RetryPolicy;

/// Fetches stored chunk objects over HTTP gateways.
///
/// Gateways are URL templates with `{cid}` and `{filename}` placeholders,
/// tried in order. Each gateway gets the full retry policy before the
/// fetcher falls through to the next one.
#[derive(Clone)]
pub struct GatewayFetcher {
    client: Client,
    gateways: Vec<String>,
    policy: RetryPolicy,
}

impl GatewayFetcher {
    pub fn new(client: Client, gateways: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            gateways,
            policy,
        }
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// Fetch `{cid}/{filename}` from the first gateway that answers.
    ///
    /// Returns `None` once every gateway has exhausted its retries.
    pub async fn fetch(&self, cid: &str, filename: &str) -> Option<ChunkObject> {
        for template in &self.gateways {
            let url = gateway_url(template, cid, filename);
            match self.policy.run(|_| self.fetch_once(&url)).await {
                Ok(object) => {
                    debug!(cid, url = %url, "fetched chunk from gateway");
                    return Some(object);
                }
                Err(e) => warn!(cid, url = %url, error = %e, "gateway failed, trying next"),
            }
        }

        warn!(cid, filename, gateways = self.gateways.len(), "all gateways failed");
        None
    }

    async fn fetch_once(&self, url: &str) -> Result<ChunkObject, StorageError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                service: "gateway",
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<ChunkObject>().await?)
    }
}

/// Fill a gateway template.
pub fn gateway_url(template: &str, cid: &str, filename: &str) -> String {
    template.replace("{cid}", cid).replace("{filename}", filename)
}
