//! Content-addressed chunk storage: the `ContentStore` trait with IPFS and
//! object_store backends, the gateway fetcher, and the retry policy both
//! read paths share.

pub mod backend;
pub mod content;
pub mod error;
pub mod gateway;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use cidrag_core::Config;

pub use backend::{LocalBackend, S3Backend, StorageBackend};
pub use content::{ContentStore, IpfsContentStore, ObjectContentStore};
pub use error::StorageError;
pub use gateway::GatewayFetcher;
pub use retry::{AttemptError, RetryError, RetryPolicy};

/// Retry policy configured for gateway and object reads.
pub fn retry_policy_from_config(config: &Config) -> RetryPolicy {
    RetryPolicy::new(
        config.content.gateway_max_attempts,
        Duration::from_millis(config.content.gateway_retry_delay_ms),
        Duration::from_millis(config.content.gateway_timeout_ms),
    )
}

/// Build the configured content store (`CONTENT_STORE=ipfs|local|s3`).
pub fn content_store_from_config(
    config: &Config,
    client: reqwest::Client,
) -> Result<Arc<dyn ContentStore>, StorageError> {
    let policy = retry_policy_from_config(config);

    let store: Arc<dyn ContentStore> = match config.content.backend.to_lowercase().as_str() {
        "ipfs" => {
            let fetcher = GatewayFetcher::new(client.clone(), config.content.gateways.clone(), policy);
            Arc::new(IpfsContentStore::new(
                client,
                &config.content.ipfs_api_url,
                config.content.ipfs_api_token.clone(),
                fetcher,
            ))
        }
        "local" => {
            let root = config.storage.data_dir.join("objects");
            let backend = StorageBackend::Local(LocalBackend::new(&root)?);
            Arc::new(ObjectContentStore::new(backend, policy))
        }
        "s3" => {
            let backend = StorageBackend::S3(S3Backend::new(&config.aws)?);
            Arc::new(ObjectContentStore::new(backend, policy))
        }
        other => {
            return Err(StorageError::NotConfigured(format!(
                "unknown CONTENT_STORE '{other}' (expected ipfs, local or s3)"
            )))
        }
    };

    info!(backend = store.name(), "content store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_local_store_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::for_profile("");
        config.content.backend = "local".into();
        config.storage.data_dir = tmp.path().to_path_buf();

        let store = content_store_from_config(&config, reqwest::Client::new()).unwrap();
        assert_eq!(store.name(), "local");
        assert!(tmp.path().join("objects").is_dir());
    }

    #[test]
    fn backend_name_is_case_insensitive() {
        let mut config = Config::for_profile("");
        config.content.backend = "IPFS".into();
        let store = content_store_from_config(&config, reqwest::Client::new()).unwrap();
        assert_eq!(store.name(), "ipfs");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = Config::for_profile("");
        config.content.backend = "floppy".into();
        let err = content_store_from_config(&config, reqwest::Client::new()).err().unwrap();
        assert!(matches!(err, StorageError::NotConfigured(_)));
    }

    #[test]
    fn retry_policy_follows_config() {
        let mut config = Config::for_profile("");
        config.content.gateway_max_attempts = 5;
        config.content.gateway_retry_delay_ms = 10;
        config.content.gateway_timeout_ms = 250;
        let policy = retry_policy_from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(10));
        assert_eq!(policy.attempt_timeout, Duration::from_millis(250));
    }
}
