use cidrag_core::Config;

use crate::pipeline::RagPipeline;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: Config,
    pub pipeline: RagPipeline,
    /// Shared client for fetching pages in URL uploads.
    pub http: reqwest::Client,
}
