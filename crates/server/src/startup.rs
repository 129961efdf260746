//! Server startup: connect every collaborator once and assemble `AppState`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use cidrag_core::Config;

use crate::app_config;
use crate::pipeline::{PipelineSettings, RagPipeline};
use crate::state::AppState;

pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("cidrag/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")?;

    let embedder = app_config::build_embedder(config)?;
    let question_embedder = app_config::question_embedder(config, embedder.clone());

    let content = cidrag_storage::content_store_from_config(config, http.clone())
        .context("initializing content store")?;
    let index = cidrag_index::index_from_config(config, http.clone())
        .await
        .context("initializing vector index")?;

    let answers = app_config::build_answer_generator(config);

    let pipeline = RagPipeline {
        embedder,
        question_embedder,
        content,
        index,
        answers,
        settings: PipelineSettings::from_config(config),
    };
    info!(
        batch_size = pipeline.settings.batch_size,
        concurrency = pipeline.settings.concurrency,
        top_k = pipeline.settings.top_k,
        "pipeline ready"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        pipeline,
        http,
    }))
}
