use thiserror::Error;

#[derive(Error, Debug)]
pub enum CidragError {
    #[error("not configured: {0}")]
    NotConfigured(String),
}
