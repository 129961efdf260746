//! HTTP endpoint modules.

pub mod doc;
mod health;
mod rag;

pub use health::health;
pub use rag::{query, upload};
