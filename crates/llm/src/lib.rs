pub mod answer;
pub mod provider;
pub mod providers;

pub use answer::{build_prompt, AnswerGenerator};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
