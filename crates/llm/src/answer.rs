use tracing::{debug, info};

use cidrag_core::config::{LlmConfig, OllamaConfig};
use cidrag_core::ChunkObject;

use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

/// Answers questions with a chat model, optionally grounded in retrieved chunks.
pub struct AnswerGenerator {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build from config, creating the appropriate provider.
    pub fn from_config(llm_config: &LlmConfig, ollama_config: &OllamaConfig) -> Result<Self, LlmError> {
        let provider = create_provider(llm_config, ollama_config)?;
        Ok(Self::new(provider, llm_config.temperature, llm_config.max_tokens))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the model. With no context the question is sent on its own.
    pub async fn answer(&self, question: &str, context: &[ChunkObject]) -> Result<String, LlmError> {
        let prompt = build_prompt(question, context);
        info!(
            provider = self.provider.name(),
            context_chunks = context.len(),
            "generating answer"
        );
        debug!("prompt: {}", prompt);

        let answer = self
            .provider
            .complete(vec![Message::user(prompt)], self.temperature, self.max_tokens)
            .await?;
        Ok(answer)
    }
}

/// The single user prompt sent for a question.
pub fn build_prompt(question: &str, context: &[ChunkObject]) -> String {
    if context.is_empty() {
        return format!("Question: {question}\n\nAnswer:");
    }

    let knowledge = context
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following knowledge to answer the question:\n\nKnowledge: {knowledge}\n\nQuestion: {question}\n\nAnswer:"
    )
}
