//! Answer Generator (C9): assembles a grounded prompt from retrieved chunks, calls the
//! configured LLM via `genai`, and extracts cited ordinals from the response.
//!
//! Grounded in the teacher's "load config once, operate repeatedly" shape
//! (`CrossEncoderScorer`) and its `genai::Client::exec_chat` call site
//! (`gateway::handler::chat_completions`).

pub mod error;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use tracing::{instrument, warn};

pub use error::GenerationError;

use crate::types::RetrievedChunk;

const SYSTEM_PROMPT: &str = "You answer strictly using the numbered sources provided below. \
Cite every claim with its source ordinal in square brackets, e.g. [1]. If the sources do not \
contain the answer, say so rather than inventing one.";

/// Abstraction over a chat-completion backend so the generator can be driven by a stub in
/// tests without reaching the network.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError>;
}

/// `genai`-backed chat completion, selecting the provider implicitly from `model`'s name.
pub struct GenaiLanguageModel {
    client: Client,
    model: String,
}

impl GenaiLanguageModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self { client: Client::default(), model: model.into() }
    }
}

#[async_trait]
impl LanguageModel for GenaiLanguageModel {
    #[instrument(skip(self, system, user))]
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)]);
        let options = ChatOptions::default()
            .with_temperature(temperature as f64)
            .with_max_tokens(max_tokens);

        let response = self
            .client
            .exec_chat(&self.model, request, Some(&options))
            .await
            .map_err(|e| GenerationError::GenerationFailed(e.to_string()))?;

        Ok(response.first_text().unwrap_or_default().to_string())
    }
}

/// A generated answer plus which supplied sources it actually cited.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    /// Parallel to the input `sources` slice; `true` at index `i` iff ordinal `i + 1` was cited.
    pub used: Vec<bool>,
    pub cited_ordinals: Vec<usize>,
}

/// Builds the grounded prompt, calls the language model, and parses bracketed-integer
/// citations out of the response.
pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
    model: String,
    temperature: f32,
    max_response_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, model: impl Into<String>, temperature: f32, max_response_tokens: u32) -> Self {
        Self { llm, model: model.into(), temperature, max_response_tokens }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Truncates `sources` to fit `token_budget`, approximating token count by whitespace word
    /// count (no tokenizer dependency needed for a soft budget).
    pub fn truncate_to_budget(sources: Vec<RetrievedChunk>, token_budget: usize) -> Vec<RetrievedChunk> {
        let mut used = 0usize;
        let mut kept = Vec::with_capacity(sources.len());
        for chunk in sources {
            let words = chunk.text.split_whitespace().count();
            if used > 0 && used + words > token_budget {
                break;
            }
            used += words;
            kept.push(chunk);
        }
        kept
    }

    fn build_user_prompt(query: &str, sources: &[RetrievedChunk]) -> String {
        let mut prompt = String::new();
        for (i, chunk) in sources.iter().enumerate() {
            let label = chunk
                .payload
                .url
                .clone()
                .unwrap_or_else(|| chunk.payload.source_path.clone());
            prompt.push_str(&format!("[{}] ({})\n{}\n\n", i + 1, label, chunk.text));
        }
        prompt.push_str(&format!("Question: {query}\n"));
        prompt
    }

    /// Extracts bracketed integers (`[1]`, `[2]`, ...) from `answer`, deduplicated and sorted.
    fn extract_citations(answer: &str) -> Vec<usize> {
        let mut found = HashSet::new();
        let bytes = answer.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'[' {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 1 && j < bytes.len() && bytes[j] == b']'
                    && let Ok(n) = answer[i + 1..j].parse::<usize>()
                {
                    found.insert(n);
                }
            }
            i += 1;
        }
        let mut ordinals: Vec<usize> = found.into_iter().collect();
        ordinals.sort_unstable();
        ordinals
    }

    /// Generates an answer grounded in `sources`, already truncated to the configured token
    /// budget. On LLM failure, returns `GenerationError::GenerationFailed`; callers should
    /// still surface `sources` to the caller even when this fails.
    #[instrument(skip(self, query, sources))]
    pub async fn generate(&self, query: &str, sources: &[RetrievedChunk]) -> Result<GeneratedAnswer, GenerationError> {
        let user_prompt = Self::build_user_prompt(query, sources);
        let answer = self
            .llm
            .complete(SYSTEM_PROMPT, &user_prompt, self.temperature, self.max_response_tokens)
            .await?;

        let cited_ordinals = Self::extract_citations(&answer);
        let used = if cited_ordinals.is_empty() && answer.is_empty() {
            warn!("generator returned empty answer with no citations");
            vec![true; sources.len()]
        } else if cited_ordinals.is_empty() {
            // Parsing found no bracketed citations at all; per contract, assume every
            // supplied source was used rather than marking the answer uncited.
            vec![true; sources.len()]
        } else {
            (1..=sources.len()).map(|ord| cited_ordinals.contains(&ord)).collect()
        };

        Ok(GeneratedAnswer { answer, used, cited_ordinals })
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;

    pub struct StubLanguageModel {
        pub response: String,
    }

    #[async_trait]
    impl LanguageModel for StubLanguageModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, GenerationError> {
            Ok(self.response.clone())
        }
    }

    pub struct FailingLanguageModel;

    #[async_trait]
    impl LanguageModel for FailingLanguageModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::GenerationFailed("stub failure".to_string()))
        }
    }
}
