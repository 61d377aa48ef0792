use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmError, LlmProvider, Message};
use crate::templates::{render_template, PromptTemplate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound for one generation call, including key lookup.
    pub timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// Result of one generation call that passed input validation.
#[derive(Debug)]
pub enum GenerationOutcome {
    Text(String),
    /// Holds `GenerationFailed` or `GenerationTimeout`.
    Failed(Error),
}

impl GenerationOutcome {
    pub fn is_text(&self) -> bool {
        matches!(self, GenerationOutcome::Text(_))
    }

    /// Generated text, or the deterministic fallback for a failed call.
    pub fn into_text(self, track_title: &str, composer: &str) -> String {
        match self {
            GenerationOutcome::Text(text) => text,
            GenerationOutcome::Failed(_) => fallback_text(track_title, composer),
        }
    }

    pub fn into_result(self) -> Result<String> {
        match self {
            GenerationOutcome::Text(text) => Ok(text),
            GenerationOutcome::Failed(err) => Err(err),
        }
    }
}

/// Text stored in place of a description that could not be generated.
pub fn fallback_text(track_title: &str, composer: &str) -> String {
    format!(
        "'{}' is a representative work by {}. A detailed description is not available yet.",
        track_title, composer
    )
}

/// Chat messages for one template and track.
pub fn build_messages(template: &PromptTemplate, track_title: &str, composer: &str) -> Vec<Message> {
    let body = render_template(&template.body, track_title, composer);
    let prompt = format!(
        "{}\n\n곡 제목: {}\n작곡가: {}",
        body.trim(),
        track_title,
        composer
    );
    vec![
        Message::system(template.system_instruction.clone()),
        Message::user(prompt),
    ]
}

/// Turns one (template, track) pair into description text via the provider.
pub struct DescriptionGenerator {
    provider: Arc<dyn LlmProvider>,
    settings: GeneratorSettings,
    tokens_used: AtomicU64,
}

impl DescriptionGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GeneratorSettings) -> Self {
        Self {
            provider,
            settings,
            tokens_used: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Tokens reported by the provider across every completed call so far.
    /// Calls whose response carried no usage count as zero.
    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    /// Generates one description.
    ///
    /// Only invalid input is returned as `Err`; provider failures and
    /// timeouts come back as [`GenerationOutcome::Failed`].
    pub async fn generate(
        &self,
        template: &PromptTemplate,
        track_title: &str,
        composer: &str,
    ) -> Result<GenerationOutcome> {
        let track_title = track_title.trim();
        let composer = composer.trim();
        if track_title.is_empty() || composer.is_empty() {
            return Err(Error::InvalidInput(
                "track title and composer must not be empty".to_string(),
            ));
        }

        let messages = build_messages(template, track_title, composer);
        let options = CompletionOptions {
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            timeout: self.settings.timeout,
        };

        let started = Instant::now();
        let result = tokio::time::timeout(
            self.settings.timeout,
            self.provider.complete(&messages, &options),
        )
        .await;

        let failure = match result {
            Ok(Ok(response)) => {
                if let Some(usage) = response.usage {
                    self.tokens_used
                        .fetch_add(u64::from(usage.total_tokens), Ordering::Relaxed);
                }
                let text = response.message.content.trim().to_string();
                if !text.is_empty() {
                    debug!(
                        template = %template.name,
                        track = track_title,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        prompt_tokens = response.usage.map(|u| u.prompt_tokens),
                        completion_tokens = response.usage.map(|u| u.completion_tokens),
                        "Generated description"
                    );
                    return Ok(GenerationOutcome::Text(text));
                }
                Error::GenerationFailed(LlmError::InvalidResponse(
                    "empty completion text".to_string(),
                ))
            }
            Ok(Err(e)) => Error::from(e),
            Err(_) => Error::GenerationTimeout,
        };

        warn!(
            template = %template.name,
            track = track_title,
            composer,
            provider = self.provider.name(),
            "Description generation failed: {}",
            failure
        );
        Ok(GenerationOutcome::Failed(failure))
    }
}
