//! Scripted chat completion backend

use async_trait::async_trait;
use concert_notes::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the provider does for a given template.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Fail,
    Panic,
    /// Never answers; the generator timeout has to cut it off.
    Hang,
}

/// Answers deterministically from the prompt, except for templates scripted
/// to fail, panic or hang. The template is recognised by the `[name]` marker
/// at the start of its body.
pub struct ScriptedLlm {
    behaviors: Mutex<HashMap<String, Behavior>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(self, template: &str, behavior: Behavior) -> Self {
        self.script(template, Some(behavior));
        self
    }

    /// Changes how later calls for `template` behave; `None` answers normally.
    pub fn script(&self, template: &str, behavior: Option<Behavior>) {
        let mut behaviors = self.behaviors.lock().unwrap();
        match behavior {
            Some(behavior) => behaviors.insert(template.to_string(), behavior),
            None => behaviors.remove(template),
        };
    }

    /// Every call waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Template markers of every call so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn template_marker(prompt: &str) -> String {
    prompt
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let prompt = messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let marker = template_marker(&prompt);
        self.calls.lock().unwrap().push(marker.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self.behaviors.lock().unwrap().get(&marker).copied();
        match behavior {
            Some(Behavior::Fail) => Err(LlmError::Api {
                status: 500,
                message: format!("scripted failure for {}", marker),
            }),
            Some(Behavior::Panic) => panic!("scripted panic for {}", marker),
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Timeout)
            }
            None => Ok(CompletionResponse {
                message: Message::assistant(format!("Generated for {}", prompt)),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
