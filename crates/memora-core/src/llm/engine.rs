//! Generation engine.
//!
//! Builds the two-message request from rendered prompts, applies per-call
//! overrides and keeps a `gen_ai.execute` span entered for the whole life
//! of the backend stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tracing::info_span;

use memora_types::execution::LlmOverrides;
use memora_types::llm::{GenerationRequest, LlmError, Message, StreamEvent};

use super::backend::{EventStream, collect_text};
use super::box_backend::BoxGenerationBackend;

pub struct GenerationEngine {
    backend: BoxGenerationBackend,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl GenerationEngine {
    pub fn new(backend: BoxGenerationBackend) -> Self {
        Self {
            backend,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Defaults applied when a call does not override them.
    pub fn with_defaults(mut self, temperature: Option<f64>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// The override model when given, else the backend's default.
    pub fn resolve_model(&self, overrides: Option<&LlmOverrides>) -> String {
        overrides
            .and_then(|o| o.model.clone())
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }

    pub fn build_request(
        &self,
        system: &str,
        user: &str,
        overrides: Option<&LlmOverrides>,
    ) -> GenerationRequest {
        let model = self.resolve_model(overrides);
        GenerationRequest {
            messages: vec![Message::system(system), Message::user(user)],
            model: Some(model),
            temperature: overrides.and_then(|o| o.temperature).or(self.temperature),
            max_tokens: overrides.and_then(|o| o.max_tokens).or(self.max_tokens),
        }
    }

    /// Stream a generation for `agent_id` inside a `gen_ai.execute` span.
    pub fn stream(&self, agent_id: &str, request: GenerationRequest) -> EventStream {
        let span = info_span!(
            "gen_ai.execute",
            gen_ai.system = self.backend.name(),
            gen_ai.agent.id = agent_id,
            gen_ai.request.model = request.model.as_deref().unwrap_or_default(),
            gen_ai.request.max_tokens = ?request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
        );
        let inner = self.backend.stream(request);
        Box::pin(InSpan { inner, span })
    }

    /// Run a generation to completion and return the accumulated text.
    pub async fn generate(
        &self,
        agent_id: &str,
        system: &str,
        user: &str,
        overrides: Option<&LlmOverrides>,
    ) -> Result<String, LlmError> {
        let request = self.build_request(system, user, overrides);
        collect_text(self.stream(agent_id, request)).await
    }
}

pin_project! {
    /// Keeps `span` entered while the inner stream is polled.
    struct InSpan<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S> Stream for InSpan<S>
where
    S: Stream<Item = Result<StreamEvent, LlmError>>,
{
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    fn engine() -> (GenerationEngine, ScriptedBackend) {
        let backend = ScriptedBackend::new(vec!["hello ", "world"]);
        (
            GenerationEngine::new(BoxGenerationBackend::new(backend.clone()))
                .with_defaults(Some(0.2), Some(512)),
            backend,
        )
    }

    #[test]
    fn test_build_request_applies_overrides() {
        let (engine, _) = engine();
        let request = engine.build_request("sys", "usr", None);
        assert_eq!(request.messages, vec![Message::system("sys"), Message::user("usr")]);
        assert_eq!(request.model.as_deref(), Some("scripted-model"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(512));

        let overrides = LlmOverrides {
            model: Some("gpt-4o".to_string()),
            temperature: Some(0.9),
            max_tokens: None,
        };
        let request = engine.build_request("sys", "usr", Some(&overrides));
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.temperature, Some(0.9));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn test_generate_collects_stream() {
        let (engine, backend) = engine();
        let text = engine.generate("demo", "sys", "usr", None).await.unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(backend.calls(), 1);
        let seen = backend.last_request().unwrap();
        assert_eq!(seen.messages[1].content, "usr");
    }
}
