//! GenerationBackend trait definition.
//!
//! Returns `Pin<Box<dyn Stream>>` so the trait stays object-safe for the
//! `BoxGenerationBackend` wrapper. Implementations live in memora-infra.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use memora_types::llm::{GenerationRequest, LlmError, StreamEvent};

/// Boxed event stream produced by a backend.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// A chat-completion backend that streams text fragments.
pub trait GenerationBackend: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// Start a streaming generation.
    fn stream(&self, request: GenerationRequest) -> EventStream;
}

/// Concatenate `TextDelta` fragments in arrival order.
///
/// The first error ends collection and is returned.
pub async fn collect_text(mut stream: EventStream) -> Result<String, LlmError> {
    let mut text = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta { text: fragment } => text.push_str(&fragment),
            StreamEvent::Done => break,
            StreamEvent::Connected => {}
        }
    }
    Ok(text)
}
