//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Emits `Connected`, then one `TextDelta` per non-empty content chunk,
//! then `Done`.

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use memora_core::llm::backend::EventStream;
use memora_types::llm::{LlmError, StreamEvent};

/// Map an async-openai [`ChatCompletionResponseStream`] to backend events.
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> EventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;
        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield StreamEvent::TextDelta { text };
                }
            }
        }

        yield StreamEvent::Done;
    })
}
