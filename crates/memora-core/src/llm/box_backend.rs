//! BoxGenerationBackend: object-safe dynamic dispatch wrapper.
//!
//! 1. `GenerationBackendDyn` is the object-safe mirror of the trait
//! 2. A blanket impl covers every `T: GenerationBackend`
//! 3. `BoxGenerationBackend` wraps `Box<dyn GenerationBackendDyn>` and delegates

use memora_types::llm::GenerationRequest;

use super::backend::{EventStream, GenerationBackend};

/// Object-safe version of [`GenerationBackend`].
pub trait GenerationBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    fn stream_boxed(&self, request: GenerationRequest) -> EventStream;
}

impl<T: GenerationBackend> GenerationBackendDyn for T {
    fn name(&self) -> &str {
        GenerationBackend::name(self)
    }

    fn default_model(&self) -> &str {
        GenerationBackend::default_model(self)
    }

    fn stream_boxed(&self, request: GenerationRequest) -> EventStream {
        self.stream(request)
    }
}

/// Type-erased generation backend selected at startup from configuration.
pub struct BoxGenerationBackend {
    inner: Box<dyn GenerationBackendDyn + Send + Sync>,
}

impl BoxGenerationBackend {
    pub fn new<T: GenerationBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    pub fn stream(&self, request: GenerationRequest) -> EventStream {
        self.inner.stream_boxed(request)
    }
}

impl std::fmt::Debug for BoxGenerationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxGenerationBackend")
            .field("name", &self.name())
            .finish()
    }
}
