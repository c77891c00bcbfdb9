//! Generation backend implementations.
//!
//! [`build_backend`] turns the `[llm]` config table into a boxed backend.

pub mod openai_compat;

use memora_core::llm::backend::{EventStream, GenerationBackend};
use memora_core::llm::box_backend::BoxGenerationBackend;
use memora_types::config::LlmConfig;
use memora_types::llm::{GenerationRequest, LlmError};
use secrecy::SecretString;

use self::openai_compat::OpenAiCompatibleBackend;

/// Provider names served by [`OpenAiCompatibleBackend`].
const OPENAI_PROVIDERS: &[&str] = &["openai", "openai_compatible"];

/// Build the configured backend, reading the API key through `var`.
pub fn build_backend(
    config: &LlmConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<BoxGenerationBackend, LlmError> {
    let provider = config.provider.trim().to_lowercase();
    if !OPENAI_PROVIDERS.contains(&provider.as_str()) {
        return Err(LlmError::UnsupportedProvider(config.provider.clone()));
    }

    let api_key = var(&config.api_key_env)
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
        .ok_or_else(|| LlmError::NotConfigured(provider.clone()))?;

    tracing::debug!(provider = %provider, model = %config.model, base_url = %config.base_url, "generation backend configured");
    Ok(BoxGenerationBackend::new(OpenAiCompatibleBackend::new(
        provider,
        &config.base_url,
        api_key,
        &config.model,
    )))
}

/// Stands in for a backend that could not be built; every call fails with
/// the construction error.
pub struct UnavailableBackend {
    error: LlmError,
    model: String,
}

impl UnavailableBackend {
    pub fn new(error: LlmError, model: impl Into<String>) -> Self {
        Self {
            error,
            model: model.into(),
        }
    }
}

impl GenerationBackend for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn stream(&self, _request: GenerationRequest) -> EventStream {
        let error = self.error.clone();
        Box::pin(futures_util::stream::once(async move { Err(error) }))
    }
}

/// Like [`build_backend`], but defers a configuration failure to call time
/// so commands that never generate still work.
pub fn backend_or_unavailable(
    config: &LlmConfig,
    var: impl Fn(&str) -> Option<String>,
) -> BoxGenerationBackend {
    match build_backend(config, var) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::debug!(error = %e, "generation backend unavailable");
            BoxGenerationBackend::new(UnavailableBackend::new(e, config.model.clone()))
        }
    }
}
