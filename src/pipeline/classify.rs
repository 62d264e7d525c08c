//! VLM interaction: turn one page image into a [`PageLabel`].
//!
//! [`PageClassifier`] is the seam between batching and the model. The
//! production implementation, [`VisionClassifier`], sends a two-message
//! conversation to an `edgequake-llm` provider:
//!
//! 1. **System message**: category taxonomy plus the JSON reply schema
//!    (see [`crate::prompts`]), or a user-supplied override
//! 2. **User message**: the page image as a base64 data URI, no text
//!
//! No retries: a failed call is reported as a [`ClassifyError`] and the
//! failure policy in [`crate::pipeline::batch`] decides what happens next.

use crate::config::{LabelConfig, DEFAULT_MODEL};
use crate::error::{ClassifyError, PageLabelError};
use crate::label::{Classification, PageLabel};
use crate::pipeline::encode::ClassificationRequest;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Something that can label one page image.
///
/// Implementations only ever see requests that carry an image; requests
/// whose file could not be read are failed before reaching them.
#[async_trait]
pub trait PageClassifier: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest, image: &ImageData)
        -> Result<PageLabel, ClassifyError>;
}

/// Dispatch one request, failing it up front when it has no payload.
pub async fn classify_request(
    classifier: &dyn PageClassifier,
    request: &ClassificationRequest,
) -> Result<PageLabel, ClassifyError> {
    match &request.image {
        Some(image) => classifier.classify(request, image).await,
        None => Err(ClassifyError::MissingImage {
            detail: request
                .read_error
                .clone()
                .unwrap_or_else(|| format!("no data for {}", request.path.display())),
        }),
    }
}

/// [`PageClassifier`] backed by a vision-capable LLM provider.
pub struct VisionClassifier {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl VisionClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &LabelConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.clone()),
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &LabelConfig) -> Result<Self, PageLabelError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }

    fn messages(&self, image: &ImageData) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![image.clone()]),
        ]
    }
}

#[async_trait]
impl PageClassifier for VisionClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
        image: &ImageData,
    ) -> Result<PageLabel, ClassifyError> {
        let start = Instant::now();
        let messages = self.messages(image);

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| {
                warn!("{}: LLM call failed: {}", request.path.display(), e);
                ClassifyError::LlmFailed {
                    detail: e.to_string(),
                }
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            request.path.display(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Classification::parse(&response.content).map(|c| c.label)
    }
}

/// Build `CompletionOptions` from the label config.
fn build_options(config: &LabelConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PageLabelError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PageLabelError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider in the config
/// 2. a named provider plus model from the config
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. whatever `ProviderFactory::from_env` detects
pub fn resolve_provider(config: &LabelConfig) -> Result<Arc<dyn LLMProvider>, PageLabelError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            let model = config.model.as_deref().unwrap_or(&env_model);
            return create_vision_provider(&prov, model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PageLabelError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
