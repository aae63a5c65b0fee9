//! Builds the configured chat-completion provider.

use std::sync::Arc;

use tracing::{info, warn};
use tutorbot_config::AppConfig;
use tutorbot_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider described by the configuration.
///
/// A missing API key still yields a provider: calls fail with
/// `NotConfigured` and the dialog engine answers with its fallback text.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let base_url = config.base_url();
    if !config.has_api_key() {
        warn!(provider = %config.provider, "No API key configured; tutor replies will use fallback text");
    }
    info!(provider = %config.provider, base_url = %base_url, model = %config.model, "Provider configured");

    Arc::new(OpenAiCompatProvider::new(
        &config.provider,
        base_url,
        config.api_key.clone(),
    ))
}
