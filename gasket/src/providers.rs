//! Provider constructors for the bundled adapters.

use std::sync::Arc;
use std::time::Duration;

use crate::{ModelProvider, OpenAiCompatibleProvider, ProviderError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI provider against the public endpoint.
pub fn openai_provider(api_key: impl Into<String>) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let client = http_client()?;
    Ok(Arc::new(
        OpenAiCompatibleProvider::from_client(client).with_api_key(api_key),
    ))
}

/// Any OpenAI-compatible gateway: self-hosted inference, proxies, routers.
pub fn openai_compatible_provider(
    base_url: impl Into<String>,
    api_key: Option<String>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let client = http_client()?;
    let mut provider = OpenAiCompatibleProvider::from_client(client).with_base_url(base_url);
    if let Some(api_key) = api_key {
        provider = provider.with_api_key(api_key);
    }

    Ok(Arc::new(provider))
}

fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|err| ProviderError::other(format!("http client construction failed: {err}")))
}
