//! Provider selection from configuration.

use std::sync::Arc;

use relicbot_config::{AppConfig, ProviderKind};
use relicbot_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider around a shared HTTP client.
pub fn build_from_config(
    config: &AppConfig,
    api_key: &str,
    client: reqwest::Client,
) -> Arc<dyn Provider> {
    match config.provider {
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(api_key).with_client(client);
            if let Some(ref url) = config.anthropic_api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::OpenAi => {
            let p = match config.openai_api_url {
                Some(ref url) => OpenAiCompatProvider::new("openai", url, api_key),
                None => OpenAiCompatProvider::openai(api_key),
            };
            Arc::new(p.with_client(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_anthropic() {
        let provider = build_from_config(&AppConfig::default(), "sk-ant", reqwest::Client::new());
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn openai_config_builds_openai() {
        let config = AppConfig {
            provider: ProviderKind::OpenAi,
            openai_api_url: Some("http://127.0.0.1:9/v1".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config, "sk-oa", reqwest::Client::new());
        assert_eq!(provider.name(), "openai");
    }
}
