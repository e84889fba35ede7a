//! Provider selection. The configured tag is resolved to a concrete client
//! exactly once, at construction; after that the dispatcher is provider
//! agnostic.

use crate::gemini::GeminiClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;
use anyhow::Result;
use shared::settings::WidgetSettings;
use tracing::warn;

enum ProviderClient {
    OpenAI(OpenAIClient),
    Gemini(GeminiClient),
    Ollama(OllamaClient),
}

pub struct ProviderRouter {
    client: ProviderClient,
    name: &'static str,
}

impl ProviderRouter {
    /// Build the client for the configured provider tag. Unknown tags fall
    /// back to OpenAI, matching the widget's historical behavior.
    pub fn from_settings(settings: &WidgetSettings, system_prompt: String) -> Result<Self> {
        let (client, name) = match settings.provider.as_str() {
            "gemini" => (ProviderClient::Gemini(GeminiClient::from_settings(settings)?), "gemini"),
            "ollama" => (
                ProviderClient::Ollama(OllamaClient::from_settings(settings)),
                "ollama",
            ),
            "openai" => (
                ProviderClient::OpenAI(OpenAIClient::from_settings(settings, system_prompt)?),
                "openai",
            ),
            other => {
                warn!(provider = other, "unknown provider tag, using openai");
                (
                    ProviderClient::OpenAI(OpenAIClient::from_settings(settings, system_prompt)?),
                    "openai",
                )
            }
        };
        Ok(Self { client, name })
    }

    pub fn provider_name(&self) -> &'static str {
        self.name
    }

    /// Send one user message and return the provider's reply text.
    /// Transport and HTTP failures propagate to the caller.
    pub async fn send(&self, message: &str) -> Result<String> {
        match &self.client {
            ProviderClient::OpenAI(client) => client.send(message).await,
            ProviderClient::Gemini(client) => client.send(message).await,
            ProviderClient::Ollama(client) => client.send(message).await,
        }
    }
}
