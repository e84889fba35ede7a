use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use shared::settings::WidgetSettings;
use std::sync::LazyLock;
use std::time::Duration;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

// ── Request / response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn completion_text(body: OpenAIResponse) -> String {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No response.".to_string())
}

// ── Client ───────────────────────────────────────────────────────────

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat-completion client. Each send carries the agent system prompt plus
/// the single user message.
pub struct OpenAIClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
    system_prompt: String,
}

impl OpenAIClient {
    pub fn from_settings(settings: &WidgetSettings, system_prompt: String) -> Result<Self> {
        let auth_token = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| anyhow!("No OpenAI API key configured"))?;
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: settings.openai_model.clone(),
            base_url: DEFAULT_BASE_URL.trim_end_matches('/').to_string(),
            system_prompt,
        })
    }

    pub async fn send(&self, message: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(message),
            ],
        };
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(anyhow!("openai error: {}", status));
            }
            return Err(anyhow!("openai error: {}\n{}", status, detail));
        }
        let body: OpenAIResponse = resp.json().await?;
        Ok(completion_text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_text_reads_first_choice() {
        let body: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"hello"}},{"message":{"content":"other"}}]}"#,
        )
        .unwrap();
        assert_eq!(completion_text(body), "hello");
    }

    #[test]
    fn test_completion_text_falls_back_when_empty() {
        let body: OpenAIResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(completion_text(body), "No response.");

        let body: OpenAIResponse =
            serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert_eq!(completion_text(body), "No response.");
    }
}
