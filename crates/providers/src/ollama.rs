use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
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

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

/// Client for a self-hosted Ollama daemon. Generation is streamed as
/// line-delimited JSON and accumulated into one reply string.
pub struct OllamaClient {
    http: Client,
    base: String,
    model: String,
}

impl OllamaClient {
    pub fn from_settings(settings: &WidgetSettings) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            base: settings.ollama_url.trim_end_matches('/').to_string(),
            model: settings.ollama_model.clone(),
        }
    }

    pub async fn send(&self, message: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base);
        let req = OllamaGenerateRequest {
            model: &self.model,
            prompt: message,
            stream: true,
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }

        // Ollama streams line-delimited JSON
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| anyhow!("stream read error: {}", e))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // Process complete lines
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf = buf[pos + 1..].to_string();

                if line.is_empty() {
                    continue;
                }

                let chunk_data: OllamaStreamChunk = serde_json::from_str(&line)
                    .map_err(|e| anyhow!("failed to parse ollama stream: {}", e))?;
                if let Some(piece) = chunk_data.response {
                    text.push_str(&piece);
                }
                if chunk_data.done {
                    return Ok(finish(text));
                }
            }
        }

        Ok(finish(text))
    }
}

fn finish(text: String) -> String {
    if text.is_empty() {
        "No response.".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_parses() {
        let chunk: OllamaStreamChunk =
            serde_json::from_str(r#"{"response":"hel","done":false}"#).unwrap();
        assert_eq!(chunk.response.as_deref(), Some("hel"));
        assert!(!chunk.done);

        let done: OllamaStreamChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(done.response.is_none());
        assert!(done.done);
    }

    #[test]
    fn test_empty_accumulation_yields_fallback() {
        assert_eq!(finish(String::new()), "No response.");
        assert_eq!(finish("hi".to_string()), "hi");
    }
}
