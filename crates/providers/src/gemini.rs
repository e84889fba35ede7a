use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::settings::WidgetSettings;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

fn completion_text(body: GeminiResponse) -> String {
    body.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No response.".to_string())
}

/// Single-prompt generation client; the API key travels as a query
/// parameter rather than a header.
pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &WidgetSettings) -> Result<Self> {
        let auth_token = settings
            .gemini_api_key
            .clone()
            .ok_or_else(|| anyhow!("No Gemini API key configured"))?;
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(45)).build()?,
            auth_token,
            model: settings.gemini_model.clone(),
        })
    }

    pub async fn send(&self, message: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.auth_token
        );
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: message.to_string(),
                }],
            }],
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            let body = if body.len() > 800 {
                format!("{}...", &body[..800])
            } else {
                body.to_string()
            };
            return Err(anyhow!("gemini error: {}\n{}", status, body));
        }
        let body: GeminiResponse = resp.json().await?;
        Ok(completion_text(body))
    }
}
