//! Action dispatch: find an action command in a provider reply, execute it,
//! and render the result as chat messages.
//!
//! The model is assumed fallible. Malformed JSON, missing fields and
//! unknown action names all degrade to a plain conversational reply; only a
//! failed HTTP execution is surfaced, and then as a recoverable chat
//! message, never a hard error.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::events::UsageEventType;
use shared::settings::{AgentAction, HttpMethod};
use tracing::debug;

use crate::profile::AgentProfile;
use crate::usage::UsageLedger;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
});

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(hi|hello|hey|yo|sup|good\s*(morning|afternoon|evening))\b").unwrap()
});

/// Action request parsed out of a reply. Lives for one dispatch cycle.
#[derive(Debug, Deserialize)]
pub struct ActionCommand {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// The outermost JSON-object span in `text`: first `{` through last `}`.
/// Deliberately lenient; the reply does not have to be pure JSON.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn is_greeting(text: &str) -> bool {
    GREETING_RE.is_match(text.trim())
}

pub struct ActionDispatcher {
    http: Client,
    profile: Arc<AgentProfile>,
    assets_base_url: String,
    ledger: UsageLedger,
}

impl ActionDispatcher {
    pub fn new(profile: Arc<AgentProfile>, assets_base_url: String, ledger: UsageLedger) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            profile,
            assets_base_url,
            ledger,
        }
    }

    /// Run one dispatch cycle over a provider reply. Returns exactly one
    /// conversational turn: either the action-result messages or the plain
    /// reply fallback.
    pub async fn dispatch(&self, user_text: &str, reply: &str) -> Vec<String> {
        if let Some(command) = self.parse_command(reply) {
            if let Some(action) = self.profile.find_action(&command.action) {
                let action = action.clone();
                let mut messages = vec![format!("🔎 Executing action: {}...", action.name)];
                self.ledger.log_event(
                    UsageEventType::ActionCalled,
                    serde_json::json!({"name": action.name, "source": "tool_call"}),
                );
                match self.execute(&action, &command.params).await {
                    Ok(rendered) => messages.extend(rendered),
                    Err(err) => {
                        messages.push(format!("Action failed: {err}"));
                        self.ledger.log_event(
                            UsageEventType::Error,
                            serde_json::json!({"message": err.to_string()}),
                        );
                    }
                }
                return messages;
            }
            debug!(action = %command.action, "no matching action, treating as conversation");
        }

        // Plain-reply fallback. A greeting in the user's text gets a single
        // tailored message rather than a separate salutation.
        if is_greeting(user_text) {
            vec![format!("Hi! {reply}")]
        } else {
            vec![reply.to_string()]
        }
    }

    fn parse_command(&self, reply: &str) -> Option<ActionCommand> {
        let span = extract_json_object(reply)?;
        let command: ActionCommand = serde_json::from_str(span).ok()?;
        if command.action.is_empty() {
            return None;
        }
        Some(command)
    }

    async fn execute(&self, action: &AgentAction, params: &Map<String, Value>) -> Result<Vec<String>> {
        let url = resolve_endpoint(&self.assets_base_url, &action.endpoint);
        let request = match action.method {
            HttpMethod::Get => self.http.get(build_get_url(&url, params)),
            HttpMethod::Post => self.http.post(&url).json(params),
        };
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("request failed: {status}"));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if content_type.contains("application/json") {
            let data: Value = resp.json().await?;
            Ok(render_payload(&data))
        } else {
            Ok(vec![resp.text().await?])
        }
    }
}

/// Prefix relative endpoints with the assets base URL; absolute endpoints
/// pass through unchanged.
fn resolve_endpoint(assets_base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http") {
        endpoint.to_string()
    } else {
        format!("{}{}", assets_base_url.trim_end_matches('/'), endpoint)
    }
}

/// Append `params` to `url` as query pairs, values stringified.
fn build_get_url(url: &str, params: &Map<String, Value>) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k),
                urlencoding::encode(&stringify(v))
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render an action's JSON payload as chat messages: lists become a count
/// plus a short preview, objects become formatted JSON, scalars their
/// string form.
fn render_payload(data: &Value) -> Vec<String> {
    match data {
        Value::Array(items) => {
            let mut messages = vec![format!("Found {} results.", items.len())];
            let preview = items
                .iter()
                .take(5)
                .map(preview_line)
                .collect::<Vec<_>>()
                .join("\n");
            if !preview.is_empty() {
                messages.push(preview);
            }
            messages
        }
        Value::Object(_) => {
            vec![serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())]
        }
        other => vec![stringify(other)],
    }
}

fn preview_line(item: &Value) -> String {
    let label = ["title", "name", "id"]
        .iter()
        .find_map(|key| field_display(item.get(*key)))
        .unwrap_or_else(|| "item".to_string());
    match field_display(item.get("price")) {
        Some(price) => format!("- {label} ({price})"),
        None => format!("- {label}"),
    }
}

/// Display form of a field, skipping absent and falsy values.
fn field_display(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
