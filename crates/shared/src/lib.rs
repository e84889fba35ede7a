pub mod events;
pub mod store;

pub mod settings {
    //! Three-tier configuration: runtime admin override > environment > built-in default.
    //!
    //! The admin override is the JSON blob the dashboard writes under
    //! [`CONFIG_KEY`]. Nothing outside this module reads the environment, so
    //! providers and the dispatcher receive fully resolved values.

    use serde::{Deserialize, Serialize};

    use crate::store::{read_json, KvStore};

    /// Store slot for the admin-configured override.
    pub const CONFIG_KEY: &str = "ai_agent_config";

    /// An HTTP operation the agent may ask the client to execute.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct AgentAction {
        pub name: String,
        pub description: String,
        pub endpoint: String,
        pub method: HttpMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub params: Option<std::collections::BTreeMap<String, String>>,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum HttpMethod {
        #[serde(rename = "GET")]
        Get,
        #[serde(rename = "POST")]
        Post,
    }

    /// Admin-configured override, stored as one JSON object. Every field is
    /// optional; absent fields fall through to the environment or defaults.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct AdminConfig {
        pub provider: Option<String>,
        pub openai_api_key: Option<String>,
        pub openai_model: Option<String>,
        pub gemini_api_key: Option<String>,
        pub gemini_model: Option<String>,
        pub ollama_url: Option<String>,
        pub ollama_model: Option<String>,
        pub assets_base_url: Option<String>,
        pub role: Option<String>,
        pub mission: Option<String>,
        pub responsibilities: Option<Vec<String>>,
        pub actions: Option<Vec<AgentAction>>,
    }

    impl AdminConfig {
        pub fn load(store: &dyn KvStore) -> Self {
            read_json(store, CONFIG_KEY, AdminConfig::default())
        }
    }

    /// Fully resolved widget settings, read-only after construction.
    #[derive(Debug, Clone)]
    pub struct WidgetSettings {
        /// Provider tag: `openai`, `gemini` or `ollama`.
        pub provider: String,
        pub openai_api_key: Option<String>,
        pub openai_model: String,
        pub gemini_api_key: Option<String>,
        pub gemini_model: String,
        pub ollama_url: String,
        pub ollama_model: String,
        /// Prefix for relative action endpoints.
        pub assets_base_url: String,
    }

    impl WidgetSettings {
        /// Resolve settings from the admin override, then the process
        /// environment, then built-in defaults.
        pub fn resolve(store: &dyn KvStore) -> Self {
            let admin = AdminConfig::load(store);
            Self::resolve_with(admin, |name| std::env::var(name).ok())
        }

        pub fn resolve_with(admin: AdminConfig, env: impl Fn(&str) -> Option<String>) -> Self {
            Self {
                provider: admin
                    .provider
                    .or_else(|| env("AGENT_PROVIDER"))
                    .unwrap_or_else(|| "openai".to_string()),
                openai_api_key: admin.openai_api_key.or_else(|| env("OPENAI_API_KEY")),
                openai_model: admin
                    .openai_model
                    .or_else(|| env("OPENAI_MODEL"))
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
                gemini_api_key: admin.gemini_api_key.or_else(|| env("GEMINI_API_KEY")),
                gemini_model: admin
                    .gemini_model
                    .or_else(|| env("GEMINI_MODEL"))
                    .unwrap_or_else(|| "gemini-pro".to_string()),
                ollama_url: admin
                    .ollama_url
                    .or_else(|| env("OLLAMA_BASE_URL"))
                    .unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
                ollama_model: admin
                    .ollama_model
                    .or_else(|| env("OLLAMA_MODEL"))
                    .unwrap_or_else(|| "llama2".to_string()),
                assets_base_url: admin
                    .assets_base_url
                    .or_else(|| env("AGENT_ASSETS_BASE_URL"))
                    .unwrap_or_default(),
            }
        }
    }

}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: "system".to_string(),
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: "user".to_string(),
                content: content.into(),
            }
        }
    }
}
