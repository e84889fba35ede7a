//! Widget boundary: one user message in, one conversational turn out.

use std::sync::Arc;

use anyhow::Result;
use providers::ProviderRouter;
use serde_json::json;
use shared::events::UsageEventType;
use shared::settings::WidgetSettings;
use shared::store::KvStore;
use tracing::warn;

use crate::dispatch::ActionDispatcher;
use crate::profile::AgentProfile;
use crate::usage::UsageLedger;

/// Opening message shown when the widget mounts.
pub const WELCOME_MESSAGE: &str = "👋 Hi! How can I help you today?";

/// Shown in place of a reply when the provider call itself fails.
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

pub struct ShopAssistant {
    router: ProviderRouter,
    dispatcher: ActionDispatcher,
    ledger: UsageLedger,
}

impl ShopAssistant {
    /// Compose the assistant from the store: resolve settings and profile,
    /// pick the provider, and wire the dispatcher and ledger.
    pub fn new(store: Arc<dyn KvStore>) -> Result<Self> {
        let settings = WidgetSettings::resolve(store.as_ref());
        let profile = Arc::new(AgentProfile::resolve(store.as_ref()));
        let ledger = UsageLedger::new(store.clone());
        let router = ProviderRouter::from_settings(&settings, profile.system_prompt())?;
        let dispatcher = ActionDispatcher::new(
            profile,
            settings.assets_base_url.clone(),
            ledger.clone(),
        );
        Ok(Self {
            router,
            dispatcher,
            ledger,
        })
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn provider_name(&self) -> &'static str {
        self.router.provider_name()
    }

    /// Handle one user submission: log it, ask the provider, run the
    /// dispatch cycle. Provider failures become the apology message; the
    /// underlying error is logged, not shown.
    pub async fn handle_message(&self, text: &str) -> Vec<String> {
        let content = text.trim();
        if content.is_empty() {
            return Vec::new();
        }

        let meta = if self.ledger.settings().log_message_content {
            json!({ "content": content })
        } else {
            json!({})
        };
        self.ledger.log_event(UsageEventType::MessageSent, meta);

        match self.router.send(content).await {
            Ok(reply) => self.dispatcher.dispatch(content, &reply).await,
            Err(err) => {
                warn!(%err, "provider call failed");
                self.ledger.log_event(
                    UsageEventType::Error,
                    json!({"message": err.to_string()}),
                );
                vec![APOLOGY_MESSAGE.to_string()]
            }
        }
    }
}
