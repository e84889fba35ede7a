//! Agent profile: persona, responsibilities and the action catalog, plus the
//! system prompt the providers carry.
//!
//! The profile is built once per process from the admin override, then the
//! environment, then the built-in shop defaults, and is read-only afterwards.
//! Reconfiguration replaces the whole profile; actions are never patched
//! individually.

use serde::de::DeserializeOwned;
use shared::settings::{AdminConfig, AgentAction, HttpMethod};
use shared::store::KvStore;

#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub role: String,
    pub mission: String,
    pub responsibilities: Vec<String>,
    pub actions: Vec<AgentAction>,
}

impl AgentProfile {
    pub fn resolve(store: &dyn KvStore) -> Self {
        Self::resolve_with(AdminConfig::load(store), |name| std::env::var(name).ok())
    }

    pub fn resolve_with(admin: AdminConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            role: admin
                .role
                .or_else(|| env("AGENT_ROLE"))
                .unwrap_or_else(|| "AI Shopping Assistant".to_string()),
            mission: admin.mission.or_else(|| env("AGENT_MISSION")).unwrap_or_else(|| {
                "Help users browse products, answer store-related questions, and perform \
                 lookups while being concise, friendly, and accurate."
                    .to_string()
            }),
            responsibilities: admin
                .responsibilities
                .or_else(|| parse_json_array(env("AGENT_RESPONSIBILITIES")))
                .unwrap_or_else(default_responsibilities),
            actions: admin
                .actions
                .or_else(|| parse_json_array(env("AGENT_ACTIONS")))
                .unwrap_or_else(default_actions),
        }
    }

    /// Look up an action by name, case-insensitively. Unknown names are the
    /// caller's cue to treat the reply as plain conversation.
    pub fn find_action(&self, name: &str) -> Option<&AgentAction> {
        self.actions
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Deterministic system prompt. The final instruction block fixes the
    /// one-line JSON action shape the dispatcher's parser relies on.
    pub fn system_prompt(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("# Role".to_string());
        lines.push(self.role.clone());
        lines.push(String::new());
        lines.push("# Mission".to_string());
        lines.push(self.mission.clone());
        lines.push(String::new());
        lines.push("# Responsibilities".to_string());
        for r in &self.responsibilities {
            lines.push(format!("- {r}"));
        }
        lines.push(String::new());
        lines.push("# Actions".to_string());
        for a in &self.actions {
            lines.push(format!("- {}: {}", a.name, a.description));
            lines.push(format!("  Endpoint: {} {}", method_name(a.method), a.endpoint));
            if let Some(params) = &a.params {
                if !params.is_empty() {
                    lines.push("  Params:".to_string());
                    for (k, v) in params {
                        lines.push(format!("    - {k}: {v}"));
                    }
                }
            }
        }
        lines.push(String::new());
        lines.push(
            "Behavior: Prefer concise answers. Ask for clarification if the user request is \
             ambiguous."
                .to_string(),
        );
        lines.push(
            "When you want the client to execute an action, respond with ONLY a single JSON \
             object on one line, no extra text, in the following shape:"
                .to_string(),
        );
        lines.push(r#"{"action":"<Action Name>","params":{"<key>":"<value>"}}"#.to_string());
        lines.push(
            r#"Example: {"action":"Products Search","params":{"text":"wireless headphones"}}"#
                .to_string(),
        );
        lines.join("\n")
    }
}

fn method_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    }
}

fn parse_json_array<T: DeserializeOwned>(raw: Option<String>) -> Option<Vec<T>> {
    serde_json::from_str(&raw?).ok()
}

fn default_responsibilities() -> Vec<String> {
    [
        "Answer general store and product questions.",
        "Assist with basic shopping flows.",
        "When asked to find/search/lookup a product, request or extract the query and use the \
         Products Search action.",
        "Help add items to cart, remove items from cart, and view cart summary.",
        "Guide the user through checkout, order creation, and order confirmation when requested.",
        "Never invent data; if unknown, ask a clarifying question.",
        "Keep responses short and actionable.",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Built-in shop catalog. Serves as the fallback when neither the admin
/// override nor the environment configures actions.
pub fn default_actions() -> Vec<AgentAction> {
    fn action(
        name: &str,
        description: &str,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AgentAction {
        AgentAction {
            name: name.to_string(),
            description: description.to_string(),
            endpoint: endpoint.to_string(),
            method: HttpMethod::Get,
            params: if params.is_empty() {
                None
            } else {
                Some(
                    params
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )
            },
        }
    }

    vec![
        action(
            "Products Search",
            "Search products by name or description. Provide short bullet results: description \
             (price).",
            "/assets/products.json",
            &[("text", "Search text such as name or description")],
        ),
        action(
            "Add To Cart",
            "Add a product to the cart with a given quantity.",
            "/assets/cart_add.json",
            &[
                ("productId", "Product ID"),
                ("quantity", "Quantity to add (default 1)"),
            ],
        ),
        action(
            "Remove From Cart",
            "Remove a product from the cart.",
            "/assets/cart_remove.json",
            &[("productId", "Product ID")],
        ),
        action(
            "View Cart",
            "Retrieve current cart contents.",
            "/assets/cart_view.json",
            &[],
        ),
        action(
            "Checkout",
            "Begin checkout and return a summary to confirm.",
            "/assets/checkout.json",
            &[],
        ),
        action(
            "Create Order",
            "Create an order from the current cart with contact and shipping info.",
            "/assets/order_create.json",
            &[
                ("name", "Customer full name"),
                ("email", "Customer email"),
                ("address", "Shipping address"),
            ],
        ),
        action(
            "Confirm Order",
            "Confirm an order by ID and return confirmation details.",
            "/assets/order_confirm.json",
            &[("orderId", "Order ID to confirm")],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |_| None);
        assert_eq!(profile.role, "AI Shopping Assistant");
        assert_eq!(profile.actions.len(), 7);
        assert_eq!(profile.responsibilities.len(), 7);
    }

    #[test]
    fn test_find_action_is_case_insensitive() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |_| None);
        let found = profile.find_action("products search").unwrap();
        assert_eq!(found.name, "Products Search");
        assert!(profile.find_action("PRODUCTS SEARCH").is_some());
        assert!(profile.find_action("Products  Search").is_none());
    }

    #[test]
    fn test_every_catalog_name_resolves_to_itself() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |_| None);
        for action in &profile.actions {
            let shouted = action.name.to_uppercase();
            let resolved = profile.find_action(&shouted).unwrap();
            assert_eq!(resolved.name, action.name);
        }
    }

    #[test]
    fn test_admin_actions_replace_catalog_wholesale() {
        let admin = AdminConfig {
            actions: Some(vec![AgentAction {
                name: "Store Hours".into(),
                description: "Look up opening hours.".into(),
                endpoint: "https://example.com/hours".into(),
                method: HttpMethod::Get,
                params: None,
            }]),
            ..Default::default()
        };
        let profile = AgentProfile::resolve_with(admin, |_| None);
        assert_eq!(profile.actions.len(), 1);
        assert!(profile.find_action("Products Search").is_none());
    }

    #[test]
    fn test_env_responsibilities_parse_as_json_array() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |name| match name {
            "AGENT_RESPONSIBILITIES" => Some(r#"["Only one duty."]"#.to_string()),
            _ => None,
        });
        assert_eq!(profile.responsibilities, vec!["Only one duty.".to_string()]);
    }

    #[test]
    fn test_malformed_env_array_falls_back() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |name| match name {
            "AGENT_RESPONSIBILITIES" => Some("not json".to_string()),
            _ => None,
        });
        assert_eq!(profile.responsibilities.len(), 7);
    }

    #[test]
    fn test_system_prompt_layout() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |_| None);
        let prompt = profile.system_prompt();
        assert!(prompt.starts_with("# Role\nAI Shopping Assistant\n\n# Mission\n"));
        assert!(prompt.contains("- Products Search: Search products"));
        assert!(prompt.contains("  Endpoint: GET /assets/products.json"));
        assert!(prompt.contains("    - text: Search text such as name or description"));
        assert!(prompt.contains(r#"{"action":"<Action Name>","params":{"<key>":"<value>"}}"#));
    }

    #[test]
    fn test_system_prompt_omits_empty_params() {
        let profile = AgentProfile::resolve_with(AdminConfig::default(), |_| None);
        let prompt = profile.system_prompt();
        let view_cart = prompt
            .split("- View Cart:")
            .nth(1)
            .and_then(|rest| rest.split("- Checkout:").next())
            .unwrap();
        assert!(!view_cart.contains("Params:"));
    }
}
