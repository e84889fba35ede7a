//! Usage event types for the widget's local analytics ledger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Countable occurrences reported by the widget and dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageEventType {
    MessageSent,
    ActionCalled,
    ProductClicked,
    Error,
}

/// One entry in the bounded usage log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Time-plus-random identifier, unique within the log.
    pub id: String,
    /// Epoch milliseconds.
    pub t: i64,
    #[serde(rename = "type")]
    pub event_type: UsageEventType,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Per-calendar-day counters. Accumulated forever, never evicted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyAggregate {
    pub messages: u64,
    pub actions: u64,
    pub clicks: u64,
    pub errors: u64,
    pub actions_by_name: HashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<i64>,
}

/// Settings governing the ledger. Stored partially; always read-merged
/// against [`UsageSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSettings {
    pub log_message_content: bool,
    pub log_cap: usize,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            log_message_content: false,
            log_cap: 1000,
        }
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageSettingsPatch {
    pub log_message_content: Option<bool>,
    pub log_cap: Option<usize>,
}

impl UsageSettings {
    /// Merge stored partial settings over the defaults. A non-positive cap
    /// falls back to the default cap.
    pub fn from_patch(patch: UsageSettingsPatch) -> Self {
        let defaults = Self::default();
        let log_cap = match patch.log_cap {
            Some(cap) if cap > 0 => cap,
            _ => defaults.log_cap,
        };
        Self {
            log_message_content: patch.log_message_content.unwrap_or(defaults.log_message_content),
            log_cap,
        }
    }

    pub fn apply(&self, patch: UsageSettingsPatch) -> Self {
        Self {
            log_message_content: patch.log_message_content.unwrap_or(self.log_message_content),
            log_cap: match patch.log_cap {
                Some(cap) if cap > 0 => cap,
                Some(_) => Self::default().log_cap,
                None => self.log_cap,
            },
        }
    }
}

/// One day of the trailing summary series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySeriesEntry {
    /// Local calendar date, `YYYY-MM-DD`.
    pub key: String,
    #[serde(flatten)]
    pub aggregate: DailyAggregate,
}

/// Rolling totals across a summary window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageTotals {
    pub messages: u64,
    pub actions: u64,
    pub clicks: u64,
    pub errors: u64,
}

/// Result of a trailing-N-days usage query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub series: Vec<DaySeriesEntry>,
    pub totals: UsageTotals,
    /// All-time per-action counts, across every stored day.
    pub by_action: HashMap<String, u64>,
    pub last_activity: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        let json = serde_json::to_string(&UsageEventType::MessageSent).unwrap();
        assert_eq!(json, "\"message_sent\"");
        let back: UsageEventType = serde_json::from_str("\"action_called\"").unwrap();
        assert_eq!(back, UsageEventType::ActionCalled);
    }

    #[test]
    fn test_settings_defaults() {
        let s = UsageSettings::default();
        assert!(!s.log_message_content);
        assert_eq!(s.log_cap, 1000);
    }

    #[test]
    fn test_settings_from_partial_patch() {
        let s = UsageSettings::from_patch(UsageSettingsPatch {
            log_message_content: Some(true),
            log_cap: None,
        });
        assert!(s.log_message_content);
        assert_eq!(s.log_cap, 1000);
    }

    #[test]
    fn test_zero_cap_falls_back_to_default() {
        let s = UsageSettings::from_patch(UsageSettingsPatch {
            log_message_content: None,
            log_cap: Some(0),
        });
        assert_eq!(s.log_cap, 1000);
    }

    #[test]
    fn test_aggregate_tolerates_missing_fields() {
        let agg: DailyAggregate = serde_json::from_str(r#"{"messages": 3}"#).unwrap();
        assert_eq!(agg.messages, 3);
        assert_eq!(agg.errors, 0);
        assert!(agg.actions_by_name.is_empty());
    }
}
