//! Usage ledger: a bounded event log plus permanent daily aggregates.
//!
//! Both live in the key-value store. The log is a ring buffer by
//! truncation (oldest entries evicted once the cap is exceeded); the daily
//! aggregates accumulate forever and are the source of truth for counts,
//! regardless of log eviction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, Utc};
use serde_json::Value;
use shared::events::{
    DailyAggregate, DaySeriesEntry, UsageEvent, UsageEventType, UsageSettings,
    UsageSettingsPatch, UsageSummary, UsageTotals,
};
use shared::store::{read_json, write_json, KvStore};
use uuid::Uuid;

pub const LOG_KEY: &str = "ai_usage_log_v1";
pub const DAILY_KEY: &str = "ai_usage_daily_v1";
pub const SETTINGS_KEY: &str = "ai_usage_settings_v1";

#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn KvStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Effective settings: stored partial settings merged over defaults, so
    /// missing or corrupt stored settings never fail.
    pub fn settings(&self) -> UsageSettings {
        let patch = read_json(
            self.store.as_ref(),
            SETTINGS_KEY,
            UsageSettingsPatch::default(),
        );
        UsageSettings::from_patch(patch)
    }

    /// Apply a partial settings update; unset fields keep their value.
    pub fn set_settings(&self, patch: UsageSettingsPatch) {
        let next = self.settings().apply(patch);
        write_json(self.store.as_ref(), SETTINGS_KEY, &next);
    }

    /// Record one countable occurrence: append to the bounded log and fold
    /// into the day's aggregate.
    pub fn log_event(&self, event_type: UsageEventType, meta: Value) {
        let now = Utc::now().timestamp_millis();
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
        let event = UsageEvent {
            id: format!("{now}-{suffix}"),
            t: now,
            event_type,
            meta,
        };

        let mut log: Vec<UsageEvent> = read_json(self.store.as_ref(), LOG_KEY, Vec::new());
        log.push(event.clone());
        let cap = self.settings().log_cap;
        if log.len() > cap {
            let excess = log.len() - cap;
            log.drain(..excess);
        }
        write_json(self.store.as_ref(), LOG_KEY, &log);

        let mut daily: HashMap<String, DailyAggregate> =
            read_json(self.store.as_ref(), DAILY_KEY, HashMap::new());
        let agg = daily.entry(day_key(Local::now().date_naive())).or_default();
        match event_type {
            UsageEventType::MessageSent => agg.messages += 1,
            UsageEventType::ActionCalled => {
                agg.actions += 1;
                let name = action_name(&event.meta);
                *agg.actions_by_name.entry(name).or_insert(0) += 1;
            }
            UsageEventType::ProductClicked => agg.clicks += 1,
            UsageEventType::Error => agg.errors += 1,
        }
        agg.last_activity = Some(now);
        write_json(self.store.as_ref(), DAILY_KEY, &daily);
    }

    /// Most recent `limit` entries, in chronological order.
    pub fn logs(&self, limit: usize) -> Vec<UsageEvent> {
        let log: Vec<UsageEvent> = read_json(self.store.as_ref(), LOG_KEY, Vec::new());
        let start = log.len().saturating_sub(limit);
        log[start..].to_vec()
    }

    /// Per-day series for the trailing `days` calendar days (missing days
    /// all-zero), window totals, the all-time per-action breakdown, and the
    /// global last-activity timestamp.
    pub fn summary(&self, days: u32) -> UsageSummary {
        let daily: HashMap<String, DailyAggregate> =
            read_json(self.store.as_ref(), DAILY_KEY, HashMap::new());
        let today = Local::now().date_naive();

        let mut series = Vec::with_capacity(days as usize);
        let mut totals = UsageTotals::default();
        for i in (0..i64::from(days)).rev() {
            let key = day_key(today - Duration::days(i));
            let aggregate = daily.get(&key).cloned().unwrap_or_default();
            totals.messages += aggregate.messages;
            totals.actions += aggregate.actions;
            totals.clicks += aggregate.clicks;
            totals.errors += aggregate.errors;
            series.push(DaySeriesEntry { key, aggregate });
        }

        let mut by_action: HashMap<String, u64> = HashMap::new();
        for agg in daily.values() {
            for (name, count) in &agg.actions_by_name {
                *by_action.entry(name.clone()).or_insert(0) += count;
            }
        }
        let last_activity = daily.values().filter_map(|a| a.last_activity).max();

        UsageSummary {
            series,
            totals,
            by_action,
            last_activity,
        }
    }

    /// Erase the log and the daily aggregates. Settings are untouched.
    pub fn clear(&self) {
        self.store.remove(LOG_KEY);
        self.store.remove(DAILY_KEY);
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn action_name(meta: &Value) -> String {
    match meta.get("name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::store::MemoryStore;

    fn ledger() -> UsageLedger {
        UsageLedger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_log_appends_in_order() {
        let ledger = ledger();
        ledger.log_event(UsageEventType::MessageSent, json!({}));
        ledger.log_event(UsageEventType::Error, json!({"message": "x"}));

        let logs = ledger.logs(10);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].event_type, UsageEventType::MessageSent);
        assert_eq!(logs[1].event_type, UsageEventType::Error);
        assert!(logs[0].t <= logs[1].t);
        assert_ne!(logs[0].id, logs[1].id);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let ledger = ledger();
        ledger.set_settings(UsageSettingsPatch {
            log_cap: Some(5),
            ..Default::default()
        });
        for i in 0..8 {
            ledger.log_event(UsageEventType::MessageSent, json!({ "i": i }));
        }
        let logs = ledger.logs(10);
        assert_eq!(logs.len(), 5);
        assert_eq!(logs[0].meta["i"], 3);
        assert_eq!(logs[4].meta["i"], 7);
    }

    #[test]
    fn test_logs_limit_returns_most_recent() {
        let ledger = ledger();
        for i in 0..4 {
            ledger.log_event(UsageEventType::MessageSent, json!({ "i": i }));
        }
        let logs = ledger.logs(2);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].meta["i"], 2);
        assert_eq!(logs[1].meta["i"], 3);
    }

    #[test]
    fn test_aggregates_survive_log_eviction() {
        let ledger = ledger();
        ledger.set_settings(UsageSettingsPatch {
            log_cap: Some(10),
            ..Default::default()
        });
        for _ in 0..11 {
            ledger.log_event(UsageEventType::Error, json!({"message": "x"}));
        }
        assert_eq!(ledger.logs(100).len(), 10);
        let summary = ledger.summary(1);
        assert_eq!(summary.totals.errors, 11);
        assert_eq!(summary.series.len(), 1);
        assert_eq!(summary.series[0].aggregate.errors, 11);
    }

    #[test]
    fn test_actions_by_name_counts() {
        let ledger = ledger();
        ledger.log_event(UsageEventType::ActionCalled, json!({"name": "Products Search"}));
        ledger.log_event(UsageEventType::ActionCalled, json!({"name": "Products Search"}));
        ledger.log_event(UsageEventType::ActionCalled, json!({"name": "View Cart"}));
        ledger.log_event(UsageEventType::ActionCalled, json!({}));

        let summary = ledger.summary(7);
        assert_eq!(summary.totals.actions, 4);
        assert_eq!(summary.by_action["Products Search"], 2);
        assert_eq!(summary.by_action["View Cart"], 1);
        assert_eq!(summary.by_action["unknown"], 1);
    }

    #[test]
    fn test_summary_zero_fills_missing_days() {
        let ledger = ledger();
        ledger.log_event(UsageEventType::ProductClicked, json!({}));

        let summary = ledger.summary(7);
        assert_eq!(summary.series.len(), 7);
        // Only today has activity; the six earlier days are all-zero.
        for entry in &summary.series[..6] {
            assert_eq!(entry.aggregate, DailyAggregate::default());
        }
        assert_eq!(summary.series[6].aggregate.clicks, 1);
        assert_eq!(summary.totals.clicks, 1);
        assert!(summary.last_activity.is_some());
    }

    #[test]
    fn test_settings_roundtrip_merges_patch() {
        let ledger = ledger();
        ledger.set_settings(UsageSettingsPatch {
            log_message_content: Some(true),
            log_cap: None,
        });
        let s = ledger.settings();
        assert!(s.log_message_content);
        assert_eq!(s.log_cap, 1000);

        ledger.set_settings(UsageSettingsPatch {
            log_message_content: None,
            log_cap: Some(50),
        });
        let s = ledger.settings();
        assert!(s.log_message_content);
        assert_eq!(s.log_cap, 50);
    }

    #[test]
    fn test_clear_erases_both_stores() {
        let ledger = ledger();
        ledger.log_event(UsageEventType::MessageSent, json!({}));
        ledger.clear();
        assert!(ledger.logs(10).is_empty());
        let summary = ledger.summary(1);
        assert_eq!(summary.totals, UsageTotals::default());
        assert!(summary.last_activity.is_none());
    }

    #[test]
    fn test_default_cap_holds_after_1001_events() {
        let ledger = ledger();
        for _ in 0..1001 {
            ledger.log_event(UsageEventType::Error, json!({"message": "x"}));
        }
        let logs = ledger.logs(1000);
        assert_eq!(logs.len(), 1000);
        let summary = ledger.summary(1);
        assert_eq!(summary.totals.errors, 1001);
    }
}
