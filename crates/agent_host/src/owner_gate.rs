//! PIN-based admin lock for the configuration dashboard.
//!
//! The gate computes its state once per load from the persisted auth record,
//! the current origin, an optionally supplied admin key, and a per-session
//! flag. The auth record is permanent until local storage is cleared; the
//! session flag dies with the session, so `Authed` never survives a restart
//! without the PIN.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::store::{read_json, write_json, KvStore};

use crate::credentials;

pub const AUTH_KEY: &str = "ai_agent_owner_auth";
pub const SESSION_KEY: &str = "ai_owner_authed_session_v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAuthRecord {
    pub hash: String,
    pub salt: String,
    pub created_at: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Terminal until the origin or the stored security settings change.
    Blocked(String),
    NeedsSetup,
    LoggedOut,
    Authed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    #[error("PIN must be at least 6 characters.")]
    PinTooShort,
    #[error("PINs do not match.")]
    PinMismatch,
    #[error("Invalid PIN.")]
    InvalidPin,
    #[error("Owner PIN is already configured.")]
    AlreadyConfigured,
    #[error("Owner PIN is not configured yet.")]
    NotConfigured,
    #[error("Not authenticated.")]
    NotAuthed,
    #[error("Failed to derive PIN hash.")]
    Kdf,
}

pub struct OwnerGate {
    store: Arc<dyn KvStore>,
    session: Arc<dyn KvStore>,
    state: GateState,
}

impl OwnerGate {
    /// Compute the initial state for this load.
    pub fn new(
        store: Arc<dyn KvStore>,
        session: Arc<dyn KvStore>,
        origin: &str,
        provided_admin_key: Option<&str>,
    ) -> Self {
        let record: Option<OwnerAuthRecord> = read_json(store.as_ref(), AUTH_KEY, None);
        let session_authed = session.get_raw(SESSION_KEY).as_deref() == Some("1");

        let state = match record {
            None => GateState::NeedsSetup,
            Some(record) => {
                if !record.allowed_origins.is_empty()
                    && !record.allowed_origins.iter().any(|o| o == origin)
                {
                    GateState::Blocked(format!("Admin disabled on this origin ({origin})."))
                } else if record
                    .admin_key
                    .as_deref()
                    .is_some_and(|key| provided_admin_key != Some(key))
                {
                    GateState::Blocked("Admin requires a valid adminKey.".to_string())
                } else if session_authed {
                    GateState::Authed
                } else {
                    GateState::LoggedOut
                }
            }
        };

        Self {
            store,
            session,
            state,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// First-run setup: validate the PIN pair, persist the auth record and
    /// open the session.
    pub fn setup(
        &mut self,
        pin: &str,
        confirm: &str,
        allowed_origins: Vec<String>,
        admin_key: Option<String>,
    ) -> Result<(), GateError> {
        if self.state != GateState::NeedsSetup {
            return Err(GateError::AlreadyConfigured);
        }
        if pin.chars().count() < 6 {
            return Err(GateError::PinTooShort);
        }
        if pin != confirm {
            return Err(GateError::PinMismatch);
        }

        let salt = credentials::generate_salt();
        let hash = credentials::derive_hash(pin, &salt).map_err(|_| GateError::Kdf)?;
        let record = OwnerAuthRecord {
            hash,
            salt: credentials::encode(&salt),
            created_at: chrono::Utc::now().to_rfc3339(),
            allowed_origins,
            admin_key: admin_key.filter(|k| !k.is_empty()),
        };
        write_json(self.store.as_ref(), AUTH_KEY, &record);
        self.session.set_raw(SESSION_KEY, "1");
        self.state = GateState::Authed;
        Ok(())
    }

    /// Verify the PIN against the stored record and open the session.
    /// Unlimited attempts; a wrong PIN leaves the gate in `LoggedOut`.
    pub fn login(&mut self, pin: &str) -> Result<(), GateError> {
        if self.state != GateState::LoggedOut {
            return Err(GateError::NotAuthed);
        }
        let record: Option<OwnerAuthRecord> = read_json(self.store.as_ref(), AUTH_KEY, None);
        let Some(record) = record else {
            self.state = GateState::NeedsSetup;
            return Err(GateError::NotConfigured);
        };
        if credentials::verify(pin, &record.salt, &record.hash) {
            self.session.set_raw(SESSION_KEY, "1");
            self.state = GateState::Authed;
            Ok(())
        } else {
            Err(GateError::InvalidPin)
        }
    }

    /// Update the origin allow-list and admin key without re-authenticating.
    /// Takes effect on the next load.
    pub fn update_security(
        &mut self,
        allowed_origins: Vec<String>,
        admin_key: Option<String>,
    ) -> Result<(), GateError> {
        if self.state != GateState::Authed {
            return Err(GateError::NotAuthed);
        }
        let record: Option<OwnerAuthRecord> = read_json(self.store.as_ref(), AUTH_KEY, None);
        let Some(mut record) = record else {
            return Err(GateError::NotConfigured);
        };
        record.allowed_origins = allowed_origins;
        record.admin_key = admin_key.filter(|k| !k.is_empty());
        write_json(self.store.as_ref(), AUTH_KEY, &record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::store::MemoryStore;

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    fn gate(
        store: &Arc<MemoryStore>,
        session: &Arc<MemoryStore>,
        origin: &str,
        key: Option<&str>,
    ) -> OwnerGate {
        OwnerGate::new(store.clone(), session.clone(), origin, key)
    }

    const ORIGIN: &str = "https://shop.example";

    #[test]
    fn test_fresh_store_needs_setup() {
        let (store, session) = stores();
        let g = gate(&store, &session, ORIGIN, None);
        assert_eq!(*g.state(), GateState::NeedsSetup);
    }

    #[test]
    fn test_setup_validations() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);

        assert_eq!(
            g.setup("abc", "abc", vec![], None),
            Err(GateError::PinTooShort)
        );
        assert_eq!(
            g.setup("abcdef", "abcdeg", vec![], None),
            Err(GateError::PinMismatch)
        );
        assert_eq!(*g.state(), GateState::NeedsSetup);

        g.setup("abcdef", "abcdef", vec![], None).unwrap();
        assert_eq!(*g.state(), GateState::Authed);
    }

    #[test]
    fn test_session_flag_carries_auth_within_session() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], None).unwrap();

        let again = gate(&store, &session, ORIGIN, None);
        assert_eq!(*again.state(), GateState::Authed);
    }

    #[test]
    fn test_new_session_requires_login() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], None).unwrap();

        let fresh_session = Arc::new(MemoryStore::new());
        let mut g2 = gate(&store, &fresh_session, ORIGIN, None);
        assert_eq!(*g2.state(), GateState::LoggedOut);

        assert_eq!(g2.login("wrong1"), Err(GateError::InvalidPin));
        assert_eq!(*g2.state(), GateState::LoggedOut);

        g2.login("abcdef").unwrap();
        assert_eq!(*g2.state(), GateState::Authed);
    }

    #[test]
    fn test_origin_allow_list_blocks_other_origins() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![ORIGIN.to_string()], None)
            .unwrap();

        let fresh_session = Arc::new(MemoryStore::new());
        let blocked = gate(&store, &fresh_session, "https://evil.example", None);
        assert!(matches!(blocked.state(), GateState::Blocked(msg)
            if msg.contains("https://evil.example")));

        let allowed = gate(&store, &fresh_session, ORIGIN, None);
        assert_eq!(*allowed.state(), GateState::LoggedOut);
    }

    #[test]
    fn test_admin_key_gate() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], Some("sekret".to_string()))
            .unwrap();

        let fresh_session = Arc::new(MemoryStore::new());
        assert!(matches!(
            gate(&store, &fresh_session, ORIGIN, None).state(),
            GateState::Blocked(_)
        ));
        assert!(matches!(
            gate(&store, &fresh_session, ORIGIN, Some("nope")).state(),
            GateState::Blocked(_)
        ));
        assert_eq!(
            *gate(&store, &fresh_session, ORIGIN, Some("sekret")).state(),
            GateState::LoggedOut
        );
    }

    #[test]
    fn test_empty_admin_key_is_not_stored() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], Some(String::new()))
            .unwrap();

        let record: Option<OwnerAuthRecord> = read_json(store.as_ref(), AUTH_KEY, None);
        assert!(record.unwrap().admin_key.is_none());
    }

    #[test]
    fn test_update_security_persists_without_reauth() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], None).unwrap();

        g.update_security(vec![ORIGIN.to_string()], Some("key2".to_string()))
            .unwrap();
        assert_eq!(*g.state(), GateState::Authed);

        let fresh_session = Arc::new(MemoryStore::new());
        assert!(matches!(
            gate(&store, &fresh_session, ORIGIN, None).state(),
            GateState::Blocked(_)
        ));
        assert_eq!(
            *gate(&store, &fresh_session, ORIGIN, Some("key2")).state(),
            GateState::LoggedOut
        );
    }

    #[test]
    fn test_update_security_requires_authed_state() {
        let (store, session) = stores();
        let mut g = gate(&store, &session, ORIGIN, None);
        g.setup("abcdef", "abcdef", vec![], None).unwrap();

        let fresh_session = Arc::new(MemoryStore::new());
        let mut logged_out = gate(&store, &fresh_session, ORIGIN, None);
        assert_eq!(
            logged_out.update_security(vec![], None),
            Err(GateError::NotAuthed)
        );
    }

    #[test]
    fn test_corrupt_record_degrades_to_setup() {
        let (store, session) = stores();
        store.set_raw(AUTH_KEY, "{broken");
        let g = gate(&store, &session, ORIGIN, None);
        assert_eq!(*g.state(), GateState::NeedsSetup);
    }
}
