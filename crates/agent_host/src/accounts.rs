//! Shop-owner accounts, stored locally.
//!
//! A demo-grade user table: registration, login and a current-session
//! record, all in the key-value store. Passwords are kept as Argon2id
//! hashes; the table itself is still local-only and not a real security
//! boundary.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::store::{read_json, write_json, KvStore};
use uuid::Uuid;

use crate::credentials;

pub const USERS_KEY: &str = "shop_owners";
pub const SESSION_KEY: &str = "shop_owner_auth";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShopOwner {
    pub id: String,
    pub email: String,
    pub shop_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredOwner {
    #[serde(flatten)]
    owner: ShopOwner,
    password_hash: String,
    salt: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user: ShopOwner,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Failed to derive password hash")]
    Kdf,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn KvStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn users(&self) -> HashMap<String, StoredOwner> {
        read_json(self.store.as_ref(), USERS_KEY, HashMap::new())
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        shop_name: &str,
    ) -> Result<ShopOwner, AccountError> {
        let email = email.to_lowercase();
        let mut users = self.users();
        if users.contains_key(&email) {
            return Err(AccountError::EmailTaken);
        }

        let salt = credentials::generate_salt();
        let password_hash =
            credentials::derive_hash(password, &salt).map_err(|_| AccountError::Kdf)?;
        let owner = ShopOwner {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            shop_name: shop_name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        users.insert(
            email,
            StoredOwner {
                owner: owner.clone(),
                password_hash,
                salt: credentials::encode(&salt),
            },
        );
        write_json(self.store.as_ref(), USERS_KEY, &users);
        Ok(owner)
    }

    /// Verify credentials and record the current-session user.
    pub fn login(&self, email: &str, password: &str) -> Result<ShopOwner, AccountError> {
        let users = self.users();
        let stored = users
            .get(&email.to_lowercase())
            .ok_or(AccountError::InvalidCredentials)?;
        if !credentials::verify(password, &stored.salt, &stored.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }
        let record = SessionRecord {
            user: stored.owner.clone(),
        };
        write_json(self.store.as_ref(), SESSION_KEY, &record);
        Ok(stored.owner.clone())
    }

    pub fn logout(&self) {
        self.store.remove(SESSION_KEY);
    }

    pub fn current_user(&self) -> Option<ShopOwner> {
        let record: Option<SessionRecord> = read_json(self.store.as_ref(), SESSION_KEY, None);
        record.map(|r| r.user)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }
}
