//! Authentication Module
//!
//! Provides username/password authentication against a static user table,
//! with passwords stored either as plaintext or as an argon2 PHC hash.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::AuthConfig;
use crate::hooks::{HookResult, Hooks};


/// Authentication provider
pub struct AuthProvider {
    /// Whether auth is enabled
    enabled: bool,
    /// Allow anonymous connections
    allow_anonymous: bool,
    /// User credentials map (username -> UserEntry)
    users: HashMap<String, UserEntry>,
    /// Connected client usernames (for downstream lookups)
    client_usernames: Arc<RwLock<HashMap<String, Option<String>>>>,
}

/// Internal user credential record
enum UserEntry {
    Plaintext(String),
    Hashed(String),
}

impl AuthProvider {
    /// Create a new auth provider from configuration
    pub fn new(config: &AuthConfig) -> Self {
        let mut users = HashMap::new();

        for user in &config.users {
            let entry = match (&user.password, &user.password_hash) {
                (Some(pwd), _) => UserEntry::Plaintext(pwd.clone()),
                (None, Some(hash)) => UserEntry::Hashed(hash.clone()),
                (None, None) => continue,
            };
            users.insert(user.username.clone(), entry);
        }

        Self {
            enabled: config.enabled,
            allow_anonymous: config.allow_anonymous,
            users,
            client_usernames: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if auth is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the username for a connected client
    pub fn get_client_username(&self, client_id: &str) -> Option<String> {
        self.client_usernames
            .read()
            .get(client_id)
            .and_then(|u| u.clone())
    }

    /// Verify a password against a stored credential
    fn verify_password(&self, password: &[u8], stored: &UserEntry) -> bool {
        match stored {
            UserEntry::Plaintext(expected) => match std::str::from_utf8(password) {
                Ok(pwd) => pwd == expected,
                Err(_) => false,
            },
            UserEntry::Hashed(phc) => {
                let Ok(parsed) = PasswordHash::new(phc) else {
                    return false;
                };
                Argon2::default()
                    .verify_password(password, &parsed)
                    .is_ok()
            }
        }
    }

    /// Store client username mapping
    fn store_client_username(&self, client_id: &str, username: Option<&str>) {
        self.client_usernames
            .write()
            .insert(client_id.to_string(), username.map(|s| s.to_string()));
    }

    /// Remove client username mapping
    pub fn remove_client_username(&self, client_id: &str) {
        self.client_usernames.write().remove(client_id);
    }
}

#[async_trait]
impl Hooks for AuthProvider {
    async fn on_authenticate(
        &self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> HookResult<bool> {
        // If auth is disabled, allow all
        if !self.enabled {
            self.store_client_username(client_id, username);
            return Ok(true);
        }

        // Check for anonymous connection
        let Some(username) = username else {
            return if self.allow_anonymous {
                self.store_client_username(client_id, None);
                Ok(true)
            } else {
                Ok(false)
            };
        };

        let password = password.unwrap_or(&[]);

        // Look up user; unknown usernames are always rejected
        let Some(entry) = self.users.get(username) else {
            return Ok(false);
        };

        if self.verify_password(password, entry) {
            self.store_client_username(client_id, Some(username));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn on_client_disconnected(&self, client_id: &str, _graceful: bool) {
        self.remove_client_username(client_id);
    }
}
