//! services/chat_client/src/adapters/memory_auth.rs
//!
//! An in-process authentication service implementing the `AuthService` port.
//! Accounts are keyed by email and passwords are stored as argon2 hashes.

use crate::adapters::lock;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chat_sync_core::domain::Identity;
use chat_sync_core::ports::{AuthHandler, AuthService, PortError, PortResult, Subscription};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Default)]
pub struct MemoryAuth {
    /// email -> PHC-formatted password hash
    accounts: Mutex<HashMap<String, String>>,
    current: Mutex<Option<Identity>>,
    listeners: Mutex<Vec<(CancellationToken, AuthHandler)>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<Identity> {
        lock(&self.current).clone()
    }

    fn set_current(&self, identity: Option<Identity>) {
        *lock(&self.current) = identity;
        self.notify();
    }

    /// Delivers the current state to every live listener, outside the locks.
    fn notify(&self) {
        let current = self.current_user();
        let live: Vec<AuthHandler> = {
            let mut listeners = lock(&self.listeners);
            listeners.retain(|(token, _)| !token.is_cancelled());
            listeners.iter().map(|(_, handler)| handler.clone()).collect()
        };
        for handler in live {
            handler(current.clone());
        }
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for MemoryAuth {
    fn on_auth_change(&self, handler: AuthHandler) -> Subscription {
        let (subscription, token) = Subscription::new();
        lock(&self.listeners).push((token, handler.clone()));
        handler(self.current_user());
        subscription
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Identity> {
        let stored_hash = lock(&self.accounts)
            .get(email)
            .cloned()
            .ok_or(PortError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&stored_hash).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            PortError::Unexpected("Authentication error".to_string())
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::Unauthorized)?;

        let identity = Identity::new(email);
        info!("Signed in as {}", identity);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Identity> {
        if !email.contains('@') {
            return Err(PortError::Invalid(format!("'{}' is not an email address", email)));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(PortError::Invalid(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })?
            .to_string();

        {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(email) {
                return Err(PortError::Invalid(format!("{} is already registered", email)));
            }
            accounts.insert(email.to_string(), password_hash);
        }

        let identity = Identity::new(email);
        info!("Created account {}", identity);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if let Some(identity) = self.current_user() {
            info!("Signing out {}", identity);
        }
        self.set_current(None);
        Ok(())
    }
}
