//! Secure credential storage seam.
//!
//! Platforms back this with their keychain or keystore; the in-memory store
//! is used by the CLI and in tests.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Named slots in the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Primary identity credential for the Harmony backend
    IdentityToken,
    CapabilityAccessToken,
    CapabilityRefreshToken,
    /// RFC 3339 timestamp at which the capability token expires
    CapabilityExpiresAt,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::IdentityToken => "identity_token",
            CredentialKey::CapabilityAccessToken => "capability_access_token",
            CredentialKey::CapabilityRefreshToken => "capability_refresh_token",
            CredentialKey::CapabilityExpiresAt => "capability_expires_at",
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>>;
    async fn set(&self, key: CredentialKey, value: String) -> Result<()>;
    async fn remove(&self, key: CredentialKey) -> Result<()>;
    /// Remove every stored credential.
    async fn clear(&self) -> Result<()>;
}

/// Process-local credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: CredentialKey, value: String) -> Result<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: CredentialKey) -> Result<()> {
        self.values.write().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.values.write().await.clear();
        Ok(())
    }
}
