use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use storage::Storage;
use tokio::sync::Mutex;

/// Key of the single persisted session entry.
pub const SESSION_TOKEN_KEY: &str = "authToken";

/// One named location holding the active session token, if any.
#[async_trait]
pub trait TokenSlot: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn store(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Process-local slot. Clones share the same value.
#[derive(Clone, Default)]
pub struct MemoryTokenSlot {
    token: Arc<Mutex<Option<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryTokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// While set, every operation fails without touching the stored value.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn current(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("token slot unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenSlot for MemoryTokenSlot {
    async fn load(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.token.lock().await.clone())
    }

    async fn store(&self, token: &str) -> Result<()> {
        self.check()?;
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.token.lock().await.take();
        Ok(())
    }
}

/// Slot persisted in the SQLite key/value table, surviving restarts.
#[derive(Clone)]
pub struct StorageTokenSlot {
    storage: Storage,
    key: String,
}

impl StorageTokenSlot {
    pub fn new(storage: Storage) -> Self {
        Self::with_key(storage, SESSION_TOKEN_KEY)
    }

    pub fn with_key(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub async fn open(database_url: &str) -> Result<Self> {
        Ok(Self::new(Storage::new(database_url).await?))
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl TokenSlot for StorageTokenSlot {
    async fn load(&self) -> Result<Option<String>> {
        self.storage.load_value(&self.key).await
    }

    async fn store(&self, token: &str) -> Result<()> {
        self.storage.save_value(&self.key, token).await
    }

    async fn clear(&self) -> Result<()> {
        self.storage.remove_value(&self.key).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/token_slot_tests.rs"]
mod tests;
