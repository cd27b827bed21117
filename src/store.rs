//! Per-user state storage.
//!
//! Sessions and booking drafts are both kept behind [`UserStore`], keyed by the
//! chat user. The in-memory implementation is what the bot runs with; a durable
//! store only needs to implement the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;

use crate::errors::StoreError;

/// Identity of a chat user, independent of the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserKey(pub u64);

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait UserStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, user: UserKey) -> Result<Option<V>, StoreError>;

    /// Store `value`, replacing whatever the user had.
    async fn put(&self, user: UserKey, value: V) -> Result<(), StoreError>;

    /// Remove and return the user's value.
    async fn take(&self, user: UserKey) -> Result<Option<V>, StoreError>;
}

pub struct InMemoryStore<V> {
    entries: Mutex<HashMap<UserKey, V>>,
}

impl<V> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> UserStore<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, user: UserKey) -> Result<Option<V>, StoreError> {
        Ok(self.entries.lock().await.get(&user).cloned())
    }

    async fn put(&self, user: UserKey, value: V) -> Result<(), StoreError> {
        self.entries.lock().await.insert(user, value);
        Ok(())
    }

    async fn take(&self, user: UserKey) -> Result<Option<V>, StoreError> {
        Ok(self.entries.lock().await.remove(&user))
    }
}
