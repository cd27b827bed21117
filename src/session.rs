//! Login sessions of chat users.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::Clock;
use crate::errors::StoreError;
use crate::store::{UserKey, UserStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub logged_in_at: NaiveDateTime,
}

/// Session bookkeeping on top of a [`UserStore`].
///
/// A user without a stored session, or whose session has outlived the
/// configured TTL, is not authenticated.
pub struct SessionStore {
    store: Arc<dyn UserStore<Session>>,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn UserStore<Session>>, clock: Arc<dyn Clock>, ttl: Option<Duration>) -> Self {
        Self { store, clock, ttl }
    }

    pub async fn record_login(&self, user: UserKey, token: String, email: String) -> Result<(), StoreError> {
        debug!(user_id = %user, "Recording login session");
        let session = Session {
            token,
            email,
            logged_in_at: self.clock.now(),
        };
        self.store.put(user, session).await
    }

    /// The live session of `user`, evicting it when expired.
    pub async fn session(&self, user: UserKey) -> Result<Option<Session>, StoreError> {
        let Some(session) = self.store.get(user).await? else {
            return Ok(None);
        };

        if session.token.is_empty() {
            return Ok(None);
        }

        if let Some(ttl) = self.ttl {
            let age = self.clock.now() - session.logged_in_at;
            if age.to_std().map_or(false, |age| age >= ttl) {
                debug!(user_id = %user, "Session expired, evicting");
                self.store.take(user).await?;
                return Ok(None);
            }
        }

        Ok(Some(session))
    }

    pub async fn is_authenticated(&self, user: UserKey) -> Result<bool, StoreError> {
        Ok(self.session(user).await?.is_some())
    }

    pub async fn token(&self, user: UserKey) -> Result<Option<String>, StoreError> {
        Ok(self.session(user).await?.map(|s| s.token))
    }

    pub async fn email(&self, user: UserKey) -> Result<Option<String>, StoreError> {
        Ok(self.session(user).await?.map(|s| s.email))
    }

    pub async fn logout(&self, user: UserKey) -> Result<bool, StoreError> {
        Ok(self.store.take(user).await?.is_some())
    }
}
