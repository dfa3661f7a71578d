//! Process-local `UserCache` with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{UserCache, UserCacheError};
use crate::domain::{User, UserId};

struct Entry {
    user: User,
    expires_at: DateTime<Utc>,
}

/// Expiring map of cached users.
pub struct InMemoryUserCache {
    entries: Mutex<HashMap<UserId, Entry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(DefaultClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserCache for InMemoryUserCache {
    async fn get(&self, id: UserId) -> Result<Option<User>, UserCacheError> {
        let now = self.clock.utc();
        let mut entries = self.entries();
        match entries.get(&id) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.user.clone())),
            Some(_) => {
                entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, user: &User) -> Result<(), UserCacheError> {
        let expires_at = self
            .clock
            .utc()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries().insert(
            user.id,
            Entry {
                user: user.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}
