/// Per-user mutual exclusion
use refrain_core::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user, created on first use
///
/// Holding the guard serializes every operation on that user's resource
/// while leaving other users untouched. Entries nobody holds or waits on
/// are dropped the next time any lock is taken.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take `user_id`'s lock
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().await;
            // Holders and waiters each keep a clone of the Arc
            map.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            Arc::clone(map.entry(user_id).or_default())
        };

        mutex.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
