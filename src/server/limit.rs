// Connection limit module
// Caps concurrently accepted connections; the accept loop waits for a free
// slot before accepting, so extra clients queue in the listen backlog

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Slot held for the lifetime of one connection; `None` when unlimited
pub type Slot = Option<OwnedSemaphorePermit>;

pub struct ConnectionLimit {
    semaphore: Option<Arc<Semaphore>>,
}

impl ConnectionLimit {
    /// `max == 0` means unlimited
    pub fn new(max: usize) -> Self {
        let semaphore = (max > 0).then(|| Arc::new(Semaphore::new(max.min(Semaphore::MAX_PERMITS))));
        Self { semaphore }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Slot {
        let semaphore = self.semaphore.as_ref()?;
        // The semaphore is never closed, so acquisition only waits
        Arc::clone(semaphore).acquire_owned().await.ok()
    }

    /// Free slots, `None` when unlimited
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unlimited() {
        let limit = ConnectionLimit::new(0);
        assert!(limit.acquire().await.is_none());
        assert_eq!(limit.available(), None);
    }

    #[tokio::test]
    async fn test_blocks_until_slot_released() {
        let limit = ConnectionLimit::new(2);
        let first = limit.acquire().await;
        let second = limit.acquire().await;
        assert!(first.is_some() && second.is_some());
        assert_eq!(limit.available(), Some(0));

        let blocked = tokio::time::timeout(Duration::from_millis(50), limit.acquire()).await;
        assert!(blocked.is_err());

        drop(first);
        let third = tokio::time::timeout(Duration::from_millis(50), limit.acquire()).await;
        assert!(matches!(third, Ok(Some(_))));
        drop(second);
        assert_eq!(limit.available(), Some(1));
    }
}
