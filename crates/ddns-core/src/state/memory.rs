// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Holds the cached IP for the lifetime of the process only. Useful for
// embedding the reconciler in a long-lived host and for tests.
//
// ## Crash Behavior
//
// - The cached value is lost on restart
// - The first run afterwards always lists records (no short-circuit)

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::StateStore;

/// In-memory state store implementation
///
/// Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<Ipv4Addr>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `ip`
    pub fn with_ip(ip: Ipv4Addr) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(ip))),
        }
    }

    /// Forget the cached value
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_last_ip(&self) -> Result<Option<Ipv4Addr>, Error> {
        Ok(*self.inner.read().await)
    }

    async fn set_last_ip(&self, ip: Ipv4Addr) -> Result<(), Error> {
        *self.inner.write().await = Some(ip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get_last_ip().await.unwrap(), None);

        let ip: Ipv4Addr = "203.0.113.7".parse().unwrap();
        store.set_last_ip(ip).await.unwrap();
        assert_eq!(store.get_last_ip().await.unwrap(), Some(ip));

        store.clear().await;
        assert_eq!(store.get_last_ip().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryStateStore::with_ip("192.0.2.1".parse().unwrap());
        let clone = store.clone();

        clone.set_last_ip("192.0.2.2".parse().unwrap()).await.unwrap();
        assert_eq!(
            store.get_last_ip().await.unwrap(),
            Some("192.0.2.2".parse().unwrap())
        );
    }
}
