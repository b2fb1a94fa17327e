// [crates/spool-store/src/memory/lock_service.rs]
//! Adaptador de referencia en memoria para [`LockService`]. Advisory por
//! contrato (§6.4): RowStore sigue siendo la autoridad sobre la titularidad.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::contracts::LockService;
use crate::errors::StoreError;

struct Lease {
    owner: String,
    expires_at: Instant,
}

/// Tabla de arrendamientos en memoria, con expiración perezosa evaluada en
/// cada acceso (no hay daemon de barrido en este adaptador de referencia;
/// el barrido periódico es responsabilidad del llamador, cf. §4.9 SUPLEMENTO).
#[derive(Default)]
pub struct MemoryLockService {
    leases: RwLock<HashMap<String, Lease>>,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self { leases: RwLock::new(HashMap::new()) }
    }
}

impl LockService for MemoryLockService {
    #[instrument(skip(self))]
    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut leases = self.leases.write().expect("lock table poisoned");
        let now = Instant::now();
        if let Some(existing) = leases.get(key) {
            let still_alive = existing.expires_at > now;
            if still_alive && existing.owner != owner {
                return Ok(false);
            }
        }
        leases.insert(key.to_string(), Lease { owner: owner.to_string(), expires_at: now + ttl });
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn refresh(&self, key: &str, owner: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut leases = self.leases.write().expect("lock table poisoned");
        match leases.get_mut(key) {
            Some(lease) if lease.owner == owner => {
                lease.expires_at = Instant::now() + ttl;
                Ok(())
            }
            Some(_) => Err(StoreError::LockError(format!("refresh denied: {key} not owned by {owner}"))),
            None => Err(StoreError::LockError(format!("refresh denied: {key} has no live lease"))),
        }
    }

    #[instrument(skip(self))]
    async fn release(&self, key: &str, owner: &str) -> Result<(), StoreError> {
        let mut leases = self.leases.write().expect("lock table poisoned");
        if let Some(existing) = leases.get(key) {
            if existing.owner == owner {
                leases.remove(key);
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn inspect(&self, key: &str) -> Result<Option<String>, StoreError> {
        let leases = self.leases.read().expect("lock table poisoned");
        Ok(leases.get(key).filter(|lease| lease.expires_at > Instant::now()).map(|lease| lease.owner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_owner_denied_while_lease_alive() {
        let locks = MemoryLockService::new();
        assert!(locks.acquire("T-1", "MR(93)", Duration::from_secs(60)).await.unwrap());
        assert!(!locks.acquire("T-1", "JP(94)", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn release_frees_the_key_for_a_new_owner() {
        let locks = MemoryLockService::new();
        locks.acquire("T-1", "MR(93)", Duration::from_secs(60)).await.unwrap();
        locks.release("T-1", "MR(93)").await.unwrap();
        assert!(locks.acquire("T-1", "JP(94)", Duration::from_secs(60)).await.unwrap());
    }
}
