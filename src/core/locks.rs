use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};
use crate::models::PairKey;

pub const DEFAULT_LOCK_STRIPES: usize = 64;

/// Striped async locks keyed by user pair
///
/// Every operation on a pair holds its stripe for the whole
/// read-decide-write sequence. Unrelated pairs may share a stripe; each
/// operation takes exactly one stripe so this cannot deadlock.
pub struct PairLocks {
    stripes: Vec<Mutex<()>>,
}

impl PairLocks {
    pub fn new(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1)).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    fn stripe_for(&self, pair: &PairKey) -> usize {
        let mut hasher = DefaultHasher::new();
        pair.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    pub async fn lock(&self, pair: &PairKey) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_for(pair)].lock().await
    }
}

impl Default for PairLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_STRIPES)
    }
}
