use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use crate::core::store::{MatchStore, ProfileStore, StoreError};
use crate::models::{MatchRecord, MatchStatus, PairKey, UserProfile};

#[derive(Default)]
struct MemoryState {
    // Insertion order breaks created_at ties
    profiles: Vec<UserProfile>,
    records: HashMap<PairKey, MatchRecord>,
}

/// Process-local profile and match store
///
/// Implements the same versioning rules as the Postgres store, so it is
/// interchangeable for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile
    pub async fn upsert_profile(&self, profile: UserProfile) {
        let mut state = self.state.write().await;
        match state.profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => *existing = profile,
            None => state.profiles.push(profile),
        }
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn find_record(&self, user_a: &str, user_b: &str) -> Result<Option<MatchRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.records.get(&PairKey::new(user_a, user_b)).cloned())
    }

    async fn save(&self, mut record: MatchRecord) -> Result<MatchRecord, StoreError> {
        let pair = record.pair();
        let mut state = self.state.write().await;

        let stored_version = state.records.get(&pair).map(|r| r.version);
        match (record.version, stored_version) {
            (0, None) => {}
            (expected, Some(current)) if expected == current => {}
            _ => return Err(StoreError::Conflict(pair.to_string())),
        }

        record.version += 1;
        state.records.insert(pair, record.clone());
        tracing::debug!("Saved match record {} ({}) v{}", record.id, record.status, record.version);
        Ok(record)
    }

    async fn find_candidate_users(
        &self,
        excluding_user_id: &str,
        excluding_paired_with: &HashSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;

        let mut candidates: Vec<(usize, &UserProfile)> = state
            .profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.is_active && p.user_id != excluding_user_id && !excluding_paired_with.contains(&p.user_id)
            })
            .collect();

        // Newest first; later insertion wins a timestamp tie
        candidates.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        Ok(candidates.into_iter().map(|(_, p)| p.user_id.clone()).collect())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<MatchRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<MatchRecord> = state.records.values().filter(|r| r.involves(user_id)).cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: MatchStatus,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let records = self.find_by_user(user_id).await?;
        Ok(records.into_iter().filter(|r| r.status == status).collect())
    }
}
