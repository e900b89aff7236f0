use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use crate::models::{MatchRecord, MatchStatus, UserProfile};

/// Errors surfaced by profile and match stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed (or appeared) since it was read
    #[error("Concurrent modification of match record for pair {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Read access to user profiles, owned by the user-management subsystem
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Fetch several profiles, preserving the order of `user_ids` and
    /// skipping ids that do not resolve
    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>, StoreError> {
        let mut profiles = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(profile) = self.get_profile(user_id).await? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}

/// Persistence for match records
///
/// `save` is a compare-and-swap: a record with `version == 0` is inserted
/// and fails with [`StoreError::Conflict`] if the pair already has a record;
/// otherwise the stored version must equal `record.version`. The returned
/// record carries the new version.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Order-independent lookup of the record for a pair
    async fn find_record(&self, user_a: &str, user_b: &str) -> Result<Option<MatchRecord>, StoreError>;

    async fn save(&self, record: MatchRecord) -> Result<MatchRecord, StoreError>;

    /// Active users other than `excluding_user_id` and not in `excluding_paired_with`,
    /// newest profile first
    async fn find_candidate_users(
        &self,
        excluding_user_id: &str,
        excluding_paired_with: &HashSet<String>,
    ) -> Result<Vec<String>, StoreError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<MatchRecord>, StoreError>;

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: MatchStatus,
    ) -> Result<Vec<MatchRecord>, StoreError>;

    async fn health_check(&self) -> bool {
        true
    }
}
