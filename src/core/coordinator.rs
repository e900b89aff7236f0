use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::core::locks::{PairLocks, DEFAULT_LOCK_STRIPES};
use crate::core::matcher::{sort_and_truncate, DEFAULT_MAX_CANDIDATES};
use crate::core::scoring::CompatibilityScorer;
use crate::core::store::{MatchStore, ProfileStore, StoreError};
use crate::models::{MatchRecord, MatchStats, MatchStatus, PairKey, ScoredCandidate, UserProfile};
use crate::services::CacheManager;

/// Errors surfaced by match operations
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User {0} cannot like or pass themselves")]
    SelfMatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Upper bound on the pause between conflicting attempts
const MAX_CONFLICT_BACKOFF: Duration = Duration::from_millis(50);

/// Tunables for the coordinator
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub max_candidates: usize,
    /// Conflicts retried immediately before attempts start backing off
    pub conflict_backoff_after: u32,
    pub lock_stripes: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            conflict_backoff_after: 5,
            lock_stripes: DEFAULT_LOCK_STRIPES,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Like,
    Pass,
}

/// Owns the match lifecycle for every user pair
///
/// # Lifecycle
/// - first like creates a `Liked` record, first pass a `Rejected` one
/// - a like from the other side promotes the record to `Matched`
/// - a pass rejects the pair whatever its state; rejected and matched
///   records ignore further likes
///
/// Each like/pass holds the pair's lock for the whole read-decide-write.
/// A version conflict means another writer got there first, so the action
/// re-reads and tries again until it lands; it never fails on a conflict.
pub struct MatchCoordinator {
    profiles: Arc<dyn ProfileStore>,
    matches: Arc<dyn MatchStore>,
    scorer: CompatibilityScorer,
    cache: Option<Arc<CacheManager>>,
    cache_scope: String,
    locks: PairLocks,
    options: CoordinatorOptions,
}

impl MatchCoordinator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        matches: Arc<dyn MatchStore>,
        scorer: CompatibilityScorer,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            profiles,
            matches,
            cache_scope: scorer.weights().fingerprint(),
            scorer,
            cache: None,
            locks: PairLocks::new(options.lock_stripes),
            options,
        }
    }

    /// Cache pair scores in `cache`
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn scorer(&self) -> &CompatibilityScorer {
        &self.scorer
    }

    /// Score two profiles directly
    pub fn compute_score(&self, a: &UserProfile, b: &UserProfile) -> f64 {
        self.scorer.score(a, b)
    }

    /// Score two users by id
    pub async fn compute_score_for(&self, user_id: &str, target_id: &str) -> Result<f64, MatchError> {
        let (user, target) = self.resolve_pair(user_id, target_id).await?;
        Ok(self.cached_score(&user, &target).await)
    }

    /// Record that `user_id` likes `target_id`
    pub async fn like(&self, user_id: &str, target_id: &str) -> Result<MatchRecord, MatchError> {
        self.act(Action::Like, user_id, target_id).await
    }

    /// Record that `user_id` passes on `target_id`
    pub async fn pass(&self, user_id: &str, target_id: &str) -> Result<MatchRecord, MatchError> {
        self.act(Action::Pass, user_id, target_id).await
    }

    /// Unevaluated users ranked by compatibility, best first
    pub async fn candidates(&self, user_id: &str) -> Result<Vec<ScoredCandidate>, MatchError> {
        let user = self.resolve(user_id).await?;

        let paired_with: HashSet<String> = self
            .matches
            .find_by_user(user_id)
            .await?
            .iter()
            .filter_map(|record| record.counterpart(user_id).map(str::to_string))
            .collect();

        let candidate_ids = self.matches.find_candidate_users(user_id, &paired_with).await?;
        let profiles = self.profiles.get_profiles(&candidate_ids).await?;
        let total = profiles.len();

        let mut scored = Vec::with_capacity(total);
        for profile in profiles {
            if !profile.is_active || profile.user_id == user_id || paired_with.contains(&profile.user_id) {
                continue;
            }
            let compatibility_score = self.cached_score(&user, &profile).await;
            scored.push(ScoredCandidate { profile, compatibility_score });
        }

        let ranked = sort_and_truncate(scored, self.options.max_candidates);
        tracing::debug!(
            "Ranked {} candidates for user {} (from {}, excluding {} evaluated)",
            ranked.len(),
            user_id,
            total,
            paired_with.len()
        );
        Ok(ranked)
    }

    /// Every record involving `user_id`
    pub async fn matches_for(&self, user_id: &str) -> Result<Vec<MatchRecord>, MatchError> {
        Ok(self.matches.find_by_user(user_id).await?)
    }

    /// Records involving `user_id` that are mutually matched
    pub async fn matched_pairs_for(&self, user_id: &str) -> Result<Vec<MatchRecord>, MatchError> {
        Ok(self.matches.find_by_user_and_status(user_id, MatchStatus::Matched).await?)
    }

    pub async fn stats_for(&self, user_id: &str) -> Result<MatchStats, MatchError> {
        let records = self.matches.find_by_user(user_id).await?;
        Ok(MatchStats::from_records(user_id, &records))
    }

    /// Forget cached scores after `user_id`'s profile changed
    pub async fn invalidate_scores(&self, user_id: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_user_scores(user_id).await {
                tracing::warn!("Failed to invalidate cached scores for {}: {}", user_id, e);
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        self.matches.health_check().await
    }

    async fn act(&self, action: Action, user_id: &str, target_id: &str) -> Result<MatchRecord, MatchError> {
        if user_id == target_id {
            return Err(MatchError::SelfMatch(user_id.to_string()));
        }
        let (user, target) = self.resolve_pair(user_id, target_id).await?;

        let pair = PairKey::new(user_id, target_id);
        let _guard = self.locks.lock(&pair).await;

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let result = match action {
                Action::Like => self.try_like(&user, &target).await,
                Action::Pass => self.try_pass(&user, &target).await,
            };

            match result {
                Err(MatchError::Store(StoreError::Conflict(key))) => {
                    tracing::debug!("Version conflict on pair {} ({:?}), retry {}", key, action, attempt);
                    if let Some(pause) = conflict_backoff(attempt, self.options.conflict_backoff_after) {
                        tokio::time::sleep(pause).await;
                    }
                }
                other => return other,
            }
        }
    }

    async fn try_like(&self, user: &UserProfile, target: &UserProfile) -> Result<MatchRecord, MatchError> {
        let now = Utc::now();

        let record = match self.matches.find_record(&user.user_id, &target.user_id).await? {
            None => {
                let score = self.cached_score(user, target).await;
                MatchRecord::liked(&user.user_id, &target.user_id, score, now)
            }
            Some(mut existing) => {
                if !existing.apply_like(&user.user_id, now) {
                    tracing::debug!(
                        "Like {} -> {} is a no-op on {} record",
                        user.user_id,
                        target.user_id,
                        existing.status
                    );
                    return Ok(existing);
                }
                existing
            }
        };

        let saved = self.matches.save(record).await?;
        if saved.status == MatchStatus::Matched {
            tracing::info!(
                "Mutual match between {} and {} (score {:.2})",
                saved.user_a_id,
                saved.user_b_id,
                saved.compatibility_score
            );
        } else {
            tracing::debug!("User {} liked {}", user.user_id, target.user_id);
        }
        Ok(saved)
    }

    async fn try_pass(&self, user: &UserProfile, target: &UserProfile) -> Result<MatchRecord, MatchError> {
        let now = Utc::now();

        let record = match self.matches.find_record(&user.user_id, &target.user_id).await? {
            None => MatchRecord::passed(&user.user_id, &target.user_id, now),
            Some(mut existing) => {
                let previous = existing.status;
                if !existing.apply_pass(&user.user_id, now) {
                    return Ok(existing);
                }
                if previous == MatchStatus::Matched {
                    tracing::info!("User {} dissolved match with {}", user.user_id, target.user_id);
                }
                existing
            }
        };

        let saved = self.matches.save(record).await?;
        tracing::debug!("User {} passed on {}", user.user_id, target.user_id);
        Ok(saved)
    }

    async fn resolve(&self, user_id: &str) -> Result<UserProfile, MatchError> {
        self.profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(user_id.to_string()))
    }

    async fn resolve_pair(&self, user_id: &str, target_id: &str) -> Result<(UserProfile, UserProfile), MatchError> {
        let user = self.resolve(user_id).await?;
        let target = self.resolve(target_id).await?;
        Ok((user, target))
    }

    async fn cached_score(&self, a: &UserProfile, b: &UserProfile) -> f64 {
        let Some(cache) = &self.cache else {
            return self.scorer.score(a, b);
        };

        if let Some(score) = cache.get_score(&self.cache_scope, &a.user_id, &b.user_id).await {
            return score;
        }
        let score = self.scorer.score(a, b);
        cache.set_score(&self.cache_scope, &a.user_id, &b.user_id, score).await;
        score
    }
}

/// Pause before the next attempt, growing by a millisecond per conflict
/// once `after` conflicts have been retried immediately
fn conflict_backoff(attempt: u32, after: u32) -> Option<Duration> {
    let excess = attempt.checked_sub(after).filter(|n| *n > 0)?;
    Some(Duration::from_millis(u64::from(excess)).min(MAX_CONFLICT_BACKOFF))
}
