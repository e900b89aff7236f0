use crate::core::scoring::CompatibilityScorer;
use crate::models::{ScoredCandidate, UserProfile};

/// Default cap on the number of candidates returned per request
pub const DEFAULT_MAX_CANDIDATES: usize = 20;

/// Score every candidate against `user` and keep the best `limit`
///
/// Candidates arrive in store order (newest profile first). Self and
/// inactive profiles are skipped even if the store returned them.
pub fn rank_candidates(
    scorer: &CompatibilityScorer,
    user: &UserProfile,
    candidates: Vec<UserProfile>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    let scored = candidates
        .into_iter()
        .filter(|profile| profile.is_active && profile.user_id != user.user_id)
        .map(|profile| {
            let compatibility_score = scorer.score(user, &profile);
            ScoredCandidate {
                profile,
                compatibility_score,
            }
        })
        .collect();

    sort_and_truncate(scored, limit)
}

/// Sort by score (descending) and cut to `limit`
///
/// The sort is stable, so equal scores keep their incoming order.
pub fn sort_and_truncate(mut scored: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| {
        b.compatibility_score
            .partial_cmp(&a.compatibility_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Preferences, SleepSchedule};

    fn scored(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            profile: UserProfile::new(id, Preferences::default()),
            compatibility_score: score,
        }
    }

    fn ids(result: &[ScoredCandidate]) -> Vec<&str> {
        result.iter().map(|c| c.profile.user_id.as_str()).collect()
    }

    #[test]
    fn test_sorted_descending() {
        let result = sort_and_truncate(vec![scored("low", 10.0), scored("high", 90.0), scored("mid", 50.0)], 20);
        assert_eq!(ids(&result), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_ties_keep_incoming_order() {
        let result = sort_and_truncate(
            vec![scored("first", 50.0), scored("top", 70.0), scored("second", 50.0), scored("third", 50.0)],
            20,
        );
        assert_eq!(ids(&result), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn test_respects_limit() {
        let candidates: Vec<ScoredCandidate> = (0..30).map(|i| scored(&i.to_string(), i as f64)).collect();
        let result = sort_and_truncate(candidates, 20);

        assert_eq!(result.len(), 20);
        assert_eq!(result[0].profile.user_id, "29");
    }

    #[test]
    fn test_rank_candidates_skips_self_and_inactive() {
        let scorer = CompatibilityScorer::default();
        let me = UserProfile::new("me", Preferences { sleep: Some(SleepSchedule::Early), ..Default::default() });

        let mut inactive = UserProfile::new("gone", Preferences::default());
        inactive.is_active = false;
        let same = UserProfile::new("same", Preferences { sleep: Some(SleepSchedule::Early), ..Default::default() });
        let opposite = UserProfile::new("opposite", Preferences { sleep: Some(SleepSchedule::Late), ..Default::default() });

        let result = rank_candidates(&scorer, &me, vec![me.clone(), inactive, opposite, same], 20);

        assert_eq!(ids(&result), vec!["same", "opposite"]);
        assert!(result[0].compatibility_score > result[1].compatibility_score);
    }
}
