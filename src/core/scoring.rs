use crate::models::{Preferences, ScoringWeights, UserProfile};

/// Sub-score used whenever either side is missing the relevant data
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Weighted roommate compatibility scorer
///
/// Scoring formula:
/// score = (
///     budget_score * 0.30 +        # Closer budgets = higher
///     lifestyle_score * 0.20 +     # Cleanliness + smoking agreement
///     sleep_score * 0.20 +         # Same or adjacent sleep schedule
///     interests_score * 0.30       # Jaccard overlap of interest tags
/// )
///
/// Every sub-score lies in [0, 100] and is symmetric in its arguments, so the
/// total is too. The result is rounded to two decimals.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityScorer {
    weights: ScoringWeights,
}

impl CompatibilityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score two profiles. Never fails; a non-finite result degrades to 50.
    pub fn score(&self, a: &UserProfile, b: &UserProfile) -> f64 {
        self.score_preferences(&a.preferences, &b.preferences)
    }

    pub fn score_preferences(&self, a: &Preferences, b: &Preferences) -> f64 {
        let total = budget_score(a, b) * self.weights.budget
            + lifestyle_score(a, b) * self.weights.lifestyle
            + sleep_score(a, b) * self.weights.sleep
            + interests_score(a, b) * self.weights.interests;

        if !total.is_finite() {
            tracing::warn!("Non-finite compatibility score, using neutral default");
            return NEUTRAL_SCORE;
        }

        round_to_cents(total.clamp(0.0, 100.0))
    }
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

/// Round half-up to two decimal places
#[inline]
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Budget score (0-100)
/// Drops by one point per percent of difference relative to the mean budget
#[inline]
fn budget_score(a: &Preferences, b: &Preferences) -> f64 {
    let (Some(b1), Some(b2)) = (a.budget, b.budget) else {
        return NEUTRAL_SCORE;
    };

    let (b1, b2) = (b1 as f64, b2 as f64);
    let avg = (b1 + b2) / 2.0;
    if avg <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let percent_diff = (b1 - b2).abs() / avg * 100.0;
    (100.0 - percent_diff).max(0.0)
}

/// Lifestyle score (0-100)
#[inline]
fn lifestyle_score(a: &Preferences, b: &Preferences) -> f64 {
    let mut score = NEUTRAL_SCORE;

    if let (Some(c1), Some(c2)) = (a.cleanliness, b.cleanliness) {
        if c1 == c2 {
            score += 25.0;
        } else if c1.is_adjacent(c2) {
            score += 15.0;
        }
    }

    if let (Some(s1), Some(s2)) = (a.smoking, b.smoking) {
        if s1 == s2 {
            score += 25.0;
        }
    }

    score.min(100.0)
}

/// Sleep schedule score (0-100)
#[inline]
fn sleep_score(a: &Preferences, b: &Preferences) -> f64 {
    match (a.sleep, b.sleep) {
        (Some(s1), Some(s2)) if s1 == s2 => 100.0,
        (Some(s1), Some(s2)) if s1.is_adjacent(s2) => 75.0,
        (Some(_), Some(_)) => 25.0,
        _ => NEUTRAL_SCORE,
    }
}

/// Shared interests score (0-100), Jaccard similarity of the tag sets
#[inline]
fn interests_score(a: &Preferences, b: &Preferences) -> f64 {
    let (Some(i1), Some(i2)) = (&a.interests, &b.interests) else {
        return NEUTRAL_SCORE;
    };
    if i1.is_empty() || i2.is_empty() {
        return NEUTRAL_SCORE;
    }

    let intersection = i1.intersection(i2).count();
    let union = i1.union(i2).count();

    intersection as f64 / union as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cleanliness, SleepSchedule, Smoking};

    fn prefs(
        budget: Option<i64>,
        cleanliness: Option<Cleanliness>,
        smoking: Option<Smoking>,
        sleep: Option<SleepSchedule>,
        interests: &[&str],
    ) -> Preferences {
        Preferences {
            budget,
            cleanliness,
            smoking,
            sleep,
            interests: if interests.is_empty() {
                None
            } else {
                Some(interests.iter().map(|s| s.to_string()).collect())
            },
        }
    }

    #[test]
    fn test_empty_profiles_score_neutral() {
        let scorer = CompatibilityScorer::default();
        let score = scorer.score_preferences(&Preferences::default(), &Preferences::default());
        assert_eq!(score, 50.0);
    }

    #[test]
    fn test_reference_pair() {
        let scorer = CompatibilityScorer::default();
        let a = prefs(Some(10000), Some(Cleanliness::High), Some(Smoking::No), Some(SleepSchedule::Normal), &["books", "gym"]);
        let b = prefs(Some(11000), Some(Cleanliness::High), Some(Smoking::No), Some(SleepSchedule::Normal), &["books", "music"]);

        assert_eq!(scorer.score_preferences(&a, &b), 77.14);
        assert_eq!(scorer.score_preferences(&b, &a), 77.14);
    }

    #[test]
    fn test_budget_score() {
        let a = prefs(Some(1000), None, None, None, &[]);
        let b = prefs(Some(1000), None, None, None, &[]);
        assert_eq!(budget_score(&a, &b), 100.0);

        // More than double the average apart bottoms out at zero
        let far = prefs(Some(10), None, None, None, &[]);
        let rich = prefs(Some(100_000), None, None, None, &[]);
        assert_eq!(budget_score(&far, &rich), 0.0);

        assert_eq!(budget_score(&a, &Preferences::default()), NEUTRAL_SCORE);
    }

    #[test]
    fn test_lifestyle_score() {
        let high_no = prefs(None, Some(Cleanliness::High), Some(Smoking::No), None, &[]);
        let medium_no = prefs(None, Some(Cleanliness::Medium), Some(Smoking::No), None, &[]);
        let low_yes = prefs(None, Some(Cleanliness::Low), Some(Smoking::Yes), None, &[]);

        assert_eq!(lifestyle_score(&high_no, &high_no), 100.0);
        assert_eq!(lifestyle_score(&high_no, &medium_no), 90.0);
        assert_eq!(lifestyle_score(&high_no, &low_yes), 50.0);
        assert_eq!(lifestyle_score(&medium_no, &low_yes), 65.0);
        assert_eq!(lifestyle_score(&high_no, &Preferences::default()), 50.0);
    }

    #[test]
    fn test_sleep_score() {
        let early = prefs(None, None, None, Some(SleepSchedule::Early), &[]);
        let normal = prefs(None, None, None, Some(SleepSchedule::Normal), &[]);
        let late = prefs(None, None, None, Some(SleepSchedule::Late), &[]);

        assert_eq!(sleep_score(&early, &early), 100.0);
        assert_eq!(sleep_score(&early, &normal), 75.0);
        assert_eq!(sleep_score(&late, &normal), 75.0);
        assert_eq!(sleep_score(&early, &late), 25.0);
        assert_eq!(sleep_score(&early, &Preferences::default()), NEUTRAL_SCORE);
    }

    #[test]
    fn test_interests_score() {
        let a = prefs(None, None, None, None, &["books", "gym"]);
        let b = prefs(None, None, None, None, &["books", "gym"]);
        let c = prefs(None, None, None, None, &["chess"]);
        let empty = Preferences {
            interests: Some(Default::default()),
            ..Preferences::default()
        };

        assert_eq!(interests_score(&a, &b), 100.0);
        assert_eq!(interests_score(&a, &c), 0.0);
        assert_eq!(interests_score(&a, &empty), NEUTRAL_SCORE);
    }

    #[test]
    fn test_score_is_bounded_and_symmetric() {
        let scorer = CompatibilityScorer::default();
        let samples = vec![
            Preferences::default(),
            prefs(Some(1), Some(Cleanliness::Low), Some(Smoking::Yes), Some(SleepSchedule::Early), &["a"]),
            prefs(Some(i64::MAX), Some(Cleanliness::High), Some(Smoking::No), Some(SleepSchedule::Late), &["b", "c"]),
            prefs(Some(500), None, Some(Smoking::No), None, &["a", "c"]),
        ];

        for a in &samples {
            for b in &samples {
                let ab = scorer.score_preferences(a, b);
                let ba = scorer.score_preferences(b, a);
                assert_eq!(ab, ba);
                assert!((0.0..=100.0).contains(&ab), "score out of range: {}", ab);
            }
        }
    }

    #[test]
    fn test_custom_weights_are_normalized() {
        let scorer = CompatibilityScorer::new(ScoringWeights {
            budget: 1.0,
            lifestyle: 0.0,
            sleep: 0.0,
            interests: 0.0,
        });
        let a = prefs(Some(1000), None, None, Some(SleepSchedule::Early), &[]);
        let b = prefs(Some(1000), None, None, Some(SleepSchedule::Late), &[]);

        assert_eq!(scorer.score_preferences(&a, &b), 100.0);
    }

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(77.142857), 77.14);
        assert_eq!(round_to_cents(10.005000001), 10.01);
        assert_eq!(round_to_cents(50.0), 50.0);
    }
}
