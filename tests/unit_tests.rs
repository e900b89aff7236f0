// Unit tests for the compatibility scorer through the public API

use roommate_match::core::CompatibilityScorer;
use roommate_match::models::{Cleanliness, Preferences, ScoringWeights, SleepSchedule, Smoking, UserProfile};

fn profile_from_json(id: &str, json: &str) -> UserProfile {
    UserProfile::new(id, Preferences::from_json(Some(json)))
}

#[test]
fn test_reference_scenario() {
    let scorer = CompatibilityScorer::default();
    let a = profile_from_json(
        "a",
        r#"{"budget": 10000, "cleanliness": "high", "smoking": "no", "sleep": "normal", "interests": ["books", "gym"]}"#,
    );
    let b = profile_from_json(
        "b",
        r#"{"budget": 11000, "cleanliness": "high", "smoking": "no", "sleep": "normal", "interests": ["books", "music"]}"#,
    );

    assert_eq!(scorer.score(&a, &b), 77.14);
}

#[test]
fn test_no_preferences_scores_fifty() {
    let scorer = CompatibilityScorer::default();
    let a = UserProfile::new("a", Preferences::default());
    let b = UserProfile::new("b", Preferences::default());

    assert_eq!(scorer.score(&a, &b), 50.0);
}

#[test]
fn test_malformed_preferences_degrade_to_defaults() {
    let scorer = CompatibilityScorer::default();
    let broken = profile_from_json("broken", "{\"budget\": ");
    let empty = UserProfile::new("empty", Preferences::default());

    assert_eq!(scorer.score(&broken, &empty), 50.0);
}

#[test]
fn test_one_sided_preferences_stay_neutral() {
    let scorer = CompatibilityScorer::default();
    let full = profile_from_json(
        "full",
        r#"{"budget": 800, "cleanliness": "low", "smoking": "yes", "sleep": "late", "interests": ["gaming"]}"#,
    );
    let empty = UserProfile::new("empty", Preferences::default());

    assert_eq!(scorer.score(&full, &empty), 50.0);
}

#[test]
fn test_worst_case_pair() {
    let scorer = CompatibilityScorer::default();
    let a = UserProfile::new(
        "a",
        Preferences {
            budget: Some(100),
            cleanliness: Some(Cleanliness::Low),
            smoking: Some(Smoking::Yes),
            sleep: Some(SleepSchedule::Early),
            interests: Some(["chess".to_string()].into_iter().collect()),
        },
    );
    let b = UserProfile::new(
        "b",
        Preferences {
            budget: Some(10_000),
            cleanliness: Some(Cleanliness::High),
            smoking: Some(Smoking::No),
            sleep: Some(SleepSchedule::Late),
            interests: Some(["rowing".to_string()].into_iter().collect()),
        },
    );

    // budget 0, lifestyle 50, sleep 25, interests 0
    assert_eq!(scorer.score(&a, &b), 15.0);
    assert_eq!(scorer.score(&b, &a), 15.0);
}

#[test]
fn test_configured_weights_shift_the_score() {
    let interests_only = CompatibilityScorer::new(ScoringWeights {
        budget: 0.0,
        lifestyle: 0.0,
        sleep: 0.0,
        interests: 2.0,
    });
    let a = profile_from_json("a", r#"{"interests": ["books", "gym"], "budget": 100}"#);
    let b = profile_from_json("b", r#"{"interests": ["gym", "books"], "budget": 900}"#);

    assert_eq!(interests_only.score(&a, &b), 100.0);
}
