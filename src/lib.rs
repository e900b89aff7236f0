//! Roommate Match - compatibility scoring and match lifecycle for student roommates
//!
//! The crate scores pairs of student profiles on budget, lifestyle, sleep
//! schedule and shared interests, and tracks the like/pass lifecycle of every
//! pair until it is either mutually matched or rejected.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{CompatibilityScorer, MatchCoordinator, MatchError, MatchStore, ProfileStore, StoreError};
pub use models::{MatchRecord, MatchStatus, Preferences, ScoredCandidate, ScoringWeights, UserProfile};
