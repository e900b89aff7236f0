// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Cleanliness, MatchRecord, MatchStats, MatchStatus, PairKey, Preferences, ScoredCandidate, ScoringWeights,
    SleepSchedule, Smoking, UserProfile,
};
pub use requests::{CompatibilityRequest, MatchActionRequest, UserQuery};
pub use responses::{
    CandidatesResponse, CompatibilityResponse, ErrorResponse, HealthResponse, MatchActionResponse, MatchStatsResponse,
    MatchView, MatchesResponse,
};
