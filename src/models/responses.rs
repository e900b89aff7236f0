use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::{MatchRecord, MatchStats, MatchStatus, ScoredCandidate};

/// Response for the candidates endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<ScoredCandidate>,
    pub total_results: usize,
}

/// A match record presented from one member's perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "compatibilityScore")]
    pub compatibility_score: f64,
    pub status: MatchStatus,
    #[serde(rename = "likedByMe")]
    pub liked_by_me: bool,
    #[serde(rename = "likedByThem")]
    pub liked_by_them: bool,
    #[serde(rename = "matchedAt")]
    pub matched_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MatchView {
    pub fn for_user(record: &MatchRecord, viewer: &str) -> Self {
        let counterpart = record.counterpart(viewer).unwrap_or_default().to_string();
        Self {
            id: record.id,
            liked_by_me: record.has_liked(viewer),
            liked_by_them: record.has_liked(&counterpart),
            user_id: counterpart,
            compatibility_score: record.compatibility_score,
            status: record.status,
            matched_at: record.matched_at,
            created_at: record.created_at,
        }
    }
}

/// Response for the list-matches endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchView>,
    pub count: usize,
}

/// Response for like/pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchActionResponse {
    #[serde(rename = "match")]
    pub record: MatchView,
    #[serde(rename = "isMutual")]
    pub is_mutual: bool,
}

/// Response for the compatibility endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "targetUserId")]
    pub target_user_id: String,
    #[serde(rename = "compatibilityScore")]
    pub compatibility_score: f64,
}

/// Response for the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatsResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(flatten)]
    pub stats: MatchStats,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
