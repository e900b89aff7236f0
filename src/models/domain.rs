use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Student profile as seen by the matching core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

impl UserProfile {
    pub fn new(user_id: impl Into<String>, preferences: Preferences) -> Self {
        let user_id = user_id.into();
        Self {
            name: user_id.clone(),
            user_id,
            is_active: true,
            preferences,
            created_at: Some(Utc::now()),
        }
    }
}

/// Cleanliness expectation for a shared flat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cleanliness {
    Low,
    Medium,
    High,
}

impl Cleanliness {
    fn rank(self) -> u8 {
        match self {
            Cleanliness::Low => 0,
            Cleanliness::Medium => 1,
            Cleanliness::High => 2,
        }
    }

    /// Low/medium and medium/high are one step apart; low/high is not adjacent
    pub fn is_adjacent(self, other: Cleanliness) -> bool {
        self.rank().abs_diff(other.rank()) == 1
    }
}

impl FromStr for Cleanliness {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Cleanliness::Low),
            "medium" => Ok(Cleanliness::Medium),
            "high" => Ok(Cleanliness::High),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoking {
    Yes,
    No,
}

impl FromStr for Smoking {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Smoking::Yes),
            "no" => Ok(Smoking::No),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepSchedule {
    Early,
    Normal,
    Late,
}

impl SleepSchedule {
    fn rank(self) -> u8 {
        match self {
            SleepSchedule::Early => 0,
            SleepSchedule::Normal => 1,
            SleepSchedule::Late => 2,
        }
    }

    pub fn is_adjacent(self, other: SleepSchedule) -> bool {
        self.rank().abs_diff(other.rank()) == 1
    }
}

impl FromStr for SleepSchedule {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" => Ok(SleepSchedule::Early),
            "normal" => Ok(SleepSchedule::Normal),
            "late" => Ok(SleepSchedule::Late),
            _ => Err(()),
        }
    }
}

/// Roommate preferences with explicit present/absent fields
///
/// Preference documents are loosely typed. Deserialization never fails:
/// a field of the wrong shape is treated as absent, and a document that is
/// not an object yields an empty preference set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanliness: Option<Cleanliness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoking: Option<Smoking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<SleepSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<BTreeSet<String>>,
}

impl Preferences {
    /// Parse a raw preference document; missing or unparsable input yields no preferences
    pub fn from_json(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Self::default(),
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!("Malformed preference data, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Null => return Self::default(),
            other => {
                tracing::warn!("Preference data is not an object ({}), using defaults", type_name(other));
                return Self::default();
            }
        };

        Self {
            budget: obj.get("budget").and_then(Value::as_i64).filter(|b| *b > 0),
            cleanliness: parse_enum(obj.get("cleanliness")),
            smoking: parse_enum(obj.get("smoking")),
            sleep: parse_enum(obj.get("sleep")),
            interests: obj.get("interests").and_then(parse_interests),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<Value> for Preferences {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

fn parse_enum<T: FromStr>(value: Option<&Value>) -> Option<T> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}

/// All elements must be strings, otherwise the whole list is ignored
fn parse_interests(value: &Value) -> Option<BTreeSet<String>> {
    let items = value.as_array()?;
    let mut tags = BTreeSet::new();
    for item in items {
        let tag = item.as_str()?.trim().to_lowercase();
        if !tag.is_empty() {
            tags.insert(tag);
        }
    }
    Some(tags)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonical, order-independent identity of a user pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub low: String,
    pub high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { low: a.to_string(), high: b.to_string() }
        } else {
            Self { low: b.to_string(), high: a.to_string() }
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Pending,
    Liked,
    Matched,
    Rejected,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Matched | MatchStatus::Rejected)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Liked => "LIKED",
            MatchStatus::Matched => "MATCHED",
            MatchStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// One record per unordered user pair
///
/// `user_a_id` is always the lexicographically smaller id. Each side's like
/// is tracked separately so reciprocity is a property of a single record.
/// `version` is zero until the record has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub user_a_id: String,
    pub user_b_id: String,
    pub user_a_liked: bool,
    pub user_b_liked: bool,
    pub initiated_by: String,
    pub rejected_by: Option<String>,
    pub compatibility_score: f64,
    pub status: MatchStatus,
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl MatchRecord {
    fn new(initiator: &str, target: &str, score: f64, status: MatchStatus, now: DateTime<Utc>) -> Self {
        let pair = PairKey::new(initiator, target);
        Self {
            id: Uuid::new_v4(),
            user_a_id: pair.low,
            user_b_id: pair.high,
            user_a_liked: false,
            user_b_liked: false,
            initiated_by: initiator.to_string(),
            rejected_by: None,
            compatibility_score: score,
            status,
            matched_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// New record for a first like from `initiator`
    pub fn liked(initiator: &str, target: &str, score: f64, now: DateTime<Utc>) -> Self {
        let mut record = Self::new(initiator, target, score, MatchStatus::Liked, now);
        record.set_liked(initiator);
        record
    }

    /// New record for a first pass; the score is irrelevant for rejected pairs
    pub fn passed(initiator: &str, target: &str, now: DateTime<Utc>) -> Self {
        let mut record = Self::new(initiator, target, 0.0, MatchStatus::Rejected, now);
        record.rejected_by = Some(initiator.to_string());
        record
    }

    pub fn pair(&self) -> PairKey {
        PairKey { low: self.user_a_id.clone(), high: self.user_b_id.clone() }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    /// The other member of the pair, as seen by `user_id`
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.user_a_id == user_id {
            Some(&self.user_b_id)
        } else if self.user_b_id == user_id {
            Some(&self.user_a_id)
        } else {
            None
        }
    }

    pub fn has_liked(&self, user_id: &str) -> bool {
        (self.user_a_id == user_id && self.user_a_liked)
            || (self.user_b_id == user_id && self.user_b_liked)
    }

    fn set_liked(&mut self, user_id: &str) {
        if self.user_a_id == user_id {
            self.user_a_liked = true;
        } else if self.user_b_id == user_id {
            self.user_b_liked = true;
        }
    }

    /// Apply a like from `user_id`. Returns whether the record changed.
    ///
    /// Matched and rejected records are final. A like that completes the
    /// pair promotes the record to `Matched` and stamps `matched_at`.
    pub fn apply_like(&mut self, user_id: &str, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() || !self.involves(user_id) {
            return false;
        }
        if self.status == MatchStatus::Liked && self.has_liked(user_id) {
            return false;
        }

        self.set_liked(user_id);
        if self.user_a_liked && self.user_b_liked {
            self.status = MatchStatus::Matched;
            self.matched_at = Some(now);
        } else {
            self.status = MatchStatus::Liked;
        }
        self.updated_at = now;
        true
    }

    /// Apply a pass from `user_id`. Any non-rejected record becomes rejected.
    pub fn apply_pass(&mut self, user_id: &str, now: DateTime<Utc>) -> bool {
        if self.status == MatchStatus::Rejected || !self.involves(user_id) {
            return false;
        }
        self.status = MatchStatus::Rejected;
        self.rejected_by = Some(user_id.to_string());
        self.updated_at = now;
        true
    }
}

/// Candidate profile with its compatibility score against the requesting user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(rename = "compatibilityScore")]
    pub compatibility_score: f64,
}

/// Per-user match counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    #[serde(rename = "totalMatches")]
    pub total_matches: usize,
    #[serde(rename = "matchedPairs")]
    pub matched_pairs: usize,
    #[serde(rename = "likesGiven")]
    pub likes_given: usize,
    #[serde(rename = "passesGiven")]
    pub passes_given: usize,
}

impl MatchStats {
    pub fn from_records(user_id: &str, records: &[MatchRecord]) -> Self {
        Self {
            total_matches: records.len(),
            matched_pairs: records.iter().filter(|r| r.status == MatchStatus::Matched).count(),
            likes_given: records.iter().filter(|r| r.has_liked(user_id)).count(),
            passes_given: records
                .iter()
                .filter(|r| r.status == MatchStatus::Rejected && r.rejected_by.as_deref() == Some(user_id))
                .count(),
        }
    }
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub budget: f64,
    pub lifestyle: f64,
    pub sleep: f64,
    pub interests: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.budget + self.lifestyle + self.sleep + self.interests
    }

    /// Short stable tag for this weight set, used to scope cached scores
    pub fn fingerprint(&self) -> String {
        format!(
            "w{:.4}-{:.4}-{:.4}-{:.4}",
            self.budget, self.lifestyle, self.sleep, self.interests
        )
    }

    /// Weights rescaled to sum to 1. Negative weights count as zero and an
    /// all-zero set falls back to the defaults.
    pub fn normalized(&self) -> Self {
        let clamped = Self {
            budget: self.budget.max(0.0),
            lifestyle: self.lifestyle.max(0.0),
            sleep: self.sleep.max(0.0),
            interests: self.interests.max(0.0),
        };
        let sum = clamped.sum();

        if sum <= f64::EPSILON {
            return Self::default();
        }
        if (sum - 1.0).abs() < 1e-9 {
            return clamped;
        }

        Self {
            budget: clamped.budget / sum,
            lifestyle: clamped.lifestyle / sum,
            sleep: clamped.sleep / sum,
            interests: clamped.interests / sum,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            budget: 0.30,
            lifestyle: 0.20,
            sleep: 0.20,
            interests: 0.30,
        }
    }
}
