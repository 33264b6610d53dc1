use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const DEFAULT_INTERVAL: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Kanji,
    /// Vocabulary.
    Kosakata,
    Grammar,
    /// Sentence pattern.
    PolaKalimat,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Kanji,
        ContentType::Kosakata,
        ContentType::Grammar,
        ContentType::PolaKalimat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Kanji => "kanji",
            ContentType::Kosakata => "kosakata",
            ContentType::Grammar => "grammar",
            ContentType::PolaKalimat => "pola_kalimat",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type '{0}'")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kanji" => Ok(ContentType::Kanji),
            "kosakata" | "vocabulary" => Ok(ContentType::Kosakata),
            "grammar" | "bunpo" => Ok(ContentType::Grammar),
            "pola_kalimat" | "sentence_pattern" | "sentence-pattern" => Ok(ContentType::PolaKalimat),
            _ => Err(UnknownContentType(s.to_string())),
        }
    }
}

/// The four buttons shown under a flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewAction {
    /// Returns `None` for anything outside the four known labels.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "again" => Some(ReviewAction::Again),
            "hard" => Some(ReviewAction::Hard),
            "good" => Some(ReviewAction::Good),
            "easy" => Some(ReviewAction::Easy),
            _ => None,
        }
    }
}

/// Identifies whose progress is being tracked. Guests get a random id
/// that is later merged into their account on login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LearnerKey {
    Anonymous(String),
    User(String),
}

impl LearnerKey {
    pub fn new_anonymous() -> Self {
        LearnerKey::Anonymous(uuid::Uuid::new_v4().to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, LearnerKey::Anonymous(_))
    }
}

impl fmt::Display for LearnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnerKey::Anonymous(id) => write!(f, "anon:{}", id),
            LearnerKey::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed learner key '{0}', expected anon:<id> or user:<id>")]
pub struct MalformedLearnerKey(pub String);

impl FromStr for LearnerKey {
    type Err = MalformedLearnerKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("anon", id)) if !id.is_empty() => Ok(LearnerKey::Anonymous(id.to_string())),
            Some(("user", id)) if !id.is_empty() => Ok(LearnerKey::User(id.to_string())),
            _ => Err(MalformedLearnerKey(s.to_string())),
        }
    }
}

impl Serialize for LearnerKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LearnerKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub learner: LearnerKey,
    pub content_type: ContentType,
    pub content_id: String,
}

impl ProgressKey {
    pub fn new(learner: &LearnerKey, content_type: ContentType, content_id: &str) -> Self {
        Self {
            learner: learner.clone(),
            content_type,
            content_id: content_id.to_string(),
        }
    }
}

/// Review state of one item for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressItem {
    pub content_type: ContentType,
    pub content_id: String,
    pub mastery_level: u8,
    pub ease_factor: f64,
    pub interval: i64, // days
    pub repetitions: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub review_count: u64,
}

impl ProgressItem {
    /// The state of an item that has never been reviewed. Stores never need
    /// to hold a row for it.
    pub fn new(content_type: ContentType, content_id: impl Into<String>) -> Self {
        Self {
            content_type,
            content_id: content_id.into(),
            mastery_level: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: DEFAULT_INTERVAL,
            repetitions: 0,
            last_reviewed: None,
            next_review: None,
            review_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_reviewed: usize,
    pub due_today: usize,
    pub mastered: usize,
}
