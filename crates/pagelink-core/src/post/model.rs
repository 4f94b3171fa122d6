use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post exactly as the backend lists it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    #[serde(default, alias = "message")]
    pub content: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub generation_method: Option<String>,
    #[serde(default)]
    pub content_source: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl RawPost {
    /// `created_at`, falling back to the scheduled execution time.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.next_execution)
    }
}

/// Lifecycle state reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Published,
    Scheduled,
    Pending,
    Draft,
    Failed,
    Other(String),
}

impl PostStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return PostStatus::Other("unknown".to_string());
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "published" | "posted" | "success" => PostStatus::Published,
            "scheduled" => PostStatus::Scheduled,
            "pending" | "processing" | "queued" => PostStatus::Pending,
            "draft" => PostStatus::Draft,
            "failed" | "error" => PostStatus::Failed,
            other => PostStatus::Other(other.to_string()),
        }
    }
}

/// Inferred origin of a post. Never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOrigin {
    Generated,
    Manual,
    Unknown,
}

/// A classified history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub effective_timestamp: Option<DateTime<Utc>>,
    pub status: PostStatus,
    pub classification: PostOrigin,
}
