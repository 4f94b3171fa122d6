//! Post classification and history bucketing.
//!
//! Signals are consulted in order: explicit type tag, generation-method
//! tag, content-source tag, metadata flag. The first recognized signal
//! decides. A post with no signal at all is `Manual`; a post whose only
//! signals carry unrecognized values is `Unknown` and lands in no bucket.

use serde_json::Value;

use super::model::{PostOrigin, PostRecord, PostStatus, RawPost};
use crate::publish::ComposeMode;

enum Signal {
    Decided(PostOrigin),
    Unrecognized,
    Absent,
}

fn normalize(tag: &str) -> String {
    tag.trim().to_ascii_lowercase().replace('-', "_")
}

fn tag_signal(tag: Option<&str>, generated: &[&str], manual: &[&str]) -> Signal {
    let Some(tag) = tag.filter(|t| !t.trim().is_empty()) else {
        return Signal::Absent;
    };
    let tag = normalize(tag);
    if generated.contains(&tag.as_str()) {
        Signal::Decided(PostOrigin::Generated)
    } else if manual.contains(&tag.as_str()) {
        Signal::Decided(PostOrigin::Manual)
    } else {
        Signal::Unrecognized
    }
}

fn metadata_signal(metadata: Option<&Value>) -> Signal {
    let flag = metadata.and_then(|m| m.get("ai_generated").or_else(|| m.get("is_ai_generated")));
    match flag {
        None | Some(Value::Null) => Signal::Absent,
        Some(Value::Bool(true)) => Signal::Decided(PostOrigin::Generated),
        Some(Value::Bool(false)) => Signal::Decided(PostOrigin::Manual),
        Some(_) => Signal::Unrecognized,
    }
}

/// Infers whether a post was AI-generated or written by hand.
pub fn classify(post: &RawPost) -> PostOrigin {
    let signals = [
        tag_signal(
            post.post_type.as_deref(),
            &["ai_generated", "generated", "ai"],
            &["manual", "user"],
        ),
        tag_signal(
            post.generation_method.as_deref(),
            &["ai", "generated", "auto", "llm"],
            &["manual", "none", "user"],
        ),
        tag_signal(
            post.content_source.as_deref(),
            &["ai", "ai_generated", "generated"],
            &["user", "manual", "upload"],
        ),
        metadata_signal(post.metadata.as_ref()),
    ];

    let mut saw_unrecognized = false;
    for signal in signals {
        match signal {
            Signal::Decided(origin) => return origin,
            Signal::Unrecognized => saw_unrecognized = true,
            Signal::Absent => {}
        }
    }

    if saw_unrecognized {
        PostOrigin::Unknown
    } else {
        PostOrigin::Manual
    }
}

impl From<RawPost> for PostRecord {
    fn from(raw: RawPost) -> Self {
        let classification = classify(&raw);
        let effective_timestamp = raw.effective_timestamp();
        let mut media_urls = raw.media_urls;
        if let Some(image_url) = raw.image_url
            && !media_urls.contains(&image_url)
        {
            media_urls.insert(0, image_url);
        }
        Self {
            id: raw.id,
            content: raw.content.unwrap_or_default(),
            media_urls,
            effective_timestamp,
            status: PostStatus::parse(raw.status.as_deref()),
            classification,
        }
    }
}

/// Classified post history of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostHistory {
    pub generated: Vec<PostRecord>,
    pub manual: Vec<PostRecord>,
    /// Number of raw posts received
    pub total: usize,
    /// True when both buckets carry the same fallback list because no
    /// post could be classified. This can hide an upstream tagging
    /// defect and is not a real classification.
    pub degraded: bool,
}

impl PostHistory {
    /// Sorts newest first, keeps at most `limit` posts and buckets them.
    pub fn from_raw(raw: Vec<RawPost>, limit: usize, degraded_cap: usize) -> Self {
        let mut records: Vec<PostRecord> = raw.into_iter().map(PostRecord::from).collect();
        // None sorts before Some, so reversing puts undated posts last
        records.sort_by(|a, b| b.effective_timestamp.cmp(&a.effective_timestamp));
        records.truncate(limit);

        let total = records.len();
        let (generated, rest): (Vec<_>, Vec<_>) = records
            .iter()
            .cloned()
            .partition(|r| r.classification == PostOrigin::Generated);
        let manual: Vec<_> = rest
            .into_iter()
            .filter(|r| r.classification == PostOrigin::Manual)
            .collect();

        if generated.is_empty() && manual.is_empty() && total > 0 {
            tracing::warn!(
                "[PostHistory] No post of {} could be classified, showing the same {} in both views",
                total,
                total.min(degraded_cap)
            );
            let fallback: Vec<_> = records.into_iter().take(degraded_cap).collect();
            return Self {
                generated: fallback.clone(),
                manual: fallback,
                total,
                degraded: true,
            };
        }

        Self {
            generated,
            manual,
            total,
            degraded: false,
        }
    }

    /// The view shown next to the given compose form.
    pub fn bucket(&self, mode: ComposeMode) -> &[PostRecord] {
        match mode {
            ComposeMode::Generated => &self.generated,
            ComposeMode::Manual => &self.manual,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.manual.is_empty()
    }
}
