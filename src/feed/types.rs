use serde::{Deserialize, Serialize};

/// One candidate post produced upstream.
///
/// The coordination layer only looks at `id` and whether there is reply text to act on.
/// Everything else the producer wrote (content, author, url, score, ...) is carried untouched
/// in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    /// Stable identifier, unique within a document.
    pub id: String,

    /// Generated reply text. Blank or missing means there is nothing to post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl CandidateItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reply: None,
            payload: serde_json::Map::new(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    pub fn with_field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.payload.insert(name.to_string(), value);
        self
    }

    pub fn has_actionable_field(&self) -> bool {
        self.reply
            .as_deref()
            .map(|reply| !reply.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn url(&self) -> Option<&str> {
        self.payload.get("url").and_then(|value| value.as_str())
    }

    pub fn score(&self) -> Option<f64> {
        self.payload.get("score").and_then(|value| value.as_f64())
    }
}

/// The shared record feed.
///
/// Field aliases accept the names the upstream producer writes (`replies`, `last_updated`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedDocument {
    #[serde(default, alias = "replies")]
    pub items: Vec<CandidateItem>,

    /// Filled in from store metadata on fetch; the body's own value (if any) is not trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, alias = "last_updated", skip_serializing_if = "Option::is_none")]
    pub produced_at: Option<String>,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFetch {
    pub changed: bool,
    pub document: Option<ChangeFeedDocument>,
    /// The store's current version, `None` when the document does not exist.
    pub new_version: Option<String>,
}

impl FeedFetch {
    pub fn absent() -> Self {
        Self {
            changed: false,
            document: None,
            new_version: None,
        }
    }

    pub fn unchanged(version: String) -> Self {
        Self {
            changed: false,
            document: None,
            new_version: Some(version),
        }
    }

    pub fn changed(document: ChangeFeedDocument, version: String) -> Self {
        Self {
            changed: true,
            document: Some(document),
            new_version: Some(version),
        }
    }
}

/// Summary numbers shown next to a list of candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemStats {
    pub total: usize,
    /// Items with reply text, i.e. ready to post.
    pub ready: usize,
    /// Rounded mean of `score`; items without a score count as 0.
    pub average_score: i64,
}

impl ItemStats {
    pub fn from_items(items: &[CandidateItem]) -> Self {
        let total = items.len();
        let ready = items.iter().filter(|item| item.has_actionable_field()).count();
        let average_score = if total > 0 {
            let sum: f64 = items.iter().map(|item| item.score().unwrap_or(0.0)).sum();
            (sum / total as f64).round() as i64
        } else {
            0
        };

        Self {
            total,
            ready,
            average_score,
        }
    }
}
