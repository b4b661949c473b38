use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentType;

/// One row per (user, content) pair. Completion is a set membership fact,
/// not an event log: repeated passes upsert `completed_at` in place. The
/// "recent activity" view depends on this staying a single row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub content_slug: String,
    pub content_type: ContentType,
    pub completed_at: DateTime<Utc>,
    /// Labs and projects only; puzzles store nothing here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl CompletionRecord {
    pub fn storage_id(user_id: &str, content_slug: &str) -> String {
        format!("{}:{}", user_id, content_slug)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCompletionRequest {
    pub content_slug: String,
    pub content_type: ContentType,
    pub success: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_id_is_stable_per_user_and_slug() {
        assert_eq!(
            CompletionRecord::storage_id("user-1", "buffer-overflow-basics"),
            "user-1:buffer-overflow-basics"
        );
    }
}
