use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which weekly counter a gated action consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Puzzles,
    Labs,
    Projects,
}

impl UsageKind {
    pub const ALL: [UsageKind; 3] = [UsageKind::Puzzles, UsageKind::Labs, UsageKind::Projects];

    /// Field name of the counter in the `usage_counters` collection.
    pub fn counter_field(self) -> &'static str {
        match self {
            UsageKind::Puzzles => "puzzles_completed",
            UsageKind::Labs => "labs_completed",
            UsageKind::Projects => "projects_started",
        }
    }
}

/// Per-user, per-week usage row. Exactly one row per user per calendar week;
/// counts only grow within a week and reset by key rollover (a fresh
/// `week_start`), never by an explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounter {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    /// Most recent Sunday, as a plain YYYY-MM-DD date so keys compare as
    /// strings across processes.
    pub week_start: String,
    pub puzzles_completed: u32,
    pub labs_completed: u32,
    pub projects_started: u32,
}

impl UsageCounter {
    pub fn storage_id(user_id: &str, week_start: NaiveDate) -> String {
        format!("{}:{}", user_id, week_start)
    }

    /// Fresh counter for a week with no stored row yet.
    pub fn zeroed(user_id: &str, week_start: NaiveDate) -> Self {
        Self {
            id: Self::storage_id(user_id, week_start),
            user_id: user_id.to_string(),
            week_start: week_start.to_string(),
            puzzles_completed: 0,
            labs_completed: 0,
            projects_started: 0,
        }
    }

    pub fn count(&self, kind: UsageKind) -> u32 {
        match kind {
            UsageKind::Puzzles => self.puzzles_completed,
            UsageKind::Labs => self.labs_completed,
            UsageKind::Projects => self.projects_started,
        }
    }
}

/// Outcome of the entitlement gate. Derived, never stored. A blocked
/// decision carries the structured payload the UI renders as the upgrade
/// prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_type: Option<UsageKind>,
    pub current_usage: u32,
    /// None means unlimited (pro tier).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl EntitlementDecision {
    /// Pro tier: always allowed, usage untracked.
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            limit_type: None,
            current_usage: 0,
            limit: None,
        }
    }
}
