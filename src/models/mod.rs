use serde::{Deserialize, Serialize};

use self::usage::UsageKind;

/// Billing plan tier carried in the JWT claims. Pro accounts bypass the
/// weekly usage gate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Puzzle,
    Lab,
    Project,
}

impl ContentType {
    /// Which weekly counter an access to this content consumes.
    pub fn usage_kind(self) -> UsageKind {
        match self {
            ContentType::Puzzle => UsageKind::Puzzles,
            ContentType::Lab => UsageKind::Labs,
            ContentType::Project => UsageKind::Projects,
        }
    }
}

pub mod completion;
pub mod submission;
pub mod usage;
