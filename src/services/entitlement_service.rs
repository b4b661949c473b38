use anyhow::Result;
use mongodb::Database;

use crate::metrics::LIMIT_BLOCKS_TOTAL;
use crate::models::usage::{EntitlementDecision, UsageCounter, UsageKind};
use crate::models::PlanTier;
use crate::services::usage_service::UsageService;

/// Weekly free-tier allowances. Pro accounts are never gated.
pub const FREE_PUZZLES_PER_WEEK: u32 = 7;
pub const FREE_LABS_PER_WEEK: u32 = 3;
pub const FREE_PROJECTS_PER_WEEK: u32 = 2;

pub fn free_limit(kind: UsageKind) -> u32 {
    match kind {
        UsageKind::Puzzles => FREE_PUZZLES_PER_WEEK,
        UsageKind::Labs => FREE_LABS_PER_WEEK,
        UsageKind::Projects => FREE_PROJECTS_PER_WEEK,
    }
}

/// Pure gate decision against an already-read counter. Pro is
/// unconditionally allowed; free compares current usage to the weekly
/// allowance.
pub fn decide(plan: PlanTier, counter: &UsageCounter, kind: UsageKind) -> EntitlementDecision {
    if plan == PlanTier::Pro {
        return EntitlementDecision::unlimited();
    }

    let current_usage = counter.count(kind);
    let limit = free_limit(kind);
    if current_usage < limit {
        EntitlementDecision {
            allowed: true,
            limit_type: None,
            current_usage,
            limit: Some(limit),
        }
    } else {
        EntitlementDecision {
            allowed: false,
            limit_type: Some(kind),
            current_usage,
            limit: Some(limit),
        }
    }
}

pub struct EntitlementService {
    mongo: Database,
}

impl EntitlementService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn usage(&self) -> UsageService {
        UsageService::new(self.mongo.clone())
    }

    /// Read-only check; no counter is touched.
    pub async fn check_limit(
        &self,
        user_id: &str,
        plan: PlanTier,
        kind: UsageKind,
    ) -> Result<EntitlementDecision> {
        if plan == PlanTier::Pro {
            // No storage read either; pro usage is not tracked
            return Ok(EntitlementDecision::unlimited());
        }

        let counter = self.usage().get_counter(user_id).await?;
        Ok(decide(plan, &counter, kind))
    }

    /// Check strictly before increment: a blocked attempt has zero side
    /// effects, and the N-th allowed use is the last one counted.
    pub async fn check_and_consume(
        &self,
        user_id: &str,
        plan: PlanTier,
        kind: UsageKind,
    ) -> Result<EntitlementDecision> {
        let decision = self.check_limit(user_id, plan, kind).await?;

        if !decision.allowed {
            let kind_label = match kind {
                UsageKind::Puzzles => "puzzles",
                UsageKind::Labs => "labs",
                UsageKind::Projects => "projects",
            };
            LIMIT_BLOCKS_TOTAL.with_label_values(&[kind_label]).inc();
            tracing::info!(
                "Weekly limit reached: user={}, kind={}, usage={}/{}",
                user_id,
                kind_label,
                decision.current_usage,
                decision.limit.unwrap_or(0)
            );
            return Ok(decision);
        }

        if plan == PlanTier::Free {
            let counter = self.usage().increment(user_id, kind).await?;
            return Ok(EntitlementDecision {
                allowed: true,
                limit_type: None,
                current_usage: counter.count(kind),
                limit: Some(free_limit(kind)),
            });
        }

        Ok(decision)
    }
}
