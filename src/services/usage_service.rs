use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::Database;

use crate::models::usage::{UsageCounter, UsageKind};
use crate::utils::retry::RetryPolicy;
use crate::utils::time::week_start;

const COLLECTION: &str = "usage_counters";

/// Injectable time source so tests can pin a date instead of depending on
/// the wall clock.
pub type Clock = fn() -> DateTime<Utc>;

/// Per-user weekly consumption ledger. Rows are keyed by (user, week) and
/// never deleted; a new week means a new key, which is the only reset
/// mechanism. Increments are read-modify-write at counter granularity:
/// concurrent submissions from one user may race, which is accepted for a
/// soft abuse limit.
pub struct UsageService {
    mongo: Database,
    clock: Clock,
}

impl UsageService {
    pub fn new(mongo: Database) -> Self {
        Self {
            mongo,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mongo: Database, clock: Clock) -> Self {
        Self { mongo, clock }
    }

    pub fn current_week_start(&self) -> NaiveDate {
        week_start((self.clock)().date_naive())
    }

    /// Counter for the current week. An absent row reads as all zeroes;
    /// the stored row only materializes on the first increment, so reads
    /// stay side-effect free.
    pub async fn get_counter(&self, user_id: &str) -> Result<UsageCounter> {
        let week = self.current_week_start();
        let collection: mongodb::Collection<UsageCounter> = self.mongo.collection(COLLECTION);

        let existing = collection
            .find_one(mongodb::bson::doc! { "_id": UsageCounter::storage_id(user_id, week) })
            .await
            .context("Failed to query usage counter")?;

        Ok(existing.unwrap_or_else(|| UsageCounter::zeroed(user_id, week)))
    }

    /// Atomic `$inc` upsert on the current week's row. Creation and
    /// increment are a single conditional write, not a read-then-insert.
    pub async fn increment(&self, user_id: &str, kind: UsageKind) -> Result<UsageCounter> {
        let week = self.current_week_start();
        let id = UsageCounter::storage_id(user_id, week);
        let collection: mongodb::Collection<UsageCounter> = self.mongo.collection(COLLECTION);

        let mut set_on_insert = mongodb::bson::doc! {
            "user_id": user_id,
            "week_start": week.to_string(),
        };
        for other in UsageKind::ALL {
            if other != kind {
                set_on_insert.insert(other.counter_field(), 0_i64);
            }
        }
        let update = mongodb::bson::doc! {
            "$inc": { kind.counter_field(): 1_i64 },
            "$setOnInsert": set_on_insert,
        };

        tracing::debug!(
            "Incrementing usage: user={}, kind={:?}, week={}",
            user_id,
            kind,
            week
        );

        let updated = RetryPolicy::durable()
            .run(|| async {
                collection
                    .find_one_and_update(mongodb::bson::doc! { "_id": &id }, update.clone())
                    .with_options(
                        mongodb::options::FindOneAndUpdateOptions::builder()
                            .upsert(true)
                            .return_document(mongodb::options::ReturnDocument::After)
                            .build(),
                    )
                    .await
            })
            .await
            .context("Failed to increment usage counter")?;

        updated.ok_or_else(|| anyhow::anyhow!("Usage counter upsert returned no document"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Client construction is lazy; no MongoDB is contacted here
    async fn detached_db() -> Database {
        mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap()
            .database("seccode_test")
    }

    fn saturday_night() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap()
    }

    fn sunday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 0, 1, 0).unwrap()
    }

    #[tokio::test]
    async fn week_key_is_pinned_by_the_injected_clock() {
        let service = UsageService::with_clock(detached_db().await, saturday_night);
        assert_eq!(service.current_week_start().to_string(), "2025-02-23");
    }

    #[tokio::test]
    async fn week_key_rolls_over_at_the_sunday_boundary() {
        let mongo = detached_db().await;
        let saturday = UsageService::with_clock(mongo.clone(), saturday_night);
        let sunday = UsageService::with_clock(mongo, sunday_morning);

        assert_ne!(saturday.current_week_start(), sunday.current_week_start());
        assert_eq!(sunday.current_week_start().to_string(), "2025-03-02");
    }
}
