use anyhow::{Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Database;

use crate::metrics::{track_db_operation, COMPLETIONS_RECORDED_TOTAL};
use crate::models::completion::CompletionRecord;
use crate::models::ContentType;
use crate::utils::retry::RetryPolicy;

const COLLECTION: &str = "completions";

/// How many rows the "recent activity" view shows.
const RECENT_LIMIT: i64 = 50;

pub struct CompletionService {
    mongo: Database,
}

impl CompletionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Idempotent upsert keyed by (user, slug): insert on first pass,
    /// overwrite `completed_at` on repeats. Safe to call any number of
    /// times for the same pass; never creates a second row.
    pub async fn record_completion(
        &self,
        user_id: &str,
        content_slug: &str,
        content_type: ContentType,
        success: Option<bool>,
    ) -> Result<CompletionRecord> {
        let record = CompletionRecord {
            id: CompletionRecord::storage_id(user_id, content_slug),
            user_id: user_id.to_string(),
            content_slug: content_slug.to_string(),
            content_type,
            completed_at: Utc::now(),
            success,
        };

        tracing::info!(
            "Recording completion: user={}, slug={}, type={:?}",
            user_id,
            content_slug,
            content_type
        );

        let collection: mongodb::Collection<CompletionRecord> = self.mongo.collection(COLLECTION);
        track_db_operation("upsert", COLLECTION, async {
            RetryPolicy::durable()
                .run(|| async {
                    collection
                        .replace_one(mongodb::bson::doc! { "_id": &record.id }, &record)
                        .with_options(
                            mongodb::options::ReplaceOptions::builder()
                                .upsert(true)
                                .build(),
                        )
                        .await
                        .map(|_| ())
                })
                .await
                .context("Failed to upsert completion record")
        })
        .await?;

        let type_label = match content_type {
            ContentType::Puzzle => "puzzle",
            ContentType::Lab => "lab",
            ContentType::Project => "project",
        };
        COMPLETIONS_RECORDED_TOTAL
            .with_label_values(&[type_label])
            .inc();

        Ok(record)
    }

    /// Newest-first completion rows for the user's recent activity view.
    pub async fn list_completions(&self, user_id: &str) -> Result<Vec<CompletionRecord>> {
        let collection: mongodb::Collection<CompletionRecord> = self.mongo.collection(COLLECTION);

        let cursor = collection
            .find(mongodb::bson::doc! { "user_id": user_id })
            .sort(mongodb::bson::doc! { "completed_at": -1 })
            .limit(RECENT_LIMIT)
            .await
            .context("Failed to query completions")?;

        cursor
            .try_collect()
            .await
            .context("Failed to read completions cursor")
    }
}
