use crate::config::Config;
use crate::services::sandbox_client::{CodeExecutor, SandboxClient};
use mongodb::{Client as MongoClient, Database};
use redis::aio::ConnectionManager;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub redis: ConnectionManager,
    pub sandbox: Arc<dyn CodeExecutor>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");

        // Create ConnectionManager with longer timeout
        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        tracing::info!("Redis ConnectionManager created, testing with PING...");

        // Test connection
        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        let sandbox: Arc<dyn CodeExecutor> = Arc::new(SandboxClient::new(
            config.sandbox_api_url.clone(),
            config.sandbox_api_key.clone(),
        )?);

        Ok(Self {
            config,
            mongo,
            redis,
            sandbox,
        })
    }
}

pub mod completion_service;
pub mod entitlement_service;
pub mod grading_service;
pub mod sandbox_client;
pub mod usage_service;
