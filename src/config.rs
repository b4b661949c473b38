use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    /// Base URL of the external sandbox runner. Absent means code execution
    /// degrades to a "runner not configured" response instead of crashing.
    pub sandbox_api_url: Option<String>,
    pub sandbox_api_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017/seccode".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "seccode".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        // No default: a missing runner URL is a supported degraded mode
        let sandbox_api_url = settings
            .get_string("sandbox.url")
            .or_else(|_| env::var("SANDBOX_API_URL"))
            .ok()
            .filter(|url| !url.is_empty());

        let sandbox_api_key = settings
            .get_string("sandbox.api_key")
            .or_else(|_| env::var("SANDBOX_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Config {
            mongo_uri,
            redis_uri,
            mongo_database,
            jwt_secret,
            sandbox_api_url,
            sandbox_api_key,
        })
    }
}
