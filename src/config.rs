// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Maximum number of questions a single generation request may ask for.
pub const GENERATION_MAX_COUNT: usize = 10;

/// Retries per question slot after the initial call fails.
pub const GENERATION_MAX_RETRIES: u32 = 3;

/// Delay between consecutive slot starts, to keep near-identical prompts
/// from hitting the upstream API at the same instant.
pub const GENERATION_STAGGER_MS: u64 = 500;

/// Exponential backoff base and ceiling for retried LLM calls.
pub const GENERATION_BACKOFF_BASE_MS: u64 = 2_000;
pub const GENERATION_BACKOFF_CAP_MS: u64 = 15_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Missing key degrades generation to fallback templates only.
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Model switched to after a rate-limit response.
    pub llm_backup_model: String,

    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        let llm_base_url = env::var("LLM_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let llm_backup_model =
            env::var("LLM_BACKUP_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            llm_api_key,
            llm_base_url,
            llm_model,
            llm_backup_model,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
