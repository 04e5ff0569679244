use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub feed_url: String,
    pub feed_ttl_secs: u64,
    pub feed_timeout_secs: u64,
    pub feed_user_agent: String,
    pub feed_max_retries: u32,
    pub feed_retry_backoff_base_secs: u64,
    pub default_threshold: i64,
    pub sync_interval_minutes: u32,
    pub sync_chunk_size: usize,
    pub sync_max_concurrent_updates: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("feed_url", &self.feed_url)
            .field("feed_ttl_secs", &self.feed_ttl_secs)
            .field("feed_timeout_secs", &self.feed_timeout_secs)
            .field("feed_user_agent", &self.feed_user_agent)
            .field("feed_max_retries", &self.feed_max_retries)
            .field(
                "feed_retry_backoff_base_secs",
                &self.feed_retry_backoff_base_secs,
            )
            .field("default_threshold", &self.default_threshold)
            .field("sync_interval_minutes", &self.sync_interval_minutes)
            .field("sync_chunk_size", &self.sync_chunk_size)
            .field(
                "sync_max_concurrent_updates",
                &self.sync_max_concurrent_updates,
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
