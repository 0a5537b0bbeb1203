use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: true.
    /// Note: Worker ignores this field (always requires MQ).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue carrying ingest jobs (server and worker publish, worker consumes). Default: "recipe_ingest".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
    /// Queue for ingest jobs that exhausted their retries. Default: "recipe_ingest_dlq".
    #[serde(default = "default_mq_dlq_queue_name")]
    pub dlq_queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "recipe_ingest".into()
}
fn default_mq_dlq_queue_name() -> String {
    "recipe_ingest_dlq".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
            dlq_queue_name: default_mq_dlq_queue_name(),
        }
    }
}

/// Redis used as the shared key-value store for the daily call counter.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    #[serde(default = "default_mq_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
        }
    }
}

/// Settings for the Spoonacular ingestion pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Spoonacular API key.
    #[serde(default)]
    pub api_key: String,
    /// Default: "https://api.spoonacular.com".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Provider calls allowed per calendar day. Default: 50.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
    /// Results requested per search call. Default: 100.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Offset increment between chained pages. Default: 10.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: u32,
    /// Per-request timeout. Default: 10.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Re-deliveries after a transient failure. Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Delay before retrying after a non-2xx response. Default: 30.
    #[serde(default = "default_http_retry_delay_secs")]
    pub http_retry_delay_secs: u64,
    /// Delay before retrying after a network failure. Default: 20.
    #[serde(default = "default_network_retry_delay_secs")]
    pub network_retry_delay_secs: u64,
    /// Delay before the next page is fetched. Default: 5.
    #[serde(default = "default_continuation_delay_secs")]
    pub continuation_delay_secs: u64,
    /// Spend one extra call per incomplete item to fill in missing fields. Default: false.
    #[serde(default)]
    pub fetch_missing_details: bool,
}

fn default_base_url() -> String {
    "https://api.spoonacular.com".into()
}
fn default_daily_limit() -> u64 {
    50
}
fn default_page_size() -> u32 {
    100
}
fn default_batch_size() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u8 {
    3
}
fn default_http_retry_delay_secs() -> u64 {
    30
}
fn default_network_retry_delay_secs() -> u64 {
    20
}
fn default_continuation_delay_secs() -> u64 {
    5
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            daily_limit: default_daily_limit(),
            page_size: default_page_size(),
            default_batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            http_retry_delay_secs: default_http_retry_delay_secs(),
            network_retry_delay_secs: default_network_retry_delay_secs(),
            continuation_delay_secs: default_continuation_delay_secs(),
            fetch_missing_details: false,
        }
    }
}

/// Resolve the config file path shared by the server and worker binaries.
pub fn config_path() -> String {
    std::env::var("RECIPES_CONFIG").unwrap_or_else(|_| "config/config".to_string())
}
