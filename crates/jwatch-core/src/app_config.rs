use std::path::PathBuf;

/// Runtime configuration shared by the `check` and `discover` commands.
///
/// Built from the process environment by [`crate::load_watch_config`];
/// command-line flags override individual fields afterwards.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub log_level: String,
    /// Identity sent on every fetch. Publisher platforms block obvious bots.
    pub user_agent: String,
    /// Identity used by the direct-URL parse path after a 403.
    pub fallback_user_agent: String,
    pub max_workers: usize,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub discover_timeout_ms: u64,
    pub check_timeout_ms: u64,
    pub recency_days: f64,
    pub keywords_path: PathBuf,
    pub feeds_path: PathBuf,
    pub output_dir: PathBuf,
}
