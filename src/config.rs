use std::path::PathBuf;

use clap::Args;

use crate::exchange::CommitMode;

pub const DEFAULT_DATABASE: &str = "stories.db";
pub const DEFAULT_STAGING_DIR: &str = "data/staging";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 512;

/// Settings for `serve`, also used to build the router in tests.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    #[clap(short, long, default_value = "3000")]
    pub port: u16,
    /// SQLite file path, `:memory:`, or a full database URL
    #[clap(short, long, default_value = DEFAULT_DATABASE)]
    pub database: String,
    /// Directory holding imports that wait for duplicate decisions
    #[clap(long, env = "STAGING_DIR", default_value = DEFAULT_STAGING_DIR)]
    pub staging_dir: PathBuf,
    #[clap(long)]
    pub cors_origin: Option<String>,
    /// Shared secret for every admin endpoint
    #[clap(long, env = "UPLOAD_PASSWORD", default_value = "secret", hide_env_values = true)]
    pub upload_password: String,
    #[clap(long, value_enum, default_value_t = CommitMode::Atomic)]
    pub commit_mode: CommitMode,
    /// Largest accepted import upload, in megabytes
    #[clap(long, env = "MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database: DEFAULT_DATABASE.to_string(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            cors_origin: None,
            upload_password: "secret".to_string(),
            commit_mode: CommitMode::Atomic,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}
