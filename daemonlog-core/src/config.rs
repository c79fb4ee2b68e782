use std::{sync::LazyLock, time::Duration};

use derive_from_env::FromEnv;

#[derive(FromEnv)]
#[from_env(prefix = "DAEMONLOG")]
#[allow(non_snake_case)]
pub struct DaemonLogConfig {
    /// How long the worker sleeps between two drains of the buffer.
    #[from_env(default = "50")]
    pub FLUSH_INTERVAL_MS: u64,
    /// Bounded wait for the buffer lock before the worker skips a cycle.
    #[from_env(default = "50")]
    pub LOCK_TIMEOUT_MS: u64,
    /// Folder created under the user's documents directory.
    #[from_env(default = "SandboxDirectX")]
    pub APP_NAME: String,
}

impl DaemonLogConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.FLUSH_INTERVAL_MS)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.LOCK_TIMEOUT_MS)
    }
}

pub static DAEMONLOG_CONFIG: LazyLock<DaemonLogConfig> = LazyLock::new(|| {
    DaemonLogConfig::from_env().expect("Invalid DAEMONLOG_* environment configuration")
});
