/*!
Test harness for BeeCareful crates

One call gives a test:
- logging (`env_logger`, `RUST_LOG`)
- a running mock backend
- a scratch directory for notification files and configs
*/

use crate::mock_backend::MockBackend;
use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestHarness {
    pub backend: MockBackend,
    scratch: TempDir,
}

impl TestHarness {
    pub async fn start() -> Result<Self> {
        init_logging();
        let backend = MockBackend::start().await?;
        let scratch = tempfile::tempdir()?;
        log::info!("harness ready, scratch dir {}", scratch.path().display());
        Ok(Self { backend, scratch })
    }

    pub fn base_url(&self) -> String {
        self.backend.base_url()
    }

    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.scratch.path().join(name)
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.scratch_path("notifications.json")
    }

    /// Writes a client config pointing at the mock backend and returns its path.
    pub fn write_config(&self) -> Result<PathBuf> {
        let path = self.scratch_path("config.toml");
        let content = format!(
            "[api]\nbase_url = \"{}\"\ntimeout_secs = 5\n\n[session]\nstore_token = false\n\n[notifications]\npath = \"{}\"\nretention_days = 30\n",
            self.base_url(),
            self.notifications_path().display()
        );
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Polls `check` every 10ms until it yields true or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    log::warn!("condition not met within {:?}", timeout);
    anyhow::bail!("Timed out after {:?}", timeout)
}
