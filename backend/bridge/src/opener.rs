use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use deepread_core::{ReaderError, Result};

/// Opens a reader view at a URL.
#[async_trait]
pub trait ReaderOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the desktop's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl SystemOpener {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

#[async_trait]
impl ReaderOpener for SystemOpener {
    async fn open(&self, url: &str) -> Result<()> {
        info!(url = %url, "Opening reader");
        let status = Self::command(url)
            .status()
            .await
            .map_err(|e| ReaderError::Other(anyhow::anyhow!("failed to launch browser: {e}")))?;
        if !status.success() {
            return Err(ReaderError::Other(anyhow::anyhow!(
                "browser launcher exited with {status}"
            )));
        }
        Ok(())
    }
}
