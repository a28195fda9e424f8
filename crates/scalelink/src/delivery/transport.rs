//! Delivery transport seam
//!
//! A session moves through `closed -> open -> closed`; a failed open never
//! yields a session. Uploads go through [`TransportSession::store_file`],
//! closing through [`close_session`], which never fails.

use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

use scalelink_common::Result;

use crate::models::FtpSettings;

/// Opens sessions to scale systems
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate. Fails with `ScaleError::TransportOpen`.
    async fn open(&self, settings: &FtpSettings) -> Result<Box<dyn TransportSession>>;
}

/// An open file transfer session
#[async_trait]
pub trait TransportSession: Send {
    /// Upload the local file at `local_path` to `remote_path` in binary
    /// mode. Fails with `ScaleError::TransportWrite`.
    async fn store_file(&mut self, remote_path: &str, local_path: &Path) -> Result<u64>;

    /// End the session
    async fn quit(&mut self) -> Result<()>;
}

/// Close a session, best effort: failures are logged and dropped.
pub async fn close_session(mut session: Box<dyn TransportSession>) {
    if let Err(e) = session.quit().await {
        warn!("Failed to close transport session gracefully: {}", e);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use scalelink_common::ScaleError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct BrokenQuit {
        quit_called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TransportSession for BrokenQuit {
        async fn store_file(&mut self, _remote_path: &str, _local_path: &Path) -> Result<u64> {
            Ok(0)
        }

        async fn quit(&mut self) -> Result<()> {
            self.quit_called.store(true, Ordering::SeqCst);
            Err(ScaleError::transport_write("QUIT", "connection reset by peer"))
        }
    }

    #[tokio::test]
    async fn test_close_session_swallows_quit_error() {
        let quit_called = Arc::new(AtomicBool::new(false));
        close_session(Box::new(BrokenQuit {
            quit_called: quit_called.clone(),
        }))
        .await;
        assert!(quit_called.load(Ordering::SeqCst));
    }
}
