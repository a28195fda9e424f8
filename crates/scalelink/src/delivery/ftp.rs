//! FTP transport backed by suppaftp
//!
//! suppaftp's stream is blocking, so every network call runs on the
//! blocking thread pool. The stream is moved into the blocking task and
//! handed back with the result.

use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use tracing::{debug, error, info};

use scalelink_common::{Result, ScaleError};

use super::transport::{Transport, TransportSession};
use crate::models::FtpSettings;

/// Login used when a scale system has none configured
pub const ANONYMOUS_LOGIN: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Opens passive-mode binary FTP sessions
#[derive(Debug, Clone, Default)]
pub struct FtpTransport;

impl FtpTransport {
    pub fn new() -> Self {
        Self
    }

    fn connect_sync(settings: &FtpSettings) -> std::result::Result<FtpStream, String> {
        let mut stream = FtpStream::connect(format!("{}:{}", settings.host, settings.port))
            .map_err(|e| format!("connect failed: {}", e))?;
        stream.set_mode(Mode::Passive);

        let login = settings.login.as_deref().filter(|l| !l.is_empty());
        match login {
            Some(login) => {
                debug!("Logging in as: {}", login);
                stream
                    .login(login, settings.password.as_deref().unwrap_or(""))
                    .map_err(|e| format!("login failed: {}", e))?;
            },
            None => {
                debug!("Logging in anonymously");
                stream
                    .login(ANONYMOUS_LOGIN, ANONYMOUS_PASSWORD)
                    .map_err(|e| format!("anonymous login failed: {}", e))?;
            },
        }

        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| format!("failed to set binary mode: {}", e))?;
        Ok(stream)
    }
}

#[async_trait]
impl Transport for FtpTransport {
    async fn open(&self, settings: &FtpSettings) -> Result<Box<dyn TransportSession>> {
        let target = settings.display_target();
        info!("Trying to connect to {}", target);

        let owned = settings.clone();
        let stream = tokio::task::spawn_blocking(move || Self::connect_sync(&owned))
            .await
            .map_err(|e| {
                ScaleError::transport_open(&target, format!("connect task panicked: {}", e))
            })?
            .map_err(|e| {
                error!("Connection to {} failed.", target);
                ScaleError::transport_open(&target, e)
            })?;

        Ok(Box::new(FtpSession {
            stream: Some(stream),
            target,
        }))
    }
}

/// Open FTP session; `stream` is `None` once quit or lost
pub struct FtpSession {
    stream: Option<FtpStream>,
    target: String,
}

#[async_trait]
impl TransportSession for FtpSession {
    async fn store_file(&mut self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| ScaleError::transport_write(remote_path, "session is closed"))?;

        let remote = remote_path.to_string();
        let local: PathBuf = local_path.to_path_buf();
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = File::open(&local)
                .map_err(|e| format!("cannot read {}: {}", local.display(), e))
                .and_then(|mut file| {
                    stream
                        .put_file(&remote, &mut file)
                        .map_err(|e| format!("STOR failed: {}", e))
                });
            (stream, result)
        })
        .await
        .map_err(|e| {
            ScaleError::transport_write(remote_path, format!("upload task panicked: {}", e))
        })?;

        self.stream = Some(stream);
        let written = result.map_err(|e| ScaleError::transport_write(remote_path, e))?;
        debug!("Stored {} ({} bytes) on {}", remote_path, written, self.target);
        Ok(written)
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || stream.quit())
            .await
            .map_err(|e| {
                ScaleError::transport_write(&target, format!("quit task panicked: {}", e))
            })?
            .map_err(|e| ScaleError::transport_write(&target, e))
    }
}
