//! Shared fixtures for scalelink integration tests
//!
//! [`RecordingTransport`] stands in for the FTP transport: every stored file
//! is kept in memory with the host it was sent to, and failures can be
//! injected per host (open, quit) or per remote path fragment (upload).

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

use scalelink::delivery::{DeliverySettings, PushSettings, SlotQuery, Transport, TransportSession};
use scalelink::models::{FtpSettings, LineFieldDefinition, ScaleSystem};
use scalelink::{Result, ScaleError};
use scalelink_common::TextEncoding;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,scalelink=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// One stored file
#[derive(Debug, Clone)]
pub struct Upload {
    pub host: String,
    pub remote_path: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Default)]
struct Recorder {
    uploads: Vec<Upload>,
    opened: Vec<String>,
    closed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    recorder: Arc<Mutex<Recorder>>,
    fail_open_hosts: Vec<String>,
    fail_quit_hosts: Vec<String>,
    fail_store_containing: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(mut self, host: &str) -> Self {
        self.fail_open_hosts.push(host.to_string());
        self
    }

    pub fn failing_quit(mut self, host: &str) -> Self {
        self.fail_quit_hosts.push(host.to_string());
        self
    }

    pub fn failing_store(mut self, fragment: &str) -> Self {
        self.fail_store_containing = Some(fragment.to_string());
        self
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.recorder.lock().unwrap().uploads.clone()
    }

    pub fn uploads_to(&self, host: &str) -> Vec<Upload> {
        self.uploads().into_iter().filter(|u| u.host == host).collect()
    }

    pub fn opened(&self) -> Vec<String> {
        self.recorder.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.recorder.lock().unwrap().closed.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn open(&self, settings: &FtpSettings) -> Result<Box<dyn TransportSession>> {
        if self.fail_open_hosts.contains(&settings.host) {
            let target = settings.display_target();
            return Err(ScaleError::transport_open(target, "connection refused"));
        }
        self.recorder.lock().unwrap().opened.push(settings.host.clone());
        Ok(Box::new(RecordingSession {
            host: settings.host.clone(),
            recorder: self.recorder.clone(),
            fail_store_containing: self.fail_store_containing.clone(),
            fail_quit: self.fail_quit_hosts.contains(&settings.host),
        }))
    }
}

struct RecordingSession {
    host: String,
    recorder: Arc<Mutex<Recorder>>,
    fail_store_containing: Option<String>,
    fail_quit: bool,
}

#[async_trait]
impl TransportSession for RecordingSession {
    async fn store_file(&mut self, remote_path: &str, local_path: &Path) -> Result<u64> {
        if let Some(fragment) = &self.fail_store_containing {
            if remote_path.contains(fragment.as_str()) {
                return Err(ScaleError::transport_write(remote_path, "552 disk full"));
            }
        }
        let data = std::fs::read(local_path)?;
        let len = data.len() as u64;
        self.recorder.lock().unwrap().uploads.push(Upload {
            host: self.host.clone(),
            remote_path: remote_path.to_string(),
            data,
        });
        Ok(len)
    }

    async fn quit(&mut self) -> Result<()> {
        self.recorder.lock().unwrap().closed.push(self.host.clone());
        if self.fail_quit {
            return Err(ScaleError::transport_write("QUIT", "421 service not available"));
        }
        Ok(())
    }
}

pub fn settings(dir: &tempfile::TempDir) -> DeliverySettings {
    DeliverySettings {
        push: PushSettings {
            local_folder: dir.path().to_path_buf(),
            image_size: 120,
        },
        slot_query: SlotQuery::default(),
    }
}

pub fn system(
    id: i64,
    host: &str,
    encoding: TextEncoding,
    lines: Vec<LineFieldDefinition>,
) -> ScaleSystem {
    ScaleSystem {
        id,
        name: format!("Scale {}", id),
        encoding,
        ftp: FtpSettings::new(host),
        csv_relative_path: "csv".to_string(),
        product_image_relative_path: "img".to_string(),
        product_text_file_pattern: "ARTI%Y%m%d%H%M%S.csv".to_string(),
        external_text_file_pattern: "TEXT%Y%m%d%H%M%S.csv".to_string(),
        send_images: false,
        product_lines: lines,
    }
}
