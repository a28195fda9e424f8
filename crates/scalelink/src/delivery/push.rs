//! Text and image uploads
//!
//! Each upload goes through a local temporary file: write, store, delete.
//! Any failure along the way is a `TransportWrite` error.

use chrono::{DateTime, Local};
use chrono::format::{Item, StrftimeItems};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use scalelink_common::{Result, ScaleError, TextEncoding};

use super::image::resize_for_scale;
use super::transport::TransportSession;
use crate::encode::field::image_file_name;
use crate::models::Product;

/// Local side of the uploads
#[derive(Debug, Clone)]
pub struct PushSettings {
    /// Folder receiving temporary files before upload
    pub local_folder: PathBuf,
    /// Edge of the square product thumbnails
    pub image_size: u32,
}

/// Render a strftime file name pattern; unknown specifiers are rejected
pub fn format_file_name(pattern: &str, now: &DateTime<Local>) -> Result<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ScaleError::InvalidPattern(pattern.to_string()));
    }
    Ok(now.format_with_items(items.into_iter()).to_string())
}

/// Join a remote folder and a file name with `/`
pub fn remote_path(folder: &str, file_name: &str) -> String {
    if folder.is_empty() {
        file_name.to_string()
    } else if folder.ends_with('/') {
        format!("{}{}", folder, file_name)
    } else {
        format!("{}/{}", folder, file_name)
    }
}

/// Upload `lines` as one file named after `pattern`.
///
/// Returns the file name, or `None` when there was nothing to send.
pub async fn push_text(
    session: &mut dyn TransportSession,
    settings: &PushSettings,
    remote_folder: &str,
    pattern: &str,
    lines: &[String],
    encoding: TextEncoding,
    now: &DateTime<Local>,
) -> Result<Option<String>> {
    if lines.is_empty() {
        return Ok(None);
    }

    let file_name = format_file_name(pattern, now)?;
    let local_path = settings.local_folder.join(&file_name);
    let remote = remote_path(remote_folder, &file_name);

    write_local_text(&local_path, lines, encoding)
        .map_err(|e| ScaleError::transport_write(local_path.display().to_string(), e))?;
    upload_and_remove(session, &remote, &local_path).await?;

    info!("Sent {} ({} lines, {})", remote, lines.len(), encoding);
    Ok(Some(file_name))
}

/// Upload the 120x120 thumbnail of `product`'s image field.
///
/// Returns the file name, or `None` when the product has no usable image.
/// A payload that cannot be converted is skipped with a warning.
pub async fn push_image(
    session: &mut dyn TransportSession,
    settings: &PushSettings,
    remote_folder: &str,
    product: &Product,
    field_name: Option<&str>,
    suffix: &str,
) -> Result<Option<String>> {
    let Some(data) = field_name.and_then(|name| product.image(name)) else {
        debug!(product_id = product.id, "No image to send");
        return Ok(None);
    };

    let file_name = image_file_name(product.id, suffix);
    let local_path = settings.local_folder.join(&file_name);
    let remote = remote_path(remote_folder, &file_name);

    let thumbnail = match resize_for_scale(data, suffix, settings.image_size) {
        Ok(thumbnail) => thumbnail,
        Err(e) => {
            warn!(product_id = product.id, "Skipping image {}: {}", remote, e);
            return Ok(None);
        },
    };
    fs::write(&local_path, thumbnail)
        .map_err(|e| ScaleError::transport_write(local_path.display().to_string(), e))?;
    upload_and_remove(session, &remote, &local_path).await?;

    info!("Sent image {}", remote);
    Ok(Some(file_name))
}

fn write_local_text(path: &Path, lines: &[String], encoding: TextEncoding) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    for line in lines {
        file.write_all(&encoding.encode_line(line))?;
    }
    file.flush()
}

async fn upload_and_remove(
    session: &mut dyn TransportSession,
    remote: &str,
    local_path: &Path,
) -> Result<()> {
    let stored = session.store_file(remote, local_path).await;
    let removed = fs::remove_file(local_path);
    stored?;
    removed.map_err(|e| ScaleError::transport_write(local_path.display().to_string(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Session keeping uploaded bytes in memory
    #[derive(Default)]
    struct MemorySession {
        files: Vec<(String, Vec<u8>)>,
        fail: bool,
    }

    #[async_trait]
    impl TransportSession for MemorySession {
        async fn store_file(&mut self, remote_path: &str, local_path: &Path) -> Result<u64> {
            if self.fail {
                return Err(ScaleError::transport_write(remote_path, "550 permission denied"));
            }
            let data = fs::read(local_path).unwrap();
            let len = data.len() as u64;
            self.files.push((remote_path.to_string(), data));
            Ok(len)
        }

        async fn quit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn settings(dir: &tempfile::TempDir) -> PushSettings {
        PushSettings {
            local_folder: dir.path().to_path_buf(),
            image_size: 120,
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 14, 5, 9).unwrap()
    }

    #[test]
    fn test_format_file_name() {
        assert_eq!(
            format_file_name("ARTI%Y%m%d%H%M%S.csv", &now()).unwrap(),
            "ARTI20261016140509.csv"
        );
        assert!(matches!(
            format_file_name("ARTI%Q.csv", &now()),
            Err(ScaleError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("", "a.csv"), "a.csv");
        assert_eq!(remote_path("csv", "a.csv"), "csv/a.csv");
        assert_eq!(remote_path("csv/", "a.csv"), "csv/a.csv");
    }

    #[tokio::test]
    async fn test_push_text_encodes_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MemorySession::default();
        let lines = vec!["C#1#L\u{2019}\u{e9}t\u{e9}#\r\n".to_string(), "C#2#\r\n".to_string()];

        let name = push_text(
            &mut session,
            &settings(&dir),
            "csv",
            "ARTI%Y.csv",
            &lines,
            TextEncoding::Latin1,
            &now(),
        )
        .await
        .unwrap();

        assert_eq!(name.as_deref(), Some("ARTI2026.csv"));
        assert_eq!(session.files.len(), 1);
        assert_eq!(session.files[0].0, "csv/ARTI2026.csv");
        assert_eq!(session.files[0].1, b"C#1#L'\xe9t\xe9#\r\nC#2#\r\n".to_vec());
        assert!(!dir.path().join("ARTI2026.csv").exists());
    }

    #[tokio::test]
    async fn test_push_text_without_lines_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MemorySession::default();
        let (settings, utf8) = (settings(&dir), TextEncoding::Utf8);
        let name = push_text(&mut session, &settings, "csv", "A.csv", &[], utf8, &now())
            .await
            .unwrap();
        assert!(name.is_none());
        assert!(session.files.is_empty());
    }

    #[tokio::test]
    async fn test_push_text_failure_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MemorySession {
            fail: true,
            ..Default::default()
        };
        let lines = vec!["x\n".to_string()];
        let err = push_text(
            &mut session,
            &settings(&dir),
            "csv",
            "ARTI.csv",
            &lines,
            TextEncoding::Utf8,
            &now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScaleError::TransportWrite { .. }));
        assert!(!dir.path().join("ARTI.csv").exists());
    }

    #[tokio::test]
    async fn test_push_image_without_payload_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MemorySession::default();
        let product = Product::new(5, "Kiwi");
        let name = push_image(&mut session, &settings(&dir), "img", &product, Some("image"), ".PNG")
            .await
            .unwrap();
        assert!(name.is_none());
        assert!(session.files.is_empty());
    }

    #[tokio::test]
    async fn test_push_image_skips_unreadable_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MemorySession::default();
        let product =
            Product::new(5, "Kiwi").with_field("image", FieldValue::Image(b"GIF89a?".to_vec()));

        let name = push_image(&mut session, &settings(&dir), "img", &product, Some("image"), ".PNG")
            .await
            .unwrap();
        assert!(name.is_none());

        let name = push_image(&mut session, &settings(&dir), "img", &product, Some("image"), ".XYZ")
            .await
            .unwrap();
        assert!(name.is_none());
        assert!(session.files.is_empty());
        assert!(!dir.path().join("5.PNG").exists());
    }
}
