//! Scale systems: one FTP endpoint and one record layout each

use scalelink_common::TextEncoding;
use serde::{Deserialize, Serialize};

use super::line::{LineFieldDefinition, LineFieldType};

pub const DEFAULT_FTP_PORT: u16 = 21;

/// FTP connection parameters of a scale system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl FtpSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            login: None,
            password: None,
        }
    }

    /// `ftp://login@host:port`, for logs (never includes the password)
    pub fn display_target(&self) -> String {
        format!(
            "ftp://{}@{}:{}",
            self.login.as_deref().unwrap_or(""),
            self.host,
            self.port
        )
    }
}

/// A scale system and its record layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSystem {
    pub id: i64,
    pub name: String,
    pub encoding: TextEncoding,
    pub ftp: FtpSettings,
    /// Remote folder receiving text files
    pub csv_relative_path: String,
    /// Remote folder receiving product images
    pub product_image_relative_path: String,
    /// strftime pattern of the product text file (contains `ARTI`)
    pub product_text_file_pattern: String,
    pub external_text_file_pattern: String,
    pub send_images: bool,
    /// Columns of the product record, in output order
    pub product_lines: Vec<LineFieldDefinition>,
}

impl ScaleSystem {
    pub fn line_terminator(&self) -> &'static str {
        self.encoding.line_terminator()
    }

    /// Image columns; each one queues an image upload per delivered entry
    pub fn image_lines(&self) -> impl Iterator<Item = &LineFieldDefinition> {
        self.product_lines
            .iter()
            .filter(|line| line.field_type == LineFieldType::ProductImage)
    }
}
