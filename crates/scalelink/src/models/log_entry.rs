//! Change log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog mutation that triggered the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    /// First column of the product record
    pub fn code(self) -> char {
        match self {
            Action::Create | Action::Update => 'C',
            Action::Delete => 'S',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "update" | "write" => Ok(Action::Update),
            "delete" | "unlink" => Ok(Action::Delete),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// One pending (or delivered) product change for one scale system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub log_date: DateTime<Utc>,
    pub action: Action,
    pub scale_system_id: i64,
    pub product_id: i64,
    /// Cached primary record, terminator included
    pub product_text: String,
    /// Cached satellite records, terminator separated and terminated
    pub external_text: String,
    pub external_text_display: String,
    pub sent: bool,
    pub last_send_date: Option<DateTime<Utc>>,
}
