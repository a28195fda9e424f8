//! Scalelink Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Encodes catalog products into the record format of Bizerba-style scales
//! and delivers the resulting files over FTP.
//!
//! # Overview
//!
//! - **Encoding**: line definitions turn a product into one primary record
//!   and its satellite (external text) records ([`encode`])
//! - **Change log**: product changes are recorded per scale system with
//!   their texts cached ([`changelog`])
//! - **Delivery**: pending entries are grouped per scale system and pushed
//!   as text, image and key files ([`delivery`])
//! - **Storage**: in-memory and PostgreSQL stores ([`store`])

pub mod changelog;
pub mod config;
pub mod delivery;
pub mod encode;
pub mod models;
pub mod store;

pub use changelog::ChangeLog;
pub use delivery::{CycleReport, DeliveryCycle, DeliverySettings, FtpTransport};
pub use scalelink_common::{Result, ScaleError};

use clap::{Parser, Subcommand};

/// Scalelink - product export to scale systems
#[derive(Parser, Debug)]
#[command(name = "scalelink")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deliver every pending change log entry
    Send,

    /// Deliver the given change log entries, even if already sent
    SendIds {
        /// Change log entry ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },

    /// Print the number of entries waiting for delivery
    Pending,

    /// Print the key file of a scale system
    Keymap {
        /// Scale system id
        #[arg(long)]
        system: i64,
    },

    /// Record a product change for a scale system
    Record {
        /// create, update or delete
        #[arg(long, default_value = "update")]
        action: String,

        /// Product id
        #[arg(long)]
        product: i64,

        /// Scale system id
        #[arg(long)]
        system: i64,
    },

    /// Recompute the cached texts of a change log entry
    Refresh {
        /// Change log entry id
        id: i64,
    },
}
