//! Scalelink Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging bootstrap and scale text encodings.
//!
//! # Overview
//!
//! - **Error Handling**: [`ScaleError`] and the crate-wide [`Result`] alias
//! - **Encodings**: line terminators and byte encoding for scale files
//! - **Logging**: `tracing` subscriber setup driven by the environment
//!
//! # Example
//!
//! ```no_run
//! use scalelink_common::encoding::TextEncoding;
//!
//! let encoding: TextEncoding = "iso-8859-1".parse().unwrap();
//! assert_eq!(encoding.line_terminator(), "\r\n");
//! let bytes = encoding.encode_line("Caf\u{e9} \u{2018}bio\u{2019}");
//! assert_eq!(bytes, b"Caf\xe9 'bio'");
//! ```

pub mod encoding;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use encoding::TextEncoding;
pub use error::{Result, ScaleError};
