//! Delivery to scale systems
//!
//! - **batch**: pending entries -> one bucket per scale system
//! - **keymap**: keypad slot file
//! - **transport** / **ftp**: session seam and its suppaftp implementation
//! - **image** / **push**: file uploads through local temporary files
//! - **ledger**: sent flags
//! - **cycle**: the delivery cycle tying it all together

pub mod batch;
pub mod cycle;
pub mod ftp;
pub mod image;
pub mod keymap;
pub mod ledger;
pub mod push;
pub mod transport;

pub use batch::{group_by_system, Bucket, ImagePush};
pub use cycle::{CycleReport, DeliveryCycle, DeliverySettings};
pub use ftp::FtpTransport;
pub use keymap::{key_map_lines, SlotQuery};
pub use push::PushSettings;
pub use transport::{close_session, Transport, TransportSession};
