//! Domain model

pub mod line;
pub mod log_entry;
pub mod product;
pub mod system;
pub mod value;

pub use line::{LineFieldDefinition, LineFieldType, DEFAULT_IMAGE_SUFFIX};
pub use log_entry::{Action, ChangeLogEntry};
pub use product::{Product, ScaleGroup};
pub use system::{FtpSettings, ScaleSystem};
pub use value::{FieldValue, RelatedRecord};
