//! Record encoding engine
//!
//! - **field**: one line definition + one product value -> fragment
//! - **record**: ordered definitions -> primary record + satellite records

pub mod field;
pub mod record;

pub use field::{clean, encode_field, EncodeContext, EncodedField};
pub use record::{build_record, EncodedRecord};
