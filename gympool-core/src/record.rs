//! Key-value records returned next to every environment step.
//!
//! ```rust
//! use gympool_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("reward", RecordValue::Scalar(1.0));
//! assert_eq!(record.get_scalar("reward").unwrap(), 1.0);
//! ```
mod base;
pub use base::{Record, RecordError, RecordValue};
