#![warn(missing_docs)]

//! RECAP index subsystem: sorted CDXJ capture index, canonical keys, binary search
//!
//! This crate owns the on-disk capture index. An index is a UTF-8 text file:
//! a leading run of `!`-prefixed metadata lines followed by capture lines
//! sorted ascending by `canonicalKey SP timestamp` as a plain string
//! comparison. Sortedness is a precondition the search code assumes and
//! never verifies.

pub mod error;
pub mod keys;
pub mod record;
pub mod search;
pub mod store;

pub use error::{IndexError, IndexResult};
pub use keys::{canonicalize, decanonicalize};
pub use record::{validate_timestamp_query, CaptureRecord, RecordMeta};
pub use store::{IndexStats, IndexStore};
