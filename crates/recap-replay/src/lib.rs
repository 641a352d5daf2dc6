#![warn(missing_docs)]

//! RECAP replay subsystem: Memento resolution, TimeMap generation, capture reconstruction
//!
//! Everything between an index hit and an HTTP response lives here:
//! picking the best capture for a target datetime, rendering RFC 7089
//! TimeMaps in link and CDXJ formats, and rebuilding a faithful HTTP
//! response out of a capture's header and payload blobs.

pub mod datetime;
pub mod error;
pub mod reconstruct;
pub mod resolve;
pub mod timemap;

pub use error::{ReplayError, ReplayResult};
pub use reconstruct::{ReconstructedResponse, Reconstructor};
pub use resolve::{MementoResolver, Resolution};
pub use timemap::TimeMapLinks;
