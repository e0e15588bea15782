//! In-memory representation shared by every file format.
//!
//! - [`atom`] - the per-particle record and its topology extension
//! - [`terms`] - bonded-term keys and kinds
//! - [`store`] - the two-layer bonded-term store
//! - [`topology`] - atoms plus terms, edited only through consistency-preserving operations
//! - [`coordinates`] - coordinate snapshots read from structure files
//! - [`particles`] - the injected live-particle capability

pub mod atom;
pub mod coordinates;
pub mod particles;
pub mod store;
pub mod terms;
pub mod topology;
