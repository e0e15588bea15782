//! # Workflows Module
//!
//! High-level entry points that tie the format readers together.
//!
//! - **Loading** ([`load`]) - reads a coordinate or topology file, picking
//!   the format from the file extension.

pub mod load;
