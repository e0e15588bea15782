//! # moltopo
//!
//! A molecular topology data model with structural I/O for GRO and PDB
//! coordinates, GROMACS `.top` topologies and LAMMPS data files.
//!
//! - **[`core`]: The Foundation.** Atom records, coordinate snapshots, the
//!   two-layer bonded-term store and the topology that keeps them
//!   consistent, plus every format reader and writer.
//!
//! - **[`workflows`]: The Public API.** Format-dispatching entry points that
//!   pick a reader from a file's extension.

pub mod core;
pub mod workflows;
