//! # Core Module
//!
//! The data model and everything that reads, writes or transforms it.
//!
//! - **Data model** ([`models`]) - atoms, coordinate snapshots, bonded terms
//!   and the consistency engine of [`models::topology::Topology`]
//! - **File I/O** ([`io`]) - GRO, PDB, GROMACS topology and LAMMPS formats
//! - **Graph export** ([`graph`]) - the bond graph of a topology
//! - **Settings** ([`settings`]) - TOML-backed reader and writer options

pub mod graph;
pub mod io;
pub mod models;
pub mod settings;
