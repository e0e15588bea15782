//! Readers and writers for the supported structure and topology formats.
//!
//! Coordinate formats (GRO, PDB) and the sectioned GROMACS topology share the
//! [`traits::MolecularFile`] interface. The LAMMPS reader is stateful and
//! lives behind its own [`lammps::LammpsReader`] type.

pub mod backup;
pub mod coordinate_file;
pub mod gro;
pub mod lammps;
pub mod pdb;
pub mod top;
pub mod traits;
