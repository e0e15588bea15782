//! Reader and writer for the sectioned GROMACS topology format (`.top`).
//!
//! The reader fills a [`GromacsTopology`]: the shared [`Topology`] plus the
//! force-field tables and bookkeeping sections of the file. Every raw line
//! is kept so the writer can replay comments, includes and unrecognized
//! sections verbatim while regenerating the bodies of sections it knows.

mod params;
mod reader;
mod section;
mod writer;

pub use params::{TypeEntry, TypeTable};
pub use section::Section;

use super::traits::MolecularFile;
use crate::core::models::topology::{ConsistencyError, Topology};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TopError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line} in section [ {section} ]: {message}")]
    Parse {
        line: usize,
        section: String,
        message: String,
    },
    #[error("Inconsistent topology: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeType {
    pub name: String,
    pub nrexcl: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GromacsTopology {
    pub topology: Topology,
    pub defaults: Vec<String>, // Opaque `[ defaults ]` tokens
    pub atom_types: TypeTable,
    pub bond_types: TypeTable,
    pub angle_types: TypeTable,
    pub dihedral_types: TypeTable,
    pub molecule_type: Option<MoleculeType>,
    pub system_name: Option<String>,
    pub molecules: Vec<MoleculeCount>,
    content: Vec<String>,
    includes: Vec<String>,
    unknown_sections: Vec<String>,
}

impl GromacsTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw lines captured at read time, replayed by the writer.
    pub fn content(&self) -> &[String] {
        &self.content
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Names of sections that had no parser, in order of first appearance.
    pub fn unknown_sections(&self) -> &[String] {
        &self.unknown_sections
    }

    /// Drops the captured lines so the next write synthesizes a fresh file.
    pub fn forget_content(&mut self) {
        self.content.clear();
    }

    /// Drops every term added since load.
    pub fn reset_overlay(&mut self) {
        self.topology.clear_overlay();
    }

    /// Expands the single declared molecule into the number of copies
    /// listed under `[ molecules ]`.
    ///
    /// The count is taken from the entry naming the declared molecule type,
    /// or from the first entry if no entry matches. Afterwards that entry's
    /// count is 1, since the copies are now explicit atoms.
    ///
    /// # Return
    ///
    /// The number of copies.
    ///
    /// # Errors
    ///
    /// Returns [`TopError::MissingRecord`] without a `[ molecules ]` entry and
    /// [`TopError::Consistency`] if the atom ids are not contiguous from 1.
    pub fn replicate(&mut self) -> Result<usize, TopError> {
        let declared = self.molecule_type.as_ref().map(|m| m.name.as_str());
        let slot = self
            .molecules
            .iter()
            .position(|m| Some(m.name.as_str()) == declared)
            .or(if self.molecules.is_empty() { None } else { Some(0) })
            .ok_or_else(|| TopError::MissingRecord("[ molecules ] entry".into()))?;

        let count = self.molecules[slot].count;
        if count > 1 {
            info!("Replicating topology to {} molecules", count);
        }
        self.topology.replicate(count)?;
        self.molecules[slot].count = 1;
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopOptions {
    pub skip_cross: bool, // Drop every cross_* section on write
}

pub struct TopFile;

impl MolecularFile for TopFile {
    type Data = GromacsTopology;
    type Options = TopOptions;
    type Error = TopError;

    fn read_from(
        reader: &mut impl BufRead,
        _options: &Self::Options,
    ) -> Result<Self::Data, Self::Error> {
        reader::read(reader)
    }

    fn write_to(
        data: &Self::Data,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in writer::render(data, options.skip_cross) {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::terms::{TermClass, TermKey, TermKind};
    use std::io::Cursor;

    const DIMER_TOP: &str = "\
[ moleculetype ]
DIM 3

[ atoms ]
1 C 1 DIM C1 1 0.0 12.0
2 C 1 DIM C2 1 0.0 12.0

[ bonds ]
1 2 1 0.15 1000

[ system ]
dimers

[ molecules ]
DIM 3
";

    #[test]
    fn replicate_uses_molecules_count_and_resets_it() {
        let mut top = TopFile::read_from(&mut Cursor::new(DIMER_TOP), &TopOptions::default())
            .unwrap();

        assert_eq!(top.replicate().unwrap(), 3);

        assert_eq!(top.topology.len(), 6);
        let bonds = top.topology.terms().base(TermKind::new(TermClass::Bonds));
        assert_eq!(bonds.len(), 3);
        assert!(bonds.contains_key(&TermKey::pair(5, 6)));
        assert_eq!(top.topology.atom(4).unwrap().atom.molecule_index, 2);
        assert_eq!(top.molecules[0].count, 1);
    }

    #[test]
    fn replicate_without_molecules_section_fails() {
        let mut top = GromacsTopology::new();
        assert!(matches!(top.replicate(), Err(TopError::MissingRecord(_))));
    }

    #[test]
    fn reset_overlay_keeps_base_terms() {
        let mut top = TopFile::read_from(&mut Cursor::new(DIMER_TOP), &TopOptions::default())
            .unwrap();
        let bonds = TermKind::new(TermClass::Bonds);
        top.topology
            .insert_overlay_term(bonds, TermKey::pair(1, 2), vec!["1".into()])
            .unwrap();

        top.reset_overlay();

        assert_eq!(top.topology.terms().overlay_len(), 0);
        assert_eq!(top.topology.terms().base(bonds).len(), 1);
    }
}
