//! Reader for LAMMPS data files and input scripts.
//!
//! A [`LammpsReader`] accumulates state across calls: an input script may
//! set units and styles and then pull in a data file, and a later data file
//! may refresh atom positions with [`LammpsReader::update_atoms`]. Atoms and
//! bonded terms land in the shared [`Topology`]; each term carries its
//! numeric type as its single parameter.

mod data;
mod input;

use crate::core::models::atom::AtomId;
use crate::core::models::particles::{ParticleSource, ParticleState};
use crate::core::models::topology::{ConsistencyError, Topology};
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DISTANCE_SCALE: f64 = 0.1;

#[derive(Debug, Error)]
pub enum LammpsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Line {line}: the header does not declare the number of {what}")]
    MissingCount { line: usize, what: String },
    #[error("Line {line}: {what} id {id} exceeds the declared count of {declared}")]
    CountOverflow {
        line: usize,
        what: String,
        id: usize,
        declared: usize,
    },
    #[error("Line {line}: {what} type {found} exceeds the declared {declared} types")]
    TypeOverflow {
        line: usize,
        what: String,
        found: u32,
        declared: usize,
    },
    #[error("Line {line}: charge of atom type {atom_type} is {found}, previously {expected}")]
    ChargeMismatch {
        line: usize,
        atom_type: u32,
        expected: f64,
        found: f64,
    },
    #[error("Line {line}: atom {id} is not declared in the Atoms section")]
    UndeclaredAtom { line: usize, id: AtomId },
    #[error("Line {line}: atom {id} is defined twice")]
    DuplicateAtom { line: usize, id: AtomId },
    #[error("Line {line}: cannot update atom {id}, it was never read")]
    UnknownAtom { line: usize, id: AtomId },
    #[error("Atom type {0} is not mapped to a molecule name")]
    UnnamedType(String),
    #[error("Molecule '{0}' has no atom name sequence")]
    MissingNameSequence(String),
    #[error("Inconsistent topology: {0}")]
    Consistency(#[from] ConsistencyError),
}

/// One side of a `pair_coeff` type pair: a numeric type or a wildcard
/// expression such as `*` or `2*4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairTypeRef {
    Type(u32),
    Wildcard(String),
}

impl PairTypeRef {
    pub fn parse(token: &str) -> Option<Self> {
        if token.contains('*') {
            Some(PairTypeRef::Wildcard(token.to_string()))
        } else {
            token.parse().ok().map(PairTypeRef::Type)
        }
    }
}

/// Force-field declarations gathered from data-file `Coeffs` sections and
/// input-script directives. Values are kept as raw tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceField {
    /// `pair_style`, `bond_style`, ... to their arguments.
    pub styles: BTreeMap<String, Vec<String>>,
    /// Coefficient family (`pair`, `bond`, `angle`, ...) to type to values.
    pub coeffs: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// `pair_coeff` entries keyed by the sorted type pair.
    pub pair_coeffs: BTreeMap<(PairTypeRef, PairTypeRef), Vec<String>>,
}

/// Maps atom types to molecule names and each molecule to the cyclic
/// sequence of atom names its atoms receive in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamingScheme {
    pub type_to_molecule: HashMap<String, String>,
    pub name_sequences: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LammpsReader {
    topology: Topology,
    images: BTreeMap<AtomId, Vector3<i32>>,
    velocities: BTreeMap<AtomId, Vector3<f64>>,
    box_dims: Vector3<f64>,
    box_origin: Vector3<f64>,
    distance_scale_factor: f64,
    units: Option<String>,
    force_field: ForceField,
    item_counts: HashMap<String, usize>,
    type_counts: HashMap<String, usize>,
    masses: HashMap<u32, f64>,
    type_charges: HashMap<u32, f64>,
}

impl Default for LammpsReader {
    fn default() -> Self {
        Self {
            topology: Topology::new(),
            images: BTreeMap::new(),
            velocities: BTreeMap::new(),
            box_dims: Vector3::zeros(),
            box_origin: Vector3::zeros(),
            distance_scale_factor: DEFAULT_DISTANCE_SCALE,
            units: None,
            force_field: ForceField::default(),
            item_counts: HashMap::new(),
            type_counts: HashMap::new(),
            masses: HashMap::new(),
            type_charges: HashMap::new(),
        }
    }
}

impl LammpsReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance_scale(mut self, factor: f64) -> Self {
        self.distance_scale_factor = factor;
        self
    }

    /// Forgets everything read so far, keeping the force field and the
    /// distance scale factor.
    pub fn reset(&mut self) {
        self.topology.reset();
        self.images.clear();
        self.velocities.clear();
        self.box_dims = Vector3::zeros();
        self.box_origin = Vector3::zeros();
        self.item_counts.clear();
        self.type_counts.clear();
        self.masses.clear();
        self.type_charges.clear();
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn into_topology(self) -> Topology {
        self.topology
    }

    pub fn force_field(&self) -> &ForceField {
        &self.force_field
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn distance_scale_factor(&self) -> f64 {
        self.distance_scale_factor
    }

    /// Box extents `(hi - lo) * scale` along x, y and z.
    pub fn box_dims(&self) -> Vector3<f64> {
        self.box_dims
    }

    /// The scaled `lo` corner of the box.
    pub fn box_origin(&self) -> Vector3<f64> {
        self.box_origin
    }

    pub fn image(&self, id: AtomId) -> Option<Vector3<i32>> {
        self.images.get(&id).copied()
    }

    pub fn velocity(&self, id: AtomId) -> Option<Vector3<f64>> {
        self.velocities.get(&id).copied()
    }

    pub fn mass_of_type(&self, atom_type: u32) -> Option<f64> {
        self.masses.get(&atom_type).copied()
    }

    /// Names every atom from its type: the type selects a molecule name and
    /// the molecule's name sequence is cycled over its atoms in id order.
    ///
    /// Names are only written once every atom could be named.
    pub fn assign_names(&mut self, scheme: &NamingScheme) -> Result<(), LammpsError> {
        let mut cursors: HashMap<&str, usize> = HashMap::new();
        let mut names: HashMap<AtomId, (String, String)> = HashMap::new();

        for atom in self.topology.atoms() {
            let molecule = scheme
                .type_to_molecule
                .get(&atom.atom_type)
                .ok_or_else(|| LammpsError::UnnamedType(atom.atom_type.clone()))?;
            let sequence = scheme
                .name_sequences
                .get(molecule)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| LammpsError::MissingNameSequence(molecule.clone()))?;
            let cursor = cursors.entry(molecule.as_str()).or_default();
            let name = sequence[*cursor % sequence.len()].clone();
            *cursor += 1;
            names.insert(atom.id(), (molecule.clone(), name));
        }

        debug!("Assigning names to {} atoms", names.len());
        self.topology.edit_atoms(|atom| {
            if let Some((molecule, name)) = names.remove(&atom.id()) {
                atom.atom.molecule_type = molecule;
                atom.atom.name = name;
            }
        });
        Ok(())
    }
}

impl ParticleSource for LammpsReader {
    fn particle(&self, id: AtomId) -> Option<ParticleState> {
        let atom = self.topology.atom(id)?;
        Some(ParticleState {
            position: Point3::from(atom.atom.position.coords),
            image: self.image(id).unwrap_or_else(Vector3::zeros),
            velocity: self.velocity(id).unwrap_or_else(Vector3::zeros),
        })
    }
}
