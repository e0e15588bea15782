use nalgebra::Point3;

/// Identifier of an atom as it appears in a structure or topology file.
pub type AtomId = usize;

/// Represents a single particle record shared by every file format.
///
/// An `Atom` is a plain value: readers create it, edit operations replace it
/// wholesale (e.g. with a new id or position), and writers serialize it.
/// The `id` is unique within one snapshot but need not be contiguous until
/// the owning collection is renumbered.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom id (serial number) within its snapshot.
    pub id: AtomId,
    /// The display name of the atom (e.g., "OW", "C1").
    pub name: String,
    /// The name of the molecule type this atom belongs to (e.g., "SOL").
    pub molecule_type: String,
    /// The index distinguishing repeated copies of the same molecule type.
    pub molecule_index: usize,
    /// The 3D coordinates of the atom in the model's length unit (nm).
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` placed at the origin.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom id.
    /// * `name` - The display name of the atom.
    /// * `molecule_type` - The molecule type name.
    /// * `molecule_index` - The molecule index.
    pub fn new(id: AtomId, name: &str, molecule_type: &str, molecule_index: usize) -> Self {
        Self {
            id,
            name: name.to_string(),
            molecule_type: molecule_type.to_string(),
            molecule_index,
            position: Point3::origin(),
        }
    }

    /// Returns a copy of this atom carrying a different id.
    pub fn with_id(&self, id: AtomId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    /// Returns a copy of this atom placed at `position`.
    pub fn with_position(&self, position: Point3<f64>) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// An atom as declared by a topology, carrying force-field bookkeeping on top
/// of the shared [`Atom`] record.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyAtom {
    pub atom: Atom,
    pub atom_type: String,  // Force-field atom type (a number for LAMMPS)
    pub charge_group: i64,  // Charge group number, 0 when the format has none
    pub charge: Option<f64>, // Partial charge in elementary charge units
    pub mass: Option<f64>,   // Mass in atomic mass units
}

impl TopologyAtom {
    pub fn new(atom: Atom, atom_type: &str) -> Self {
        Self {
            atom,
            atom_type: atom_type.to_string(),
            charge_group: 0,
            charge: None,
            mass: None,
        }
    }

    pub fn id(&self) -> AtomId {
        self.atom.id
    }
}
