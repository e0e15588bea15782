use super::atom::{AtomId, TopologyAtom};
use super::coordinates::CoordinateSet;
use super::store::BondedTermStore;
use super::terms::{InvalidKeyLength, TermClass, TermKey, TermKind, TermParams};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Duplicate atom id: {0}")]
    DuplicateAtom(AtomId),
    #[error("Atom id {0} not found")]
    UnknownAtom(AtomId),
    #[error("{kind} term {key} references atom {id} which does not exist")]
    DanglingReference {
        kind: TermKind,
        key: TermKey,
        id: AtomId,
    },
    #[error("Atom ids must be exactly 1..={expected} to replicate (found max id {found})")]
    NonContiguousIds { expected: usize, found: AtomId },
    #[error("Invalid replication count: {0}")]
    InvalidReplication(usize),
    #[error(transparent)]
    InvalidKey(#[from] InvalidKeyLength),
    #[error("{kind} term {key} must hold {expected} atom ids")]
    KeyArity {
        kind: TermKind,
        key: TermKey,
        expected: usize,
    },
}

/// Derived lookup tables from molecule names to atom ids.
#[derive(Debug, Clone, Default, PartialEq)]
struct MoleculeIndex {
    // molecule_type -> molecule_index -> atom_name -> id
    by_index: HashMap<String, BTreeMap<usize, HashMap<String, AtomId>>>,
    // molecule_type -> atom_name -> [id]
    by_name: HashMap<String, HashMap<String, Vec<AtomId>>>,
}

impl MoleculeIndex {
    fn insert(&mut self, atom: &TopologyAtom) {
        let a = &atom.atom;
        self.by_index
            .entry(a.molecule_type.clone())
            .or_default()
            .entry(a.molecule_index)
            .or_default()
            .insert(a.name.clone(), a.id);
        self.by_name
            .entry(a.molecule_type.clone())
            .or_default()
            .entry(a.name.clone())
            .or_default()
            .push(a.id);
    }

    fn remove(&mut self, atom: &TopologyAtom) {
        let a = &atom.atom;
        if let Some(molecules) = self.by_index.get_mut(&a.molecule_type) {
            if let Some(names) = molecules.get_mut(&a.molecule_index) {
                if names.get(&a.name) == Some(&a.id) {
                    names.remove(&a.name);
                }
            }
        }
        if let Some(names) = self.by_name.get_mut(&a.molecule_type) {
            if let Some(ids) = names.get_mut(&a.name) {
                ids.retain(|&id| id != a.id);
            }
        }
    }

    fn rebuild<'a>(atoms: impl Iterator<Item = &'a TopologyAtom>) -> Self {
        let mut index = Self::default();
        for atom in atoms {
            index.insert(atom);
        }
        index
    }
}

/// The atom table and bonded-term store of one topology, edited only through
/// operations that keep them referentially consistent.
///
/// Every id referenced by a bonded term (in the base layer or the overlay)
/// is guaranteed to exist in the atom table. Removal drops dependent terms,
/// renumbering rewrites every collection in one pass, and replication
/// shifts every collection alongside the atoms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: BTreeMap<AtomId, TopologyAtom>,
    terms: BondedTermStore,
    molecules: MoleculeIndex,
}

impl Topology {
    /// Creates a new, empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all atoms and terms.
    pub fn reset(&mut self) {
        self.atoms.clear();
        self.terms.clear();
        self.molecules = MoleculeIndex::default();
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom(&self, id: AtomId) -> Option<&TopologyAtom> {
        self.atoms.get(&id)
    }

    /// Returns an iterator over all atoms in ascending id order.
    pub fn atoms(&self) -> impl Iterator<Item = &TopologyAtom> {
        self.atoms.values()
    }

    pub fn atom_ids(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atoms.keys().copied()
    }

    /// Read-only access to the bonded-term store.
    pub fn terms(&self) -> &BondedTermStore {
        &self.terms
    }

    /// Finds the atom called `name` in copy `molecule_index` of `molecule_type`.
    pub fn atom_by_molecule(
        &self,
        molecule_type: &str,
        molecule_index: usize,
        name: &str,
    ) -> Option<&TopologyAtom> {
        let id = self
            .molecules
            .by_index
            .get(molecule_type)?
            .get(&molecule_index)?
            .get(name)?;
        self.atoms.get(id)
    }

    /// Returns the ids of every atom called `name` across all copies of
    /// `molecule_type`, in insertion order.
    pub fn atoms_named(&self, molecule_type: &str, name: &str) -> &[AtomId] {
        self.molecules
            .by_name
            .get(molecule_type)
            .and_then(|names| names.get(name))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the molecule indices present for `molecule_type`.
    pub fn molecule_indices(&self, molecule_type: &str) -> Vec<usize> {
        self.molecules
            .by_index
            .get(molecule_type)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Adds an atom to the table.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::DuplicateAtom`] if the id is already taken.
    pub fn insert_atom(&mut self, atom: TopologyAtom) -> Result<(), ConsistencyError> {
        let id = atom.id();
        if self.atoms.contains_key(&id) {
            return Err(ConsistencyError::DuplicateAtom(id));
        }
        self.molecules.insert(&atom);
        self.atoms.insert(id, atom);
        Ok(())
    }

    /// Adds a term to the base layer of the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::KeyArity`] if `key` does not have the
    /// length of the class, and [`ConsistencyError::DanglingReference`] if any
    /// id of `key` is not in the atom table.
    pub fn insert_term(
        &mut self,
        kind: TermKind,
        key: TermKey,
        params: TermParams,
    ) -> Result<(), ConsistencyError> {
        self.check_key(kind, &key)?;
        self.terms.insert_base(kind, key, params);
        Ok(())
    }

    /// Adds a term to the overlay layer of the store.
    ///
    /// # Errors
    ///
    /// Same as [`Topology::insert_term`].
    pub fn insert_overlay_term(
        &mut self,
        kind: TermKind,
        key: TermKey,
        params: TermParams,
    ) -> Result<(), ConsistencyError> {
        self.check_key(kind, &key)?;
        self.terms.insert_overlay(kind, key, params);
        Ok(())
    }

    /// Drops every term added to the overlay since load.
    pub fn clear_overlay(&mut self) {
        self.terms.clear_overlay();
    }

    fn check_key(&self, kind: TermKind, key: &TermKey) -> Result<(), ConsistencyError> {
        let expected = kind.class.arity();
        if key.len() != expected {
            return Err(ConsistencyError::KeyArity {
                kind,
                key: *key,
                expected,
            });
        }
        match key.ids().iter().find(|&&id| !self.atoms.contains_key(&id)) {
            Some(&id) => Err(ConsistencyError::DanglingReference {
                kind,
                key: *key,
                id,
            }),
            None => Ok(()),
        }
    }

    /// Verifies that every term in the store references existing atoms.
    pub fn check_integrity(&self) -> Result<(), ConsistencyError> {
        for kind in TermKind::all() {
            for key in self.terms.base(kind).keys().chain(self.terms.overlay(kind).keys()) {
                self.check_key(kind, key)?;
            }
        }
        Ok(())
    }

    pub(crate) fn atom_mut(&mut self, id: AtomId) -> Option<&mut TopologyAtom> {
        self.atoms.get_mut(&id)
    }

    /// Edits atom records in place and rebuilds the molecule index. `f` must
    /// not change atom ids.
    pub(crate) fn edit_atoms<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut TopologyAtom),
    {
        for atom in self.atoms.values_mut() {
            f(atom);
        }
        self.molecules = MoleculeIndex::rebuild(self.atoms.values());
    }

    /// Removes atoms together with every bonded term that references them.
    ///
    /// Every id is checked before anything is removed. When `renumber` is
    /// set, the remaining atoms are renumbered afterwards.
    ///
    /// # Return
    ///
    /// The removed atoms, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::UnknownAtom`] if any id is not present.
    pub fn remove_atoms(
        &mut self,
        ids: &HashSet<AtomId>,
        renumber: bool,
    ) -> Result<Vec<TopologyAtom>, ConsistencyError> {
        if let Some(&missing) = ids.iter().find(|&&id| !self.atoms.contains_key(&id)) {
            return Err(ConsistencyError::UnknownAtom(missing));
        }

        let mut sorted: Vec<AtomId> = ids.iter().copied().collect();
        sorted.sort_unstable();

        let mut removed = Vec::with_capacity(sorted.len());
        for id in sorted {
            if let Some(atom) = self.atoms.remove(&id) {
                self.molecules.remove(&atom);
                removed.push(atom);
            }
        }
        self.terms.remove_atoms(ids);
        debug!(
            "Removed {} atoms, {} remain",
            removed.len(),
            self.atoms.len()
        );

        if renumber {
            self.renumber()?;
        }
        Ok(removed)
    }

    /// Reassigns atom ids to `1..=N` in ascending order of the current ids.
    ///
    /// The atom table and every key in both store layers are rewritten in
    /// the same pass. If any key references an id that is not in the atom
    /// table, nothing is changed.
    ///
    /// # Return
    ///
    /// The old-id to new-id map.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::DanglingReference`] for a key holding an
    /// id outside the atom table.
    pub fn renumber(&mut self) -> Result<HashMap<AtomId, AtomId>, ConsistencyError> {
        let old_to_new: HashMap<AtomId, AtomId> = self
            .atoms
            .keys()
            .enumerate()
            .map(|(i, &old)| (old, i + 1))
            .collect();

        if let Err((key, id)) = self.terms.renumber(&old_to_new) {
            let kind = TermKind::all()
                .find(|&kind| {
                    self.terms.base(kind).contains_key(&key)
                        || self.terms.overlay(kind).contains_key(&key)
                })
                .unwrap_or(TermKind::new(TermClass::Bonds));
            return Err(ConsistencyError::DanglingReference { kind, key, id });
        }

        let atoms = std::mem::take(&mut self.atoms);
        self.atoms = atoms
            .into_values()
            .map(|mut atom| {
                let new_id = old_to_new[&atom.atom.id];
                atom.atom.id = new_id;
                (new_id, atom)
            })
            .collect();
        self.molecules = MoleculeIndex::rebuild(self.atoms.values());
        Ok(old_to_new)
    }

    /// Replicates the whole atom set and every term collection `count` times.
    ///
    /// The current atoms form one molecule of `S` atoms whose ids must be
    /// exactly `1..=S`. Copy `c` (starting at 2) receives ids `(c-1)*S + id`
    /// and molecule index `c`; every term key `(a, b, ..)` is duplicated as
    /// `(a + n*S, b + n*S, ..)` for `n` in `0..count` with the same
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::InvalidReplication`] for `count == 0` and
    /// [`ConsistencyError::NonContiguousIds`] when the ids are not `1..=S`.
    pub fn replicate(&mut self, count: usize) -> Result<(), ConsistencyError> {
        if count == 0 {
            return Err(ConsistencyError::InvalidReplication(count));
        }
        if count == 1 || self.atoms.is_empty() {
            return Ok(());
        }

        let per_molecule = self.atoms.len();
        let max_id = self.atoms.keys().next_back().copied().unwrap_or(0);
        let min_id = self.atoms.keys().next().copied().unwrap_or(0);
        if min_id != 1 || max_id != per_molecule {
            return Err(ConsistencyError::NonContiguousIds {
                expected: per_molecule,
                found: max_id,
            });
        }

        info!("Replicating topology to {} molecules", count);
        let template: Vec<TopologyAtom> = self.atoms.values().cloned().collect();
        for copy in 2..=count {
            for source in &template {
                let mut atom = source.clone();
                atom.atom.id = (copy - 1) * per_molecule + source.atom.id;
                atom.atom.molecule_index = copy;
                self.molecules.insert(&atom);
                self.atoms.insert(atom.atom.id, atom);
            }
        }
        self.terms.replicate(count, per_molecule);
        Ok(())
    }

    /// Overwrites positions from a coordinate snapshot keyed by the same ids.
    ///
    /// Atoms absent from `source` keep their positions.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::UnknownAtom`] if `source` holds an id that
    /// is not in this topology. Nothing is updated in that case.
    pub fn update_positions(&mut self, source: &CoordinateSet) -> Result<(), ConsistencyError> {
        if let Some(missing) = source.atom_ids().find(|id| !self.atoms.contains_key(id)) {
            return Err(ConsistencyError::UnknownAtom(missing));
        }
        for atom in source.atoms() {
            if let Some(target) = self.atoms.get_mut(&atom.id) {
                target.atom.position = atom.position;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use std::collections::BTreeSet;

    const BONDS: TermKind = TermKind::new(TermClass::Bonds);
    const ANGLES: TermKind = TermKind::new(TermClass::Angles);
    const CROSS_BONDS: TermKind = TermKind::cross(TermClass::Bonds);

    fn topo_atom(id: AtomId, name: &str, molecule_index: usize) -> TopologyAtom {
        TopologyAtom::new(Atom::new(id, name, "MOL", molecule_index), "C")
    }

    fn chain_topology(n: usize) -> Topology {
        let mut topology = Topology::new();
        for id in 1..=n {
            topology
                .insert_atom(topo_atom(id, &format!("C{}", id), 1))
                .unwrap();
        }
        for id in 1..n {
            topology
                .insert_term(BONDS, TermKey::pair(id, id + 1), vec!["1".into()])
                .unwrap();
        }
        topology
    }

    fn all_keys(topology: &Topology) -> BTreeSet<(TermKind, TermKey)> {
        TermKind::all()
            .flat_map(|kind| {
                let terms = topology.terms();
                terms
                    .base(kind)
                    .keys()
                    .chain(terms.overlay(kind).keys())
                    .map(move |k| (kind, *k))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn insert_atom_rejects_duplicates() {
        let mut topology = chain_topology(2);
        let err = topology.insert_atom(topo_atom(2, "X", 1)).unwrap_err();
        assert_eq!(err, ConsistencyError::DuplicateAtom(2));
    }

    #[test]
    fn insert_term_rejects_unknown_atoms() {
        let mut topology = chain_topology(2);
        let err = topology
            .insert_overlay_term(BONDS, TermKey::pair(2, 7), vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ConsistencyError::DanglingReference { id: 7, .. }
        ));
        assert_eq!(topology.terms().overlay_len(), 0);
    }

    #[test]
    fn insert_term_rejects_keys_of_the_wrong_length() {
        let mut topology = chain_topology(4);
        let key = TermKey::new(&[1, 2, 3, 4]).unwrap();

        let err = topology.insert_term(BONDS, key, vec![]).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::KeyArity {
                kind: BONDS,
                key,
                expected: 2,
            }
        );
        assert!(
            topology
                .insert_overlay_term(ANGLES, TermKey::pair(1, 2), vec![])
                .is_err()
        );
        assert_eq!(topology.terms().base(BONDS).len(), 3);
        assert_eq!(topology.terms().overlay_len(), 0);
    }

    #[test]
    fn removing_middle_atom_drops_its_bonds_then_renumbers() {
        let mut topology = Topology::new();
        for id in 1..=4 {
            topology
                .insert_atom(topo_atom(id, &format!("C{}", id), 1))
                .unwrap();
        }
        topology
            .insert_term(BONDS, TermKey::pair(1, 2), vec![])
            .unwrap();
        topology
            .insert_term(BONDS, TermKey::pair(2, 3), vec![])
            .unwrap();

        let removed = topology.remove_atoms(&HashSet::from([2]), false).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(topology.len(), 3);
        assert!(topology.terms().base(BONDS).is_empty());

        let map = topology.renumber().unwrap();
        assert_eq!(map, HashMap::from([(1, 1), (3, 2), (4, 3)]));
        let ids: Vec<AtomId> = topology.atom_ids().collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(topology.atom(2).unwrap().atom.name, "C3");
    }

    #[test]
    fn removal_leaves_no_reference_to_removed_ids_in_any_collection() {
        let mut topology = chain_topology(6);
        topology
            .insert_term(ANGLES, TermKey::new(&[1, 2, 3]).unwrap(), vec![])
            .unwrap();
        topology
            .insert_term(ANGLES, TermKey::new(&[4, 5, 6]).unwrap(), vec![])
            .unwrap();
        topology
            .insert_overlay_term(CROSS_BONDS, TermKey::pair(3, 6), vec![])
            .unwrap();
        topology
            .insert_overlay_term(BONDS, TermKey::pair(1, 6), vec![])
            .unwrap();

        let removed: HashSet<AtomId> = HashSet::from([3, 5]);
        let before = topology.len();
        topology.remove_atoms(&removed, false).unwrap();

        assert_eq!(topology.len(), before - removed.len());
        for (_, key) in all_keys(&topology) {
            assert!(!key.contains_any(&removed), "stale key {}", key);
        }
        assert!(topology.terms().overlay(BONDS).contains_key(&TermKey::pair(1, 6)));
        topology.check_integrity().unwrap();
    }

    #[test]
    fn remove_with_renumber_rewrites_overlay_keys() {
        let mut topology = chain_topology(4);
        topology
            .insert_overlay_term(CROSS_BONDS, TermKey::pair(1, 4), vec!["x".into()])
            .unwrap();

        topology.remove_atoms(&HashSet::from([2]), true).unwrap();

        assert!(
            topology
                .terms()
                .overlay(CROSS_BONDS)
                .contains_key(&TermKey::pair(1, 3))
        );
        assert!(topology.terms().base(BONDS).contains_key(&TermKey::pair(2, 3)));
        topology.check_integrity().unwrap();
    }

    #[test]
    fn remove_unknown_atom_changes_nothing() {
        let mut topology = chain_topology(3);
        let before = topology.clone();

        let err = topology
            .remove_atoms(&HashSet::from([1, 99]), true)
            .unwrap_err();

        assert_eq!(err, ConsistencyError::UnknownAtom(99));
        assert_eq!(topology, before);
    }

    #[test]
    fn renumber_is_identity_on_contiguous_topology() {
        let mut topology = chain_topology(5);
        topology
            .insert_overlay_term(ANGLES, TermKey::new(&[1, 2, 3]).unwrap(), vec![])
            .unwrap();
        let before = topology.clone();

        let map = topology.renumber().unwrap();

        assert!(map.iter().all(|(old, new)| old == new));
        assert_eq!(topology, before);
    }

    #[test]
    fn replicate_scales_atoms_and_bonds() {
        let mut topology = chain_topology(3);
        let k = topology.len();
        let m = topology.terms().base(BONDS).len();

        topology.replicate(4).unwrap();

        assert_eq!(topology.len(), k * 4);
        assert_eq!(topology.terms().base(BONDS).len(), m * 4);
        for key in topology.terms().base(BONDS).keys() {
            assert_eq!(key.ids()[1] - key.ids()[0], 1);
        }
        assert_eq!(topology.atom(7).unwrap().atom.molecule_index, 3);
        assert_eq!(topology.atom(7).unwrap().atom.name, "C1");
        assert_eq!(topology.molecule_indices("MOL"), vec![1, 2, 3, 4]);
        assert_eq!(topology.atoms_named("MOL", "C2"), &[2, 5, 8, 11]);
        topology.check_integrity().unwrap();
    }

    #[test]
    fn replicate_requires_contiguous_ids() {
        let mut topology = chain_topology(3);
        topology.remove_atoms(&HashSet::from([2]), false).unwrap();

        let err = topology.replicate(2).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::NonContiguousIds {
                expected: 2,
                found: 3
            }
        );
        assert_eq!(
            topology.replicate(0),
            Err(ConsistencyError::InvalidReplication(0))
        );
    }

    #[test]
    fn molecule_index_follows_removal() {
        let mut topology = chain_topology(3);
        assert_eq!(
            topology.atom_by_molecule("MOL", 1, "C2").map(|a| a.id()),
            Some(2)
        );

        topology.remove_atoms(&HashSet::from([2]), false).unwrap();

        assert!(topology.atom_by_molecule("MOL", 1, "C2").is_none());
        assert!(topology.atoms_named("MOL", "C2").is_empty());
    }

    #[test]
    fn update_positions_rejects_foreign_ids_and_keeps_missing_ones() {
        let mut topology = chain_topology(3);
        let mut coords = CoordinateSet::new("t");
        coords
            .insert(Atom::new(2, "C2", "MOL", 1).with_position(Point3::new(1.0, 1.0, 1.0)))
            .unwrap();

        topology.update_positions(&coords).unwrap();
        assert_eq!(
            topology.atom(2).unwrap().atom.position,
            Point3::new(1.0, 1.0, 1.0)
        );
        assert_eq!(topology.atom(1).unwrap().atom.position, Point3::origin());

        coords.insert(Atom::new(10, "X", "MOL", 1)).unwrap();
        assert_eq!(
            topology.update_positions(&coords),
            Err(ConsistencyError::UnknownAtom(10))
        );
    }

    #[test]
    fn reset_empties_everything() {
        let mut topology = chain_topology(3);
        topology.reset();
        assert!(topology.is_empty());
        assert!(topology.terms().is_empty());
        assert!(topology.atoms_named("MOL", "C1").is_empty());
    }
}
