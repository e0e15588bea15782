use super::atom::{Atom, AtomId};
use super::particles::{ParticleError, ParticleSource};
use super::topology::ConsistencyError;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A coordinate snapshot: a title, the atoms keyed by id and the box extents.
///
/// Besides the atom table, a set keeps two derived lookups: the fragment
/// table `(molecule_type, atom_name) -> id` (the last atom wins) and the
/// molecule table `(molecule_type, molecule_index) -> [id]`. Both are kept
/// in sync by every operation below.
///
/// Sets built with [`CoordinateSet::subset`] or [`CoordinateSet::capture`]
/// remember which source particle each local id came from, so positions can
/// later be refreshed from the same [`ParticleSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateSet {
    pub title: String,
    pub box_dims: Vector3<f64>,
    atoms: BTreeMap<AtomId, Atom>,
    fragments: HashMap<(String, String), AtomId>,
    molecules: BTreeMap<(String, usize), Vec<AtomId>>,
    id_map: BTreeMap<AtomId, AtomId>,
    modified: bool,
}

impl CoordinateSet {
    /// Creates an empty set with the given title and a zero box.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(&id)
    }

    /// Returns an iterator over all atoms in ascending id order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    pub fn atom_ids(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atoms.keys().copied()
    }

    /// Looks an atom up by molecule type and atom name.
    pub fn fragment(&self, molecule_type: &str, name: &str) -> Option<&Atom> {
        self.fragments
            .get(&(molecule_type.to_string(), name.to_string()))
            .and_then(|id| self.atoms.get(id))
    }

    /// Returns the ids of one molecule copy, in insertion order.
    pub fn molecule(&self, molecule_type: &str, molecule_index: usize) -> &[AtomId] {
        self.molecules
            .get(&(molecule_type.to_string(), molecule_index))
            .map_or(&[], Vec::as_slice)
    }

    /// The source particle id each local id was taken from, if any.
    pub fn id_map(&self) -> &BTreeMap<AtomId, AtomId> {
        &self.id_map
    }

    /// The particle id that local atom `id` maps to in its source.
    pub fn source_id(&self, id: AtomId) -> AtomId {
        self.id_map.get(&id).copied().unwrap_or(id)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Adds an atom to the set.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::DuplicateAtom`] if the id is already used.
    pub fn insert(&mut self, atom: Atom) -> Result<(), ConsistencyError> {
        if self.atoms.contains_key(&atom.id) {
            return Err(ConsistencyError::DuplicateAtom(atom.id));
        }
        self.index(&atom);
        self.atoms.insert(atom.id, atom);
        self.modified = true;
        Ok(())
    }

    fn index(&mut self, atom: &Atom) {
        self.fragments
            .insert((atom.molecule_type.clone(), atom.name.clone()), atom.id);
        self.molecules
            .entry((atom.molecule_type.clone(), atom.molecule_index))
            .or_default()
            .push(atom.id);
    }

    fn reindex(&mut self) {
        self.fragments.clear();
        self.molecules.clear();
        let atoms: Vec<Atom> = self.atoms.values().cloned().collect();
        for atom in &atoms {
            self.index(atom);
        }
    }

    /// Moves a single atom.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::UnknownAtom`] if `id` is not in the set.
    pub fn set_position(&mut self, id: AtomId, position: Point3<f64>) -> Result<(), ConsistencyError> {
        let atom = self
            .atoms
            .get_mut(&id)
            .ok_or(ConsistencyError::UnknownAtom(id))?;
        atom.position = position;
        self.modified = true;
        Ok(())
    }

    /// Removes atoms by id, optionally renumbering the rest to `1..N`.
    ///
    /// All ids are checked before anything is removed.
    pub fn remove_atoms(
        &mut self,
        ids: &HashSet<AtomId>,
        renumber: bool,
    ) -> Result<Vec<Atom>, ConsistencyError> {
        if let Some(&missing) = ids.iter().find(|&&id| !self.atoms.contains_key(&id)) {
            return Err(ConsistencyError::UnknownAtom(missing));
        }
        let mut sorted: Vec<AtomId> = ids.iter().copied().collect();
        sorted.sort_unstable();

        let removed: Vec<Atom> = sorted
            .iter()
            .filter_map(|id| {
                self.id_map.remove(id);
                self.atoms.remove(id)
            })
            .collect();
        self.reindex();
        self.modified = true;

        if renumber {
            self.renumber();
        }
        Ok(removed)
    }

    /// Reassigns ids to `1..=N` in ascending order of the current ids and
    /// returns the old-to-new map. The source id map follows the atoms.
    pub fn renumber(&mut self) -> HashMap<AtomId, AtomId> {
        let old_to_new: HashMap<AtomId, AtomId> = self
            .atoms
            .keys()
            .enumerate()
            .map(|(i, &old)| (old, i + 1))
            .collect();

        let atoms = std::mem::take(&mut self.atoms);
        self.atoms = atoms
            .into_values()
            .map(|atom| {
                let new_id = old_to_new[&atom.id];
                (new_id, atom.with_id(new_id))
            })
            .collect();

        let id_map = std::mem::take(&mut self.id_map);
        self.id_map = id_map
            .into_iter()
            .filter_map(|(local, source)| old_to_new.get(&local).map(|&new| (new, source)))
            .collect();

        self.reindex();
        self.modified = true;
        old_to_new
    }

    /// Builds a new set holding only `ids`, each remembering its id here
    /// as its source particle id.
    ///
    /// With `renumber`, the subset's ids are reassigned to `1..=N`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::UnknownAtom`] for an id not in this set.
    pub fn subset(&self, ids: &[AtomId], renumber: bool) -> Result<Self, ConsistencyError> {
        let mut out = Self::new(&self.title);
        out.box_dims = self.box_dims;
        for &id in ids {
            let atom = self.atoms.get(&id).ok_or(ConsistencyError::UnknownAtom(id))?;
            out.insert(atom.clone())?;
            out.id_map.insert(id, self.source_id(id));
        }
        if renumber {
            out.renumber();
        }
        Ok(out)
    }

    /// Refreshes every position from a live particle source.
    ///
    /// Each local atom is looked up under its source id. With `unfolded`,
    /// positions are moved out of the primary cell by `box * image`.
    /// Nothing is changed if any particle is missing.
    pub fn update_positions<S>(&mut self, source: &S, unfolded: bool) -> Result<(), ParticleError>
    where
        S: ParticleSource + ?Sized,
    {
        let mut updates = Vec::with_capacity(self.atoms.len());
        for &id in self.atoms.keys() {
            let source_id = self.source_id(id);
            let state = source
                .particle(source_id)
                .ok_or(ParticleError::MissingParticle(source_id))?;
            let position = if unfolded {
                state.unfolded(&self.box_dims)
            } else {
                state.position
            };
            updates.push((id, position));
        }
        for (id, position) in updates {
            if let Some(atom) = self.atoms.get_mut(&id) {
                atom.position = position;
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Builds a set from the current state of live particles.
    ///
    /// `records` supply ids, names and molecule membership; positions come
    /// from `source`. The records' ids become the source ids of the set.
    pub fn capture<S, I>(
        title: &str,
        source: &S,
        records: I,
        box_dims: Vector3<f64>,
        unfolded: bool,
    ) -> Result<Self, ParticleError>
    where
        S: ParticleSource + ?Sized,
        I: IntoIterator<Item = Atom>,
    {
        let mut out = Self::new(title);
        out.box_dims = box_dims;
        for record in records {
            if out.atoms.contains_key(&record.id) {
                return Err(ParticleError::DuplicateRecord(record.id));
            }
            let state = source
                .particle(record.id)
                .ok_or(ParticleError::MissingParticle(record.id))?;
            let position = if unfolded {
                state.unfolded(&box_dims)
            } else {
                state.position
            };
            out.id_map.insert(record.id, record.id);
            out.index(&record);
            out.atoms.insert(record.id, record.with_position(position));
        }
        out.modified = true;
        Ok(out)
    }

    /// Overwrites positions from another set keyed by the same ids.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::UnknownAtom`] if `other` holds an id that
    /// is not in this set. Nothing is changed in that case.
    pub fn update_from(&mut self, other: &CoordinateSet) -> Result<(), ConsistencyError> {
        if let Some(missing) = other.atom_ids().find(|id| !self.atoms.contains_key(id)) {
            return Err(ConsistencyError::UnknownAtom(missing));
        }
        for atom in other.atoms() {
            if let Some(target) = self.atoms.get_mut(&atom.id) {
                target.position = atom.position;
            }
        }
        self.modified = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particles::ParticleState;

    fn water(n: usize) -> CoordinateSet {
        let mut set = CoordinateSet::new("water");
        set.box_dims = Vector3::new(3.0, 3.0, 3.0);
        let mut id = 1;
        for mol in 1..=n {
            for name in ["OW", "HW1", "HW2"] {
                let atom = Atom::new(id, name, "SOL", mol)
                    .with_position(Point3::new(id as f64 * 0.1, 0.0, 0.0));
                set.insert(atom).unwrap();
                id += 1;
            }
        }
        set
    }

    #[test]
    fn insert_rejects_duplicates_and_indexes_fragments() {
        let mut set = water(2);
        assert_eq!(
            set.insert(Atom::new(1, "X", "SOL", 1)),
            Err(ConsistencyError::DuplicateAtom(1))
        );
        assert_eq!(set.fragment("SOL", "OW").map(|a| a.id), Some(4));
        assert_eq!(set.molecule("SOL", 2), &[4, 5, 6]);
        assert!(set.is_modified());
    }

    #[test]
    fn remove_with_renumber_compacts_ids() {
        let mut set = water(2);
        let removed = set.remove_atoms(&HashSet::from([1, 2, 3]), true).unwrap();

        assert_eq!(removed.len(), 3);
        assert_eq!(set.atom_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(set.atom(1).unwrap().name, "OW");
        assert_eq!(set.atom(1).unwrap().molecule_index, 2);
        assert_eq!(set.molecule("SOL", 1), &[] as &[AtomId]);
        assert_eq!(set.molecule("SOL", 2), &[1, 2, 3]);
    }

    #[test]
    fn remove_unknown_id_is_rejected_before_mutation() {
        let mut set = water(1);
        let before = set.clone();

        assert_eq!(
            set.remove_atoms(&HashSet::from([2, 9]), false),
            Err(ConsistencyError::UnknownAtom(9))
        );
        assert_eq!(set, before);
    }

    #[test]
    fn subset_remembers_source_ids_through_renumbering() {
        let set = water(3);
        let sub = set.subset(&[4, 5, 6], true).unwrap();

        assert_eq!(sub.len(), 3);
        assert_eq!(sub.source_id(1), 4);
        assert_eq!(sub.source_id(3), 6);
        assert_eq!(sub.box_dims, set.box_dims);
        assert!(set.subset(&[42], false).is_err());
    }

    #[test]
    fn update_positions_reads_source_ids_and_unfolds() {
        let set = water(2);
        let mut sub = set.subset(&[4], true).unwrap();
        let mut source = HashMap::new();
        source.insert(
            4,
            ParticleState {
                position: Point3::new(1.0, 1.0, 1.0),
                image: Vector3::new(1, 0, 0),
                velocity: Vector3::zeros(),
            },
        );

        sub.update_positions(&source, false).unwrap();
        assert!((sub.atom(1).unwrap().position.x - 1.0).abs() < 1e-9);

        sub.update_positions(&source, true).unwrap();
        assert!((sub.atom(1).unwrap().position.x - 4.0).abs() < 1e-9);

        source.clear();
        assert_eq!(
            sub.update_positions(&source, false),
            Err(ParticleError::MissingParticle(4))
        );
    }

    #[test]
    fn capture_builds_set_from_live_particles() {
        let mut source = BTreeMap::new();
        source.insert(7, ParticleState::at(Point3::new(0.1, 0.2, 0.3)));
        let records = vec![Atom::new(7, "C1", "LIG", 1)];

        let set = CoordinateSet::capture("live", &source, records, Vector3::zeros(), false)
            .unwrap();

        assert_eq!(set.atom(7).unwrap().position, Point3::new(0.1, 0.2, 0.3));
        assert_eq!(set.source_id(7), 7);

        let missing = vec![Atom::new(8, "C2", "LIG", 1)];
        assert!(CoordinateSet::capture("live", &source, missing, Vector3::zeros(), false).is_err());
    }

    #[test]
    fn capture_rejects_repeated_record_ids() {
        let mut source = BTreeMap::new();
        source.insert(7, ParticleState::at(Point3::new(0.1, 0.2, 0.3)));
        let records = vec![Atom::new(7, "C1", "LIG", 1), Atom::new(7, "C2", "LIG", 1)];

        let result = CoordinateSet::capture("live", &source, records, Vector3::zeros(), false);

        assert_eq!(result.unwrap_err(), ParticleError::DuplicateRecord(7));
    }

    #[test]
    fn update_from_copies_positions_of_matching_ids() {
        let mut target = water(1);
        let mut other = CoordinateSet::new("other");
        other
            .insert(Atom::new(2, "HW1", "SOL", 1).with_position(Point3::new(9.0, 9.0, 9.0)))
            .unwrap();

        target.update_from(&other).unwrap();
        assert_eq!(target.atom(2).unwrap().position, Point3::new(9.0, 9.0, 9.0));

        other.insert(Atom::new(99, "X", "SOL", 1)).unwrap();
        assert_eq!(
            target.update_from(&other),
            Err(ConsistencyError::UnknownAtom(99))
        );
    }
}
