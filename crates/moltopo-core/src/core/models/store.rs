use super::atom::AtomId;
use super::terms::{TermKey, TermKind, TermParams};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A keyed collection of bonded terms of one kind.
pub type TermTable = BTreeMap<TermKey, TermParams>;

#[derive(Debug, Clone, Default, PartialEq)]
struct TermLayer {
    tables: [TermTable; TermKind::COUNT],
}

impl TermLayer {
    fn table(&self, kind: TermKind) -> &TermTable {
        &self.tables[kind.slot()]
    }

    fn table_mut(&mut self, kind: TermKind) -> &mut TermTable {
        &mut self.tables[kind.slot()]
    }

    fn keys(&self) -> impl Iterator<Item = &TermKey> {
        self.tables.iter().flat_map(|table| table.keys())
    }

    fn retain_without(&mut self, removed: &HashSet<AtomId>) {
        for table in &mut self.tables {
            table.retain(|key, _| !key.contains_any(removed));
        }
    }

    fn renumbered(&self, map: &HashMap<AtomId, AtomId>) -> Result<Self, (TermKey, AtomId)> {
        let mut out = Self::default();
        for (slot, table) in self.tables.iter().enumerate() {
            for (key, params) in table {
                let new_key = key
                    .try_map(|id| map.get(&id).copied())
                    .map_err(|missing| (*key, missing))?;
                out.tables[slot].insert(new_key, params.clone());
            }
        }
        Ok(out)
    }

    fn replicate(&mut self, count: usize, stride: AtomId) {
        for table in &mut self.tables {
            let original = std::mem::take(table);
            for n in 0..count {
                for (key, params) in &original {
                    table.insert(key.shifted(n * stride), params.clone());
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.tables.iter().map(BTreeMap::len).sum()
    }
}

/// Holds every bonded-term collection of a topology: a base layer filled by
/// readers and an overlay layer for terms added after load.
///
/// The two layers are never merged eagerly. Writers ask for a merged view
/// with [`BondedTermStore::merged`]; the overlay can be dropped at any time
/// with [`BondedTermStore::clear_overlay`]. Mutations are crate-private so
/// that only [`Topology`](super::topology::Topology) can change the store,
/// keeping every referenced id backed by an atom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondedTermStore {
    base: TermLayer,
    overlay: TermLayer,
}

impl BondedTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the base collection of the given kind.
    pub fn base(&self, kind: TermKind) -> &TermTable {
        self.base.table(kind)
    }

    /// Returns the overlay collection of the given kind.
    pub fn overlay(&self, kind: TermKind) -> &TermTable {
        self.overlay.table(kind)
    }

    /// Looks a term up in the base layer first and then in the overlay.
    pub fn get(&self, kind: TermKind, key: &TermKey) -> Option<&TermParams> {
        self.base
            .table(kind)
            .get(key)
            .or_else(|| self.overlay.table(kind).get(key))
    }

    /// Whether the base layer already holds `key`, or its reverse for
    /// classes that are symmetric under reversal.
    pub fn in_base(&self, kind: TermKind, key: &TermKey) -> bool {
        let base = self.base.table(kind);
        base.contains_key(key) || (kind.class.is_reversible() && base.contains_key(&key.reversed()))
    }

    /// Builds the write-time view of one collection.
    ///
    /// Base entries come first, then overlay entries not present in the
    /// base, each group sorted by key. For reversible classes a key whose
    /// reverse was already emitted is skipped, so an undirected term is
    /// written once.
    pub fn merged(&self, kind: TermKind) -> Vec<(TermKey, &TermParams)> {
        let reversible = kind.class.is_reversible();
        let mut emitted: BTreeSet<TermKey> = BTreeSet::new();
        let mut out = Vec::new();

        let base = self.base.table(kind).iter();
        let extra = self
            .overlay
            .table(kind)
            .iter()
            .filter(|(key, _)| !self.in_base(kind, key));

        for (key, params) in base.chain(extra) {
            if emitted.contains(key) || (reversible && emitted.contains(&key.reversed())) {
                continue;
            }
            emitted.insert(*key);
            out.push((*key, params));
        }
        out
    }

    /// Total number of terms of a kind across both layers, counting a term
    /// present in both only once.
    pub fn count(&self, kind: TermKind) -> usize {
        self.merged(kind).len()
    }

    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_len() == 0 && self.overlay_len() == 0
    }

    pub fn has_terms(&self, kind: TermKind) -> bool {
        !self.base.table(kind).is_empty() || !self.overlay.table(kind).is_empty()
    }

    /// Every atom id referenced by any key in either layer.
    pub fn referenced_ids(&self) -> BTreeSet<AtomId> {
        self.base
            .keys()
            .chain(self.overlay.keys())
            .flat_map(|key| key.ids().iter().copied())
            .collect()
    }

    pub(crate) fn insert_base(&mut self, kind: TermKind, key: TermKey, params: TermParams) {
        self.base.table_mut(kind).insert(key, params);
    }

    pub(crate) fn insert_overlay(&mut self, kind: TermKind, key: TermKey, params: TermParams) {
        self.overlay.table_mut(kind).insert(key, params);
    }

    pub(crate) fn clear_overlay(&mut self) {
        self.overlay = TermLayer::default();
    }

    pub(crate) fn clear(&mut self) {
        self.base = TermLayer::default();
        self.overlay = TermLayer::default();
    }

    pub(crate) fn remove_atoms(&mut self, removed: &HashSet<AtomId>) {
        self.base.retain_without(removed);
        self.overlay.retain_without(removed);
    }

    /// Rewrites every key of both layers through `map`.
    ///
    /// Both layers are rebuilt before either is swapped in, so on error the
    /// store is left untouched. The error carries the offending key and the
    /// first component missing from the map.
    pub(crate) fn renumber(
        &mut self,
        map: &HashMap<AtomId, AtomId>,
    ) -> Result<(), (TermKey, AtomId)> {
        let base = self.base.renumbered(map)?;
        let overlay = self.overlay.renumbered(map)?;
        self.base = base;
        self.overlay = overlay;
        Ok(())
    }

    pub(crate) fn replicate(&mut self, count: usize, stride: AtomId) {
        self.base.replicate(count, stride);
        self.overlay.replicate(count, stride);
    }
}
