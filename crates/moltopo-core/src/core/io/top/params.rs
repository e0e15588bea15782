use std::collections::HashMap;

/// One row of a `*types` section: the atom type names it applies to, the
/// optional function type and the remaining parameters verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub types: Vec<String>,
    pub func: Option<i64>,
    pub params: Vec<String>,
}

impl TypeEntry {
    pub fn to_line(&self) -> String {
        let mut fields: Vec<String> = self.types.clone();
        if let Some(func) = self.func {
            fields.push(func.to_string());
        }
        fields.extend(self.params.iter().cloned());
        fields.join(" ")
    }
}

/// A parameter table keyed by a tuple of atom type names.
///
/// Entries keep file order. Lookup ignores direction: `(a, b, c)` and
/// `(c, b, a)` find the same entry. Redefining a key replaces the entry
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTable {
    entries: Vec<TypeEntry>,
    index: HashMap<Vec<String>, usize>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    pub fn insert(&mut self, entry: TypeEntry) {
        let forward = entry.types.clone();
        let mut reverse = forward.clone();
        reverse.reverse();

        match self.index.get(&forward) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                let slot = self.entries.len();
                self.entries.push(entry);
                self.index.insert(reverse, slot);
                self.index.insert(forward, slot);
            }
        }
    }

    pub fn get(&self, types: &[&str]) -> Option<&TypeEntry> {
        let key: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        self.index.get(&key).map(|&slot| &self.entries[slot])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(types: &[&str], func: Option<i64>, params: &[&str]) -> TypeEntry {
        TypeEntry {
            types: types.iter().map(|s| s.to_string()).collect(),
            func,
            params: params.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn lookup_is_direction_insensitive() {
        let mut table = TypeTable::new();
        table.insert(entry(&["CA", "CB", "OH"], Some(1), &["109.5", "400.0"]));

        assert_eq!(table.get(&["OH", "CB", "CA"]).unwrap().func, Some(1));
        assert!(table.get(&["CA", "OH", "CB"]).is_none());
    }

    #[test]
    fn redefinition_replaces_in_place() {
        let mut table = TypeTable::new();
        table.insert(entry(&["C", "O"], Some(1), &["0.12"]));
        table.insert(entry(&["N", "H"], Some(1), &["0.10"]));
        table.insert(entry(&["C", "O"], Some(1), &["0.13"]));

        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].params, vec!["0.13"]);
    }

    #[test]
    fn to_line_omits_missing_func() {
        assert_eq!(
            entry(&["OW"], None, &["15.9994", "-0.82"]).to_line(),
            "OW 15.9994 -0.82"
        );
        assert_eq!(entry(&["C", "O"], Some(1), &["0.12"]).to_line(), "C O 1 0.12");
    }
}
