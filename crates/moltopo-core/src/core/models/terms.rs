use super::atom::AtomId;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Opaque parameter payload of a bonded term, passed through verbatim.
pub type TermParams = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermClass {
    Bonds,
    Angles,
    Dihedrals,
    Impropers,
    Pairs,
}

impl TermClass {
    pub const ALL: [TermClass; 5] = [
        TermClass::Bonds,
        TermClass::Angles,
        TermClass::Dihedrals,
        TermClass::Impropers,
        TermClass::Pairs,
    ];

    /// Number of atom ids in a key of this class.
    pub fn arity(self) -> usize {
        match self {
            TermClass::Bonds | TermClass::Pairs => 2,
            TermClass::Angles => 3,
            TermClass::Dihedrals | TermClass::Impropers => 4,
        }
    }

    /// Whether a key and its reverse denote the same physical term.
    ///
    /// Bonds, pairs, angles and proper dihedrals are symmetric under reversal.
    /// Impropers are not: their atom order encodes which atom is central.
    pub fn is_reversible(self) -> bool {
        !matches!(self, TermClass::Impropers)
    }
}

impl fmt::Display for TermClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TermClass::Bonds => "bonds",
                TermClass::Angles => "angles",
                TermClass::Dihedrals => "dihedrals",
                TermClass::Impropers => "impropers",
                TermClass::Pairs => "pairs",
            }
        )
    }
}

/// One of the ten bonded-term collections: a class plus whether the terms
/// cross molecule boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermKind {
    pub class: TermClass,
    pub cross: bool,
}

impl TermKind {
    pub const COUNT: usize = 10;

    pub const fn new(class: TermClass) -> Self {
        Self {
            class,
            cross: false,
        }
    }

    pub const fn cross(class: TermClass) -> Self {
        Self { class, cross: true }
    }

    pub fn all() -> impl Iterator<Item = TermKind> {
        TermClass::ALL
            .into_iter()
            .flat_map(|class| [TermKind::new(class), TermKind::cross(class)])
    }

    pub(crate) fn slot(self) -> usize {
        self.class as usize * 2 + usize::from(self.cross)
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cross {
            write!(f, "cross {}", self.class)
        } else {
            write!(f, "{}", self.class)
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("A bonded term key must hold 2 to 4 atom ids, got {0}")]
pub struct InvalidKeyLength(pub usize);

/// An ordered tuple of 2, 3 or 4 atom ids identifying a bonded term.
///
/// Keys compare by length first and then lexicographically by ids, so keys
/// of one class (which all share a length) sort in plain tuple order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermKey {
    len: u8,
    ids: [AtomId; 4],
}

impl TermKey {
    pub fn new(ids: &[AtomId]) -> Result<Self, InvalidKeyLength> {
        if !(2..=4).contains(&ids.len()) {
            return Err(InvalidKeyLength(ids.len()));
        }
        let mut buf = [0; 4];
        buf[..ids.len()].copy_from_slice(ids);
        Ok(Self {
            len: ids.len() as u8,
            ids: buf,
        })
    }

    pub fn pair(a: AtomId, b: AtomId) -> Self {
        Self {
            len: 2,
            ids: [a, b, 0, 0],
        }
    }

    pub fn ids(&self) -> &[AtomId] {
        &self.ids[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reversed(&self) -> Self {
        let mut out = *self;
        out.ids[..self.len as usize].reverse();
        out
    }

    /// The same key with its ids in ascending order.
    pub fn sorted(&self) -> Self {
        let mut out = *self;
        out.ids[..self.len as usize].sort_unstable();
        out
    }

    pub fn shifted(&self, offset: AtomId) -> Self {
        let mut out = *self;
        for id in &mut out.ids[..self.len as usize] {
            *id += offset;
        }
        out
    }

    pub fn contains(&self, id: AtomId) -> bool {
        self.ids().contains(&id)
    }

    pub fn contains_any(&self, ids: &HashSet<AtomId>) -> bool {
        self.ids().iter().any(|id| ids.contains(id))
    }

    /// Maps every component through `f`, returning the first component for
    /// which `f` yields nothing.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self, AtomId>
    where
        F: FnMut(AtomId) -> Option<AtomId>,
    {
        let mut out = *self;
        for id in &mut out.ids[..self.len as usize] {
            *id = f(*id).ok_or(*id)?;
        }
        Ok(out)
    }
}

impl fmt::Display for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ids().iter().map(|id| id.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
