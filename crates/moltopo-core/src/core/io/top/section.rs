use crate::core::models::terms::{TermClass, TermKind};
use phf::{Map, phf_map};
use std::fmt;

/// A bracketed section of a sectioned topology file, after name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Section {
    Defaults,
    AtomTypes,
    BondTypes,
    AngleTypes,
    DihedralTypes,
    MoleculeType,
    Atoms,
    Terms(TermKind),
    System,
    Molecules,
    Unknown(String),
}

const BONDS: TermKind = TermKind::new(TermClass::Bonds);
const ANGLES: TermKind = TermKind::new(TermClass::Angles);
const DIHEDRALS: TermKind = TermKind::new(TermClass::Dihedrals);
const IMPROPERS: TermKind = TermKind::new(TermClass::Impropers);
const PAIRS: TermKind = TermKind::new(TermClass::Pairs);
const CROSS_BONDS: TermKind = TermKind::cross(TermClass::Bonds);
const CROSS_ANGLES: TermKind = TermKind::cross(TermClass::Angles);
const CROSS_DIHEDRALS: TermKind = TermKind::cross(TermClass::Dihedrals);
const CROSS_IMPROPERS: TermKind = TermKind::cross(TermClass::Impropers);
const CROSS_PAIRS: TermKind = TermKind::cross(TermClass::Pairs);

#[rustfmt::skip]
static SECTION_NAMES: Map<&'static str, Section> = phf_map! {
    "defaults"      => Section::Defaults,
    "atomtypes"     => Section::AtomTypes,
    "bondtypes"     => Section::BondTypes,
    "angletypes"    => Section::AngleTypes,
    "dihedraltypes" => Section::DihedralTypes,
    "moleculetype"  => Section::MoleculeType,
    "atoms"         => Section::Atoms,
    "system"        => Section::System,
    "molecules"     => Section::Molecules,

    "bonds"              => Section::Terms(BONDS),
    "angles"             => Section::Terms(ANGLES),
    "dihedrals"          => Section::Terms(DIHEDRALS),
    "improper_dihedrals" => Section::Terms(IMPROPERS),
    "pairs"              => Section::Terms(PAIRS),

    "cross_bonds"              => Section::Terms(CROSS_BONDS),
    "cross_angles"             => Section::Terms(CROSS_ANGLES),
    "cross_dihedrals"          => Section::Terms(CROSS_DIHEDRALS),
    "cross_improper_dihedrals" => Section::Terms(CROSS_IMPROPERS),
    "cross_pairs"              => Section::Terms(CROSS_PAIRS),
};

impl Section {
    /// Resolves a raw header name given the section that precedes it.
    ///
    /// The format reuses `dihedrals` for impropers: a `dihedrals` header that
    /// directly follows a section resolved as proper dihedrals denotes
    /// impropers, and likewise for the cross-molecule variant.
    pub fn resolve(raw: &str, previous: Option<&Section>) -> Section {
        let name = raw.trim();
        match (SECTION_NAMES.get(name), previous) {
            (Some(Section::Terms(DIHEDRALS)), Some(Section::Terms(DIHEDRALS))) => {
                Section::Terms(IMPROPERS)
            }
            (Some(Section::Terms(CROSS_DIHEDRALS)), Some(Section::Terms(CROSS_DIHEDRALS))) => {
                Section::Terms(CROSS_IMPROPERS)
            }
            (Some(section), _) => section.clone(),
            (None, _) => Section::Unknown(name.to_string()),
        }
    }

    /// Parses a header line such as `[ atoms ]`, returning its raw name.
    pub fn header_name(line: &str) -> Option<&str> {
        let inner = line.trim().strip_prefix('[')?;
        let inner = inner.split(']').next().unwrap_or(inner);
        Some(inner.trim())
    }

    /// The header a writer emits for this section.
    ///
    /// Impropers are written under a repeated `dihedrals` header.
    pub fn header(&self) -> String {
        let name = match self {
            Section::Terms(kind) if kind.class == TermClass::Impropers => {
                if kind.cross {
                    "cross_dihedrals"
                } else {
                    "dihedrals"
                }
            }
            Section::Unknown(name) => name.as_str(),
            _ => self.name(),
        };
        format!("[ {} ]", name)
    }

    pub fn name(&self) -> &str {
        match self {
            Section::Defaults => "defaults",
            Section::AtomTypes => "atomtypes",
            Section::BondTypes => "bondtypes",
            Section::AngleTypes => "angletypes",
            Section::DihedralTypes => "dihedraltypes",
            Section::MoleculeType => "moleculetype",
            Section::Atoms => "atoms",
            Section::System => "system",
            Section::Molecules => "molecules",
            Section::Terms(kind) => match (kind.class, kind.cross) {
                (TermClass::Bonds, false) => "bonds",
                (TermClass::Angles, false) => "angles",
                (TermClass::Dihedrals, false) => "dihedrals",
                (TermClass::Impropers, false) => "improper_dihedrals",
                (TermClass::Pairs, false) => "pairs",
                (TermClass::Bonds, true) => "cross_bonds",
                (TermClass::Angles, true) => "cross_angles",
                (TermClass::Dihedrals, true) => "cross_dihedrals",
                (TermClass::Impropers, true) => "cross_improper_dihedrals",
                (TermClass::Pairs, true) => "cross_pairs",
            },
            Section::Unknown(name) => name.as_str(),
        }
    }

    pub fn is_cross(&self) -> bool {
        match self {
            Section::Terms(kind) => kind.cross,
            Section::Unknown(name) => name.starts_with("cross"),
            _ => false,
        }
    }

    /// Whether the writer regenerates this section's body from data.
    pub fn has_writer(&self) -> bool {
        !matches!(self, Section::Unknown(_))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
