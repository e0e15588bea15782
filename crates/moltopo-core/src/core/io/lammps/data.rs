use super::{LammpsError, LammpsReader};
use crate::core::models::atom::{Atom, AtomId, TopologyAtom};
use crate::core::models::topology::ConsistencyError;
use crate::core::models::terms::{TermClass, TermKey, TermKind};
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

const CHARGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DataSection {
    Header,
    Atoms,
    Velocities,
    Masses,
    Terms(TermClass),
    Coeffs(String),
    Skipped,
}

impl DataSection {
    fn from_heading(heading: &str) -> Option<Self> {
        match heading {
            "Atoms" => Some(Self::Atoms),
            "Velocities" => Some(Self::Velocities),
            "Masses" => Some(Self::Masses),
            "Bonds" => Some(Self::Terms(TermClass::Bonds)),
            "Angles" => Some(Self::Terms(TermClass::Angles)),
            "Dihedrals" => Some(Self::Terms(TermClass::Dihedrals)),
            "Impropers" => Some(Self::Terms(TermClass::Impropers)),
            _ if heading.contains("Coeff") => heading
                .split_whitespace()
                .next()
                .map(|family| Self::Coeffs(family.to_lowercase())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Update,
}

/// Header counter names for a term class: the item count and the type family.
fn counter_names(class: TermClass) -> (&'static str, &'static str) {
    match class {
        TermClass::Bonds => ("bonds", "bond"),
        TermClass::Angles => ("angles", "angle"),
        TermClass::Dihedrals => ("dihedrals", "dihedral"),
        TermClass::Impropers => ("impropers", "improper"),
        TermClass::Pairs => ("pairs", "pair"),
    }
}

struct DataLine<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

impl DataLine<'_> {
    fn error(&self, message: impl Into<String>) -> LammpsError {
        LammpsError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn require(&self, count: usize, what: &str) -> Result<(), LammpsError> {
        if self.fields.len() < count {
            return Err(self.error(format!(
                "{} needs at least {} fields, found {}",
                what,
                count,
                self.fields.len()
            )));
        }
        Ok(())
    }

    fn parse<T: FromStr>(&self, index: usize, what: &str) -> Result<T, LammpsError> {
        let raw = self
            .fields
            .get(index)
            .ok_or_else(|| self.error(format!("missing {}", what)))?;
        raw.parse()
            .map_err(|_| self.error(format!("invalid {} '{}'", what, raw)))
    }
}

/// Fields parsed from an `Atoms` record that an update merges into an
/// existing atom.
struct AtomUpdate {
    atom_type: u32,
    molecule_index: usize,
    charge: f64,
    position: Point3<f64>,
    image: Vector3<i32>,
}

impl LammpsReader {
    /// Reads a data file, adding its atoms, velocities and bonded terms.
    ///
    /// Atoms already present are not replaced: re-reading a file fails with
    /// [`LammpsError::DuplicateAtom`] unless [`LammpsReader::reset`] is
    /// called first.
    pub fn read_data(&mut self, path: &Path) -> Result<(), LammpsError> {
        info!("Reading LAMMPS data file: {}", path.display());
        self.parse_data(path, Mode::Full)?;
        info!(
            "Read {} atoms and {} bonded terms",
            self.topology.len(),
            self.topology.terms().base_len()
        );
        Ok(())
    }

    /// Refreshes existing atoms from the `Atoms` section of another data
    /// file. Position, type, molecule index, charge and image are merged;
    /// bonded terms and names are left alone.
    ///
    /// Every record is validated before any atom changes.
    pub fn update_atoms(&mut self, path: &Path) -> Result<(), LammpsError> {
        info!("Updating atoms from LAMMPS data file: {}", path.display());
        self.parse_data(path, Mode::Update)
    }

    fn parse_data(&mut self, path: &Path, mode: Mode) -> Result<(), LammpsError> {
        let io_error = |source: std::io::Error| LammpsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let reader = BufReader::new(file);

        let mut section = DataSection::Header;
        let mut updates: BTreeMap<AtomId, AtomUpdate> = BTreeMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(io_error)?;
            // The first line of a data file is always a free-form title.
            if index == 0 {
                continue;
            }
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            if content.starts_with(|c: char| c.is_ascii_alphabetic()) {
                section = match DataSection::from_heading(content) {
                    Some(next) => {
                        debug!("Entering section '{}' on line {}", content, index + 1);
                        next
                    }
                    None => {
                        warn!("Skipping unknown section '{}' on line {}", content, index + 1);
                        DataSection::Skipped
                    }
                };
                continue;
            }

            let record = DataLine {
                line: index + 1,
                fields: content.split_whitespace().collect(),
            };
            match (&section, mode) {
                (DataSection::Header, _) => self.read_header(&record)?,
                (DataSection::Atoms, _) => self.read_atom(&record, mode, &mut updates)?,
                (DataSection::Masses, Mode::Full) => self.read_mass(&record)?,
                (DataSection::Velocities, Mode::Full) => self.read_velocity(&record)?,
                (DataSection::Terms(class), Mode::Full) => self.read_term(&record, *class)?,
                (DataSection::Coeffs(family), Mode::Full) => self.read_coeff(&record, family)?,
                _ => {}
            }
        }

        if !updates.is_empty() {
            debug!("Merging {} updated atom records", updates.len());
            let masses = &self.masses;
            self.topology.edit_atoms(|atom| {
                if let Some(update) = updates.get(&atom.id()) {
                    atom.mass = masses.get(&update.atom_type).copied().or(atom.mass);
                    atom.atom_type = update.atom_type.to_string();
                    atom.atom.molecule_index = update.molecule_index;
                    atom.atom.position = update.position;
                    atom.charge = Some(update.charge);
                }
            });
            for (id, update) in updates {
                self.images.insert(id, update.image);
            }
        }
        Ok(())
    }

    fn read_header(&mut self, record: &DataLine) -> Result<(), LammpsError> {
        match record.fields.as_slice() {
            [_, _, lo_name, hi_name] if lo_name.ends_with("lo") && hi_name.ends_with("hi") => {
                let axis = match lo_name.chars().next() {
                    Some('x') => 0,
                    Some('y') => 1,
                    Some('z') => 2,
                    _ => return Err(record.error(format!("unknown box axis '{}'", lo_name))),
                };
                let lo: f64 = record.parse(0, "box lower bound")?;
                let hi: f64 = record.parse(1, "box upper bound")?;
                self.box_dims[axis] = (hi - lo) * self.distance_scale_factor;
                self.box_origin[axis] = lo * self.distance_scale_factor;
            }
            [_, family, "types"] => {
                let count: usize = record.parse(0, "type count")?;
                self.type_counts.insert(family.to_string(), count);
            }
            [_, what] if matches!(*what, "atoms" | "bonds" | "angles" | "dihedrals" | "impropers") => {
                let count: usize = record.parse(0, "item count")?;
                self.item_counts.insert(what.to_string(), count);
            }
            _ => debug!("Ignoring header line {}", record.line),
        }
        Ok(())
    }

    fn check_count(&self, record: &DataLine, what: &str, id: usize) -> Result<(), LammpsError> {
        let declared = *self
            .item_counts
            .get(what)
            .ok_or_else(|| LammpsError::MissingCount {
                line: record.line,
                what: what.to_string(),
            })?;
        if id > declared {
            return Err(LammpsError::CountOverflow {
                line: record.line,
                what: what.to_string(),
                id,
                declared,
            });
        }
        Ok(())
    }

    fn check_type(&self, record: &DataLine, family: &str, found: u32) -> Result<(), LammpsError> {
        let declared = *self
            .type_counts
            .get(family)
            .ok_or_else(|| LammpsError::MissingCount {
                line: record.line,
                what: format!("{} types", family),
            })?;
        if found as usize > declared {
            return Err(LammpsError::TypeOverflow {
                line: record.line,
                what: family.to_string(),
                found,
                declared,
            });
        }
        Ok(())
    }

    fn check_charge(&mut self, record: &DataLine, atom_type: u32, charge: f64) -> Result<(), LammpsError> {
        match self.type_charges.get(&atom_type) {
            Some(&expected) if (expected - charge).abs() > CHARGE_TOLERANCE => {
                Err(LammpsError::ChargeMismatch {
                    line: record.line,
                    atom_type,
                    expected,
                    found: charge,
                })
            }
            Some(_) => Ok(()),
            None => {
                self.type_charges.insert(atom_type, charge);
                Ok(())
            }
        }
    }

    fn read_atom(
        &mut self,
        record: &DataLine,
        mode: Mode,
        updates: &mut BTreeMap<AtomId, AtomUpdate>,
    ) -> Result<(), LammpsError> {
        record.require(7, "an atom record")?;
        let id: AtomId = record.parse(0, "atom id")?;
        let molecule_index: usize = record.parse(1, "molecule id")?;
        let atom_type: u32 = record.parse(2, "atom type")?;
        let charge: f64 = record.parse(3, "charge")?;
        let position = Point3::new(
            record.parse::<f64>(4, "x coordinate")?,
            record.parse::<f64>(5, "y coordinate")?,
            record.parse::<f64>(6, "z coordinate")?,
        ) * self.distance_scale_factor;
        let image = if record.fields.len() >= 10 {
            Vector3::new(
                record.parse::<i32>(7, "x image flag")?,
                record.parse::<i32>(8, "y image flag")?,
                record.parse::<i32>(9, "z image flag")?,
            )
        } else {
            Vector3::zeros()
        };

        self.check_count(record, "atoms", id)?;
        self.check_type(record, "atom", atom_type)?;
        self.check_charge(record, atom_type, charge)?;

        match mode {
            Mode::Full => {
                if self.topology.atom(id).is_some() {
                    return Err(LammpsError::DuplicateAtom { line: record.line, id });
                }
                let type_name = atom_type.to_string();
                let mut atom = TopologyAtom::new(
                    Atom::new(id, &type_name, "", molecule_index).with_position(position),
                    &type_name,
                );
                atom.charge = Some(charge);
                atom.mass = self.masses.get(&atom_type).copied();
                self.topology.insert_atom(atom)?;
                self.images.insert(id, image);
            }
            Mode::Update => {
                if self.topology.atom(id).is_none() {
                    return Err(LammpsError::UnknownAtom { line: record.line, id });
                }
                updates.insert(
                    id,
                    AtomUpdate {
                        atom_type,
                        molecule_index,
                        charge,
                        position,
                        image,
                    },
                );
            }
        }
        Ok(())
    }

    fn read_mass(&mut self, record: &DataLine) -> Result<(), LammpsError> {
        record.require(2, "a mass record")?;
        let atom_type: u32 = record.parse(0, "atom type")?;
        let mass: f64 = record.parse(1, "mass")?;
        self.check_type(record, "atom", atom_type)?;
        self.masses.insert(atom_type, mass);

        let type_name = atom_type.to_string();
        let ids: Vec<AtomId> = self
            .topology
            .atoms()
            .filter(|atom| atom.atom_type == type_name)
            .map(|atom| atom.id())
            .collect();
        for id in ids {
            if let Some(atom) = self.topology.atom_mut(id) {
                atom.mass = Some(mass);
            }
        }
        Ok(())
    }

    fn read_velocity(&mut self, record: &DataLine) -> Result<(), LammpsError> {
        record.require(4, "a velocity record")?;
        let id: AtomId = record.parse(0, "atom id")?;
        if self.topology.atom(id).is_none() {
            return Err(LammpsError::UndeclaredAtom { line: record.line, id });
        }
        let velocity = Vector3::new(
            record.parse::<f64>(1, "x velocity")?,
            record.parse::<f64>(2, "y velocity")?,
            record.parse::<f64>(3, "z velocity")?,
        ) * self.distance_scale_factor;
        self.velocities.insert(id, velocity);
        Ok(())
    }

    fn read_term(&mut self, record: &DataLine, class: TermClass) -> Result<(), LammpsError> {
        let (items, family) = counter_names(class);
        let arity = class.arity();
        record.require(2 + arity, &format!("a {} record", family))?;

        let serial: usize = record.parse(0, "term id")?;
        let term_type: u32 = record.parse(1, "term type")?;
        self.check_count(record, items, serial)?;
        self.check_type(record, family, term_type)?;

        let mut ids = Vec::with_capacity(arity);
        for position in 2..2 + arity {
            let id: AtomId = record.parse(position, "atom id")?;
            if self.topology.atom(id).is_none() {
                return Err(LammpsError::UndeclaredAtom { line: record.line, id });
            }
            ids.push(id);
        }

        let key = TermKey::new(&ids).map_err(ConsistencyError::from)?;
        let key = if class == TermClass::Bonds { key.sorted() } else { key };
        let kind = TermKind::new(class);
        let term_type = term_type.to_string();
        if let Some(previous) = self.topology.terms().base(kind).get(&key) {
            if previous.first() != Some(&term_type) {
                warn!(
                    "Line {}: {} {} redefined with type {} (was {}), keeping the last one",
                    record.line,
                    class,
                    key,
                    term_type,
                    previous.join(" ")
                );
            }
        }
        self.topology.insert_term(kind, key, vec![term_type])?;
        Ok(())
    }

    fn read_coeff(&mut self, record: &DataLine, family: &str) -> Result<(), LammpsError> {
        record.require(1, "a coefficient record")?;
        let values = record.fields[1..].iter().map(|v| v.to_string()).collect();
        self.force_field
            .coeffs
            .entry(family.to_string())
            .or_default()
            .insert(record.fields[0].to_string(), values);
        Ok(())
    }
}
