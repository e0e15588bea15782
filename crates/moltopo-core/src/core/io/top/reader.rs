use super::params::{TypeEntry, TypeTable};
use super::section::Section;
use super::{GromacsTopology, MoleculeCount, MoleculeType, TopError};
use crate::core::models::atom::{Atom, TopologyAtom};
use crate::core::models::terms::{TermKey, TermKind};
use std::collections::HashSet;
use std::io::BufRead;
use std::str::FromStr;
use tracing::{debug, info, warn};

struct LineContext<'a> {
    line: usize,
    section: &'a Section,
}

impl LineContext<'_> {
    fn error(&self, message: impl Into<String>) -> TopError {
        TopError::Parse {
            line: self.line,
            section: self.section.to_string(),
            message: message.into(),
        }
    }

    fn require<'f>(&self, fields: &[&'f str], min: usize) -> Result<(), TopError> {
        if fields.len() < min {
            return Err(self.error(format!(
                "expected at least {} fields, found {}",
                min,
                fields.len()
            )));
        }
        Ok(())
    }

    fn parse<T: FromStr>(&self, field: &str, what: &str) -> Result<T, TopError> {
        field
            .parse()
            .map_err(|_| self.error(format!("invalid {} '{}'", what, field)))
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with(';') || trimmed.starts_with('#')
}

fn is_include(trimmed: &str) -> bool {
    trimmed.starts_with("#include") || trimmed.starts_with("include")
}

pub(super) fn read(reader: &mut impl BufRead) -> Result<GromacsTopology, TopError> {
    let mut top = GromacsTopology::new();
    let mut current: Option<Section> = None;
    let mut visited: HashSet<Section> = HashSet::new();

    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line_num = line_num + 1;
        let trimmed = line.trim();
        top.content.push(line.clone());

        if is_include(trimmed) {
            top.includes.push(trimmed.to_string());
            continue;
        }
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        if let Some(name) = Section::header_name(trimmed) {
            let section = Section::resolve(name, current.as_ref());
            if let Some(previous) = current.take() {
                visited.insert(previous);
            }
            match &section {
                Section::Unknown(name) => {
                    warn!("No parser for section [ {} ], copying it verbatim", name);
                    if !top.unknown_sections.contains(name) {
                        top.unknown_sections.push(name.clone());
                    }
                }
                known => debug!("Reading section [ {} ]", known),
            }
            current = Some(section);
            continue;
        }

        let Some(section) = current.as_ref() else {
            continue;
        };
        if visited.contains(section) {
            continue;
        }
        // Inline comments end the data part of a record.
        let data = trimmed.split(';').next().unwrap_or("");
        let fields: Vec<&str> = data.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let ctx = LineContext {
            line: line_num,
            section,
        };
        parse_record(&mut top, &ctx, &fields, trimmed)?;
    }

    info!(
        "Read topology with {} atoms and {} bonded terms",
        top.topology.len(),
        top.topology.terms().base_len()
    );
    Ok(top)
}

fn parse_record(
    top: &mut GromacsTopology,
    ctx: &LineContext<'_>,
    fields: &[&str],
    raw: &str,
) -> Result<(), TopError> {
    match ctx.section {
        Section::Defaults => {
            top.defaults = fields.iter().map(|f| f.to_string()).collect();
        }
        Section::AtomTypes => {
            ctx.require(fields, 1)?;
            top.atom_types.insert(TypeEntry {
                types: vec![fields[0].to_string()],
                func: None,
                params: to_strings(&fields[1..]),
            });
        }
        Section::BondTypes => parse_type(&mut top.bond_types, ctx, fields, 2)?,
        Section::AngleTypes => parse_type(&mut top.angle_types, ctx, fields, 3)?,
        Section::DihedralTypes => parse_type(&mut top.dihedral_types, ctx, fields, 4)?,
        Section::MoleculeType => {
            ctx.require(fields, 2)?;
            top.molecule_type = Some(MoleculeType {
                name: fields[0].to_string(),
                nrexcl: fields[1].to_string(),
            });
        }
        Section::Atoms => {
            ctx.require(fields, 6)?;
            let id = ctx.parse(fields[0], "atom id")?;
            let molecule_index = ctx.parse(fields[2], "molecule index")?;
            let atom = Atom::new(id, fields[4], fields[3], molecule_index);
            let mut atom = TopologyAtom::new(atom, fields[1]);
            atom.charge_group = ctx.parse(fields[5], "charge group")?;
            if let Some(charge) = fields.get(6) {
                atom.charge = Some(ctx.parse(charge, "charge")?);
            }
            if let Some(mass) = fields.get(7) {
                atom.mass = Some(ctx.parse(mass, "mass")?);
            }
            top.topology.insert_atom(atom)?;
        }
        Section::Terms(kind) => parse_term(top, ctx, *kind, fields)?,
        Section::System => {
            top.system_name = Some(raw.to_string());
        }
        Section::Molecules => {
            ctx.require(fields, 2)?;
            top.molecules.push(MoleculeCount {
                name: fields[0].to_string(),
                count: ctx.parse(fields[1], "molecule count")?,
            });
        }
        Section::Unknown(_) => {}
    }
    Ok(())
}

fn parse_type(
    table: &mut TypeTable,
    ctx: &LineContext<'_>,
    fields: &[&str],
    arity: usize,
) -> Result<(), TopError> {
    ctx.require(fields, arity + 1)?;
    table.insert(TypeEntry {
        types: to_strings(&fields[..arity]),
        func: Some(ctx.parse(fields[arity], "function type")?),
        params: to_strings(&fields[arity + 1..]),
    });
    Ok(())
}

fn parse_term(
    top: &mut GromacsTopology,
    ctx: &LineContext<'_>,
    kind: TermKind,
    fields: &[&str],
) -> Result<(), TopError> {
    let arity = kind.class.arity();
    ctx.require(fields, arity)?;
    let ids = fields[..arity]
        .iter()
        .map(|f| ctx.parse(f, "atom id"))
        .collect::<Result<Vec<usize>, _>>()?;
    let key = TermKey::new(&ids).map_err(|e| ctx.error(e.to_string()))?;
    top.topology
        .insert_term(kind, key, to_strings(&fields[arity..]))?;
    Ok(())
}

fn to_strings(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::terms::TermClass;
    use std::io::Cursor;

    const BONDS: TermKind = TermKind::new(TermClass::Bonds);
    const DIHEDRALS: TermKind = TermKind::new(TermClass::Dihedrals);
    const IMPROPERS: TermKind = TermKind::new(TermClass::Impropers);
    const CROSS_BONDS: TermKind = TermKind::cross(TermClass::Bonds);

    const SAMPLE: &str = "\
; sample topology
#include \"forcefield.itp\"

[ defaults ]
1 3 yes 0.5 0.5

[ atomtypes ]
CT 12.011 0.0 A 0.35 0.276
HC 1.008 0.0 A 0.25 0.125

[ bondtypes ]
CT HC 1 0.109 284512.0

[ moleculetype ]
; name nrexcl
BUT 3

[ atoms ]
1 CT 1 BUT C1 1 -0.18 12.011
2 CT 1 BUT C2 2 -0.12
3 CT 1 BUT C3 3 -0.12 12.011
4 CT 1 BUT C4 4 -0.18 12.011 ; tail
5 HC 1 BUT H1 5

[ bonds ]
1 2 1
2 3 1
3 4 1
1 5 1

[ dihedrals ]
1 2 3 4 3

[ dihedrals ]
1 2 3 5 4

[ settles ]
1 1 0.1 0.1633

[ cross_bonds ]
4 5

[ system ]
Butane in vacuum

[ molecules ]
BUT 1
";

    fn read_str(content: &str) -> Result<GromacsTopology, TopError> {
        read(&mut Cursor::new(content))
    }

    #[test]
    fn reads_every_known_section() {
        let top = read_str(SAMPLE).unwrap();

        assert_eq!(top.defaults, vec!["1", "3", "yes", "0.5", "0.5"]);
        assert_eq!(top.atom_types.len(), 2);
        assert_eq!(top.bond_types.get(&["HC", "CT"]).unwrap().func, Some(1));
        assert_eq!(
            top.molecule_type,
            Some(MoleculeType {
                name: "BUT".into(),
                nrexcl: "3".into()
            })
        );
        assert_eq!(top.system_name.as_deref(), Some("Butane in vacuum"));
        assert_eq!(
            top.molecules,
            vec![MoleculeCount {
                name: "BUT".into(),
                count: 1
            }]
        );
    }

    #[test]
    fn atoms_carry_optional_charge_and_mass() {
        let top = read_str(SAMPLE).unwrap();

        assert_eq!(top.topology.len(), 5);
        let c1 = top.topology.atom(1).unwrap();
        assert_eq!(c1.atom.name, "C1");
        assert_eq!(c1.atom.molecule_type, "BUT");
        assert_eq!(c1.atom_type, "CT");
        assert_eq!(c1.charge, Some(-0.18));
        assert_eq!(c1.mass, Some(12.011));
        let c2 = top.topology.atom(2).unwrap();
        assert_eq!(c2.charge_group, 2);
        assert!(c2.mass.is_none());
        assert!(top.topology.atom(5).unwrap().charge.is_none());
        assert_eq!(top.topology.atom(4).unwrap().mass, Some(12.011));
    }

    #[test]
    fn second_dihedrals_section_holds_impropers() {
        let top = read_str(SAMPLE).unwrap();
        let terms = top.topology.terms();

        assert_eq!(terms.base(BONDS).len(), 4);
        assert_eq!(
            terms.base(BONDS).get(&TermKey::pair(1, 2)),
            Some(&vec!["1".to_string()])
        );
        assert!(
            terms
                .base(DIHEDRALS)
                .contains_key(&TermKey::new(&[1, 2, 3, 4]).unwrap())
        );
        assert!(
            terms
                .base(IMPROPERS)
                .contains_key(&TermKey::new(&[1, 2, 3, 5]).unwrap())
        );
        assert!(terms.base(CROSS_BONDS).contains_key(&TermKey::pair(4, 5)));
    }

    #[test]
    fn unknown_sections_and_includes_are_recorded() {
        let top = read_str(SAMPLE).unwrap();

        assert_eq!(top.unknown_sections(), &["settles".to_string()]);
        assert_eq!(top.includes(), &["#include \"forcefield.itp\"".to_string()]);
        assert_eq!(top.content().len(), SAMPLE.lines().count());
    }

    #[test]
    fn left_section_is_not_parsed_again() {
        let content = "\
[ atoms ]
1 C 1 M C1 1
2 C 1 M C2 1
[ bonds ]
1 2 1
[ angles ]
[ bonds ]
2 1 1
";
        let top = read_str(content).unwrap();
        assert_eq!(top.topology.terms().base(BONDS).len(), 1);
    }

    #[test]
    fn malformed_atom_reports_line_and_section() {
        let content = "[ atoms ]\n1 C x M C1 1\n";
        match read_str(content) {
            Err(TopError::Parse { line, section, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(section, "atoms");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn term_referencing_undeclared_atom_fails() {
        let content = "[ atoms ]\n1 C 1 M C1 1\n[ bonds ]\n1 2 1\n";
        assert!(matches!(
            read_str(content),
            Err(TopError::Consistency(_))
        ));
    }

    #[test]
    fn duplicate_atom_fails() {
        let content = "[ atoms ]\n1 C 1 M C1 1\n1 C 1 M C2 1\n";
        assert!(matches!(
            read_str(content),
            Err(TopError::Consistency(_))
        ));
    }

    #[test]
    fn short_term_record_is_a_parse_error() {
        let content = "[ atoms ]\n1 C 1 M C1 1\n[ angles ]\n1 1\n";
        assert!(matches!(
            read_str(content),
            Err(TopError::Parse { line: 4, .. })
        ));
    }
}
