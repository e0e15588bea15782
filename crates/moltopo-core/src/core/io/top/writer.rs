use super::GromacsTopology;
use super::params::TypeTable;
use super::section::Section;
use crate::core::models::terms::{TermClass, TermKind};
use std::collections::HashSet;
use tracing::debug;

fn type_lines(table: &TypeTable) -> Vec<String> {
    table.entries().iter().map(|e| e.to_line()).collect()
}

fn term_lines(top: &GromacsTopology, kind: TermKind) -> Vec<String> {
    top.topology
        .terms()
        .merged(kind)
        .into_iter()
        .map(|(key, params)| {
            let mut fields: Vec<String> = key.ids().iter().map(|id| id.to_string()).collect();
            fields.extend(params.iter().cloned());
            fields.join(" ")
        })
        .collect()
}

fn atom_lines(top: &GromacsTopology) -> Vec<String> {
    top.topology
        .atoms()
        .map(|a| {
            let charge = a.charge.map_or_else(|| "0.0".to_string(), |c| c.to_string());
            let mut line = format!(
                "{} {} {} {} {} {} {}",
                a.atom.id,
                a.atom_type,
                a.atom.molecule_index,
                a.atom.molecule_type,
                a.atom.name,
                a.charge_group,
                charge
            );
            if let Some(mass) = a.mass {
                line.push_str(&format!(" {}", mass));
            }
            line
        })
        .collect()
}

/// Generates the body of a known section from the parsed data.
fn section_body(top: &GromacsTopology, section: &Section) -> Vec<String> {
    match section {
        Section::Defaults if !top.defaults.is_empty() => vec![top.defaults.join(" ")],
        Section::Defaults => Vec::new(),
        Section::AtomTypes => type_lines(&top.atom_types),
        Section::BondTypes => type_lines(&top.bond_types),
        Section::AngleTypes => type_lines(&top.angle_types),
        Section::DihedralTypes => type_lines(&top.dihedral_types),
        Section::MoleculeType => top
            .molecule_type
            .iter()
            .map(|m| format!("{} {}", m.name, m.nrexcl))
            .collect(),
        Section::Atoms => atom_lines(top),
        Section::Terms(kind) => term_lines(top, *kind),
        Section::System => top.system_name.iter().cloned().collect(),
        Section::Molecules => top
            .molecules
            .iter()
            .map(|m| format!("{} {}", m.name, m.count))
            .collect(),
        Section::Unknown(_) => Vec::new(),
    }
}

/// Header lines for a file written from scratch: only sections with data,
/// plus the structural ones every topology needs.
fn skeleton(top: &GromacsTopology) -> Vec<String> {
    let terms = top.topology.terms();
    let mut sections: Vec<Section> = Vec::new();

    if !top.defaults.is_empty() {
        sections.push(Section::Defaults);
    }
    for (section, table) in [
        (Section::AtomTypes, &top.atom_types),
        (Section::BondTypes, &top.bond_types),
        (Section::AngleTypes, &top.angle_types),
        (Section::DihedralTypes, &top.dihedral_types),
    ] {
        if !table.is_empty() {
            sections.push(section);
        }
    }
    sections.push(Section::MoleculeType);
    sections.push(Section::Atoms);

    for cross in [false, true] {
        let kind = |class| TermKind { class, cross };
        for class in [TermClass::Bonds, TermClass::Angles, TermClass::Pairs] {
            if terms.has_terms(kind(class)) {
                sections.push(Section::Terms(kind(class)));
            }
        }
        let impropers = terms.has_terms(kind(TermClass::Impropers));
        // Impropers can only follow a dihedrals header, even an empty one.
        if impropers || terms.has_terms(kind(TermClass::Dihedrals)) {
            sections.push(Section::Terms(kind(TermClass::Dihedrals)));
        }
        if impropers {
            sections.push(Section::Terms(kind(TermClass::Impropers)));
        }
    }
    sections.push(Section::System);
    sections.push(Section::Molecules);

    let mut lines: Vec<String> = top.includes().to_vec();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    for section in &sections {
        lines.push(section.header());
        lines.push(String::new());
    }
    lines
}

#[derive(Default)]
struct Replay {
    out: Vec<String>,
    current: Option<Section>,
    generated: HashSet<Section>,
    pending: bool,        // Known section whose body is not emitted yet
    suppress_body: bool,  // Body already regenerated, drop the original
    skipping_cross: bool, // Inside a suppressed cross section
    skip_cross_enabled: bool,
}

impl Replay {
    fn flush(&mut self, top: &GromacsTopology) {
        if !self.pending {
            return;
        }
        self.pending = false;
        if let Some(section) = &self.current {
            self.out.extend(section_body(top, section));
            self.out.push(String::new());
        }
    }

    fn header(&mut self, top: &GromacsTopology, raw_line: &str, name: &str) {
        self.flush(top);
        let section = Section::resolve(name, self.current.as_ref());

        self.skipping_cross = self.skip_cross_enabled && section.is_cross();
        self.suppress_body = false;
        self.pending = false;
        if !self.skipping_cross {
            self.out.push(raw_line.to_string());
            if section.has_writer() {
                if self.generated.insert(section.clone()) {
                    debug!("Writing section [ {} ]", section);
                    self.pending = true;
                } else {
                    // Already regenerated in full; keep only comments here.
                    self.suppress_body = true;
                }
            }
        }
        self.current = Some(section);
    }

    fn line(&mut self, top: &GromacsTopology, raw_line: &str) {
        if self.skipping_cross {
            return;
        }
        let trimmed = raw_line.trim();
        if trimmed.starts_with(';') || trimmed.starts_with('#') {
            self.out.push(raw_line.to_string());
        } else if self.pending {
            self.flush(top);
            self.suppress_body = true;
        } else if !self.suppress_body {
            self.out.push(raw_line.to_string());
        }
    }
}

/// Renders the topology as lines of text.
///
/// With captured content, every original line is replayed and only the
/// bodies of known sections are regenerated. Otherwise a skeleton with the
/// sections that hold data is synthesized and filled the same way.
pub(super) fn render(top: &GromacsTopology, skip_cross: bool) -> Vec<String> {
    let synthesized;
    let content: &[String] = if top.content().is_empty() {
        synthesized = skeleton(top);
        &synthesized
    } else {
        top.content()
    };

    let mut replay = Replay {
        skip_cross_enabled: skip_cross,
        ..Replay::default()
    };
    for raw_line in content {
        match Section::header_name(raw_line) {
            Some(name) => replay.header(top, raw_line, name),
            None => replay.line(top, raw_line),
        }
    }
    replay.flush(top);
    replay.out
}

#[cfg(test)]
mod tests {
    use super::super::reader::read;
    use super::*;
    use crate::core::models::atom::{Atom, TopologyAtom};
    use crate::core::models::terms::TermKey;
    use std::io::Cursor;

    const BONDS: TermKind = TermKind::new(TermClass::Bonds);
    const IMPROPERS: TermKind = TermKind::new(TermClass::Impropers);
    const CROSS_BONDS: TermKind = TermKind::cross(TermClass::Bonds);

    const SAMPLE: &str = "\
; header comment
#include \"ff.itp\"

[ moleculetype ]
; name nrexcl
MOL 3

[ atoms ]
; id type idx mol name cg charge
1 C 1 MOL C1 1 0.1
2 C 1 MOL C2 1 -0.1
3 O 1 MOL O1 2 0.0 16.0
4 H 1 MOL H1 3

[ bonds ]
2 1 1
2 3 1

[ dihedrals ]
1 2 3 4 9

[ dihedrals ]
1 2 3 4 4

[ settles ]
1 1 0.1 0.1633

[ cross_bonds ]
; keep me unless skipped
3 4 1

[ system ]
Test system

[ molecules ]
MOL 1
";

    fn load(content: &str) -> GromacsTopology {
        read(&mut Cursor::new(content)).unwrap()
    }

    fn section_lines<'a>(lines: &'a [String], header: &str, nth: usize) -> Vec<&'a str> {
        let start = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.trim() == header)
            .nth(nth)
            .map(|(i, _)| i + 1)
            .unwrap();
        lines[start..]
            .iter()
            .take_while(|l| !l.trim().starts_with('['))
            .map(|l| l.as_str())
            .filter(|l| !l.trim().is_empty())
            .collect()
    }

    #[test]
    fn unchanged_topology_replays_comments_includes_and_unknown_sections() {
        let top = load(SAMPLE);
        let lines = render(&top, false);

        assert_eq!(lines[0], "; header comment");
        assert_eq!(lines[1], "#include \"ff.itp\"");
        assert!(lines.iter().any(|l| l == "; name nrexcl"));
        assert_eq!(section_lines(&lines, "[ settles ]", 0), vec!["1 1 0.1 0.1633"]);
        assert_eq!(section_lines(&lines, "[ bonds ]", 0), vec!["2 1 1", "2 3 1"]);
        assert_eq!(section_lines(&lines, "[ system ]", 0), vec!["Test system"]);
        assert_eq!(section_lines(&lines, "[ molecules ]", 0), vec!["MOL 1"]);
    }

    #[test]
    fn atoms_are_regenerated_with_default_charge() {
        let top = load(SAMPLE);
        let lines = render(&top, false);

        assert_eq!(
            section_lines(&lines, "[ atoms ]", 0),
            vec![
                "; id type idx mol name cg charge",
                "1 C 1 MOL C1 1 0.1",
                "2 C 1 MOL C2 1 -0.1",
                "3 O 1 MOL O1 2 0 16",
                "4 H 1 MOL H1 3 0.0",
            ]
        );
    }

    #[test]
    fn impropers_are_written_under_second_dihedrals_header() {
        let top = load(SAMPLE);
        let lines = render(&top, false);

        assert_eq!(section_lines(&lines, "[ dihedrals ]", 0), vec!["1 2 3 4 9"]);
        assert_eq!(section_lines(&lines, "[ dihedrals ]", 1), vec!["1 2 3 4 4"]);
    }

    #[test]
    fn overlay_terms_already_in_base_are_not_duplicated() {
        let mut top = load(SAMPLE);
        top.topology
            .insert_overlay_term(BONDS, TermKey::pair(1, 2), vec!["1".into()])
            .unwrap();
        top.topology
            .insert_overlay_term(BONDS, TermKey::pair(3, 4), vec!["1".into()])
            .unwrap();
        top.topology
            .insert_overlay_term(IMPROPERS, TermKey::new(&[4, 3, 2, 1]).unwrap(), vec!["4".into()])
            .unwrap();

        let lines = render(&top, false);

        assert_eq!(
            section_lines(&lines, "[ bonds ]", 0),
            vec!["2 1 1", "2 3 1", "3 4 1"]
        );
        assert_eq!(
            section_lines(&lines, "[ dihedrals ]", 1),
            vec!["1 2 3 4 4", "4 3 2 1 4"]
        );
    }

    #[test]
    fn skip_cross_drops_whole_cross_sections() {
        let top = load(SAMPLE);

        let lines = render(&top, true);
        assert!(!lines.iter().any(|l| l.contains("cross_bonds")));
        assert!(!lines.iter().any(|l| l.contains("keep me")));
        assert_eq!(section_lines(&lines, "[ system ]", 0), vec!["Test system"]);

        let lines = render(&top, false);
        assert_eq!(
            section_lines(&lines, "[ cross_bonds ]", 0),
            vec!["; keep me unless skipped", "3 4 1"]
        );
    }

    #[test]
    fn empty_known_section_is_filled_at_next_header() {
        let mut top = load("[ atoms ]\n1 C 1 M C1 1\n2 C 1 M C2 1\n[ bonds ]\n[ system ]\ns\n");
        top.topology
            .insert_overlay_term(BONDS, TermKey::pair(1, 2), vec![])
            .unwrap();

        let lines = render(&top, false);
        assert_eq!(section_lines(&lines, "[ bonds ]", 0), vec!["1 2"]);
    }

    #[test]
    fn removal_is_reflected_in_regenerated_sections() {
        let mut top = load(SAMPLE);
        top.topology
            .remove_atoms(&std::collections::HashSet::from([1]), true)
            .unwrap();

        let lines = render(&top, false);
        assert_eq!(section_lines(&lines, "[ bonds ]", 0), vec!["1 2 1"]);
        assert_eq!(section_lines(&lines, "[ dihedrals ]", 0), Vec::<&str>::new());
        assert_eq!(section_lines(&lines, "[ cross_bonds ]", 0).len(), 2);
    }

    #[test]
    fn repeated_section_keeps_comments_but_not_stale_records() {
        let mut top = load(
            "\
[ atoms ]
1 C 1 MOL C1 1 0.0
2 C 1 MOL C2 1 0.0
3 C 1 MOL C3 1 0.0

[ bonds ]
2 3 1

[ angles ]

[ bonds ]
; late bonds
1 3 1
",
        );
        top.topology
            .remove_atoms(&std::collections::HashSet::from([1]), true)
            .unwrap();

        let lines = render(&top, false);

        assert_eq!(section_lines(&lines, "[ bonds ]", 0), vec!["1 2 1"]);
        assert_eq!(section_lines(&lines, "[ bonds ]", 1), vec!["; late bonds"]);
        assert!(!lines.iter().any(|l| l.trim() == "1 3 1"));
    }

    #[test]
    fn skeleton_is_synthesized_without_captured_content() {
        let mut top = GromacsTopology::new();
        for id in 1..=4 {
            let atom = Atom::new(id, &format!("C{}", id), "MOL", 1);
            top.topology.insert_atom(TopologyAtom::new(atom, "C")).unwrap();
        }
        top.topology
            .insert_term(BONDS, TermKey::pair(1, 2), vec!["1".into()])
            .unwrap();
        top.topology
            .insert_term(IMPROPERS, TermKey::new(&[1, 2, 3, 4]).unwrap(), vec!["4".into()])
            .unwrap();
        top.topology
            .insert_overlay_term(CROSS_BONDS, TermKey::pair(3, 4), vec![])
            .unwrap();
        top.system_name = Some("synthetic".into());

        let lines = render(&top, false);
        let headers: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with('['))
            .map(|l| l.as_str())
            .collect();
        assert_eq!(
            headers,
            vec![
                "[ moleculetype ]",
                "[ atoms ]",
                "[ bonds ]",
                "[ dihedrals ]",
                "[ dihedrals ]",
                "[ cross_bonds ]",
                "[ system ]",
                "[ molecules ]",
            ]
        );
        assert_eq!(section_lines(&lines, "[ dihedrals ]", 0), Vec::<&str>::new());
        assert_eq!(section_lines(&lines, "[ dihedrals ]", 1), vec!["1 2 3 4 4"]);
        assert_eq!(section_lines(&lines, "[ cross_bonds ]", 0), vec!["3 4"]);

        let reread = load(&lines.join("\n"));
        assert_eq!(reread.topology.len(), 4);
        assert_eq!(reread.topology.terms().base(IMPROPERS).len(), 1);
        assert!(
            reread
                .topology
                .terms()
                .base(CROSS_BONDS)
                .contains_key(&TermKey::pair(3, 4))
        );
        assert_eq!(reread.system_name.as_deref(), Some("synthetic"));
    }
}
