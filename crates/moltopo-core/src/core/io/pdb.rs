use super::coordinate_file::{
    CoordinateError, CoordinateParseErrorKind, parse_box, parse_float, parse_int, slice_and_trim,
};
use super::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::coordinates::CoordinateSet;
use nalgebra::{Point3, Vector3};
use std::io::{BufRead, Write};

const RECORD_MIN_LEN: usize = 54;
const ID_WRAP: usize = 99_999;
const MOLECULE_INDEX_WRAP: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdbOptions {
    pub scale_factor: f64, // Angstrom to nm by default
}

impl Default for PdbOptions {
    fn default() -> Self {
        Self { scale_factor: 0.1 }
    }
}

pub struct PdbFile;

fn element_of(name: &str) -> &str {
    let end = name
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map_or(name.len(), |(i, _)| i)
        .min(1);
    &name[..end]
}

impl MolecularFile for PdbFile {
    type Data = CoordinateSet;
    type Options = PdbOptions;
    type Error = CoordinateError;

    fn read_from(
        reader: &mut impl BufRead,
        options: &Self::Options,
    ) -> Result<Self::Data, Self::Error> {
        let scale = options.scale_factor;
        let mut set = CoordinateSet::new("");
        let mut box_dims = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            if line.starts_with("CRYST1") {
                let [x, y, z] = parse_box(line.split_whitespace().skip(1), &line, line_num)?;
                box_dims = Some(Vector3::new(x, y, z) * scale);
            } else if line.starts_with("ATOM") || line.starts_with("HETATM") {
                if line.len() < RECORD_MIN_LEN {
                    return Err(CoordinateError::Parse {
                        line: line_num,
                        kind: CoordinateParseErrorKind::LineTooShort(RECORD_MIN_LEN),
                    });
                }
                let id = parse_int(&line, line_num, 6, 11)?;
                let name = slice_and_trim(&line, 12, 16);
                let molecule_type = slice_and_trim(&line, 17, 20);
                // Some writers leave resSeq blank.
                let molecule_index = if slice_and_trim(&line, 22, 26).is_empty() {
                    0
                } else {
                    parse_int(&line, line_num, 22, 26)?
                };
                let x = parse_float(&line, line_num, 30, 38)?;
                let y = parse_float(&line, line_num, 38, 46)?;
                let z = parse_float(&line, line_num, 46, 54)?;

                let atom = Atom::new(id, name, molecule_type, molecule_index)
                    .with_position(Point3::new(x, y, z) * scale);
                set.insert(atom)?;
            } else if set.title.is_empty() && (line.starts_with("TITLE") || line.starts_with("REMARK")) {
                set.title = line.get(6..).unwrap_or("").trim().to_string();
            }
        }

        let box_dims = box_dims.ok_or_else(|| CoordinateError::MissingRecord("CRYST1".into()))?;
        if box_dims.x != box_dims.y || box_dims.x != box_dims.z {
            return Err(CoordinateError::NonCubicBox {
                x: box_dims.x,
                y: box_dims.y,
                z: box_dims.z,
            });
        }
        set.box_dims = box_dims;
        set.clear_modified();
        Ok(set)
    }

    fn write_to(
        data: &Self::Data,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let scale = options.scale_factor;
        if data.title.is_empty() {
            writeln!(writer, "REMARK generated by moltopo")?;
        } else {
            writeln!(writer, "REMARK {}", data.title)?;
        }
        writeln!(writer, "MODEL 1")?;

        let b = data.box_dims / scale;
        writeln!(
            writer,
            "{:<6}{:>9.3}{:>9.3}{:>9.3}{:>7.2}{:>7.2}{:>7.2} {:<11}{:>4}",
            "CRYST1", b.x, b.y, b.z, 90.0, 90.0, 90.0, "P 1", 1
        )?;

        for atom in data.atoms() {
            let p = atom.position / scale;
            writeln!(
                writer,
                "{:<6}{:>5} {:>4} {:<3}  {:>4}    {:>8.3}{:>8.3}{:>8.3}                      {:>2}",
                "ATOM",
                atom.id % ID_WRAP,
                atom.name,
                atom.molecule_type,
                atom.molecule_index % MOLECULE_INDEX_WRAP,
                p.x,
                p.y,
                p.z,
                element_of(&atom.name)
            )?;
        }

        writeln!(writer, "TER")?;
        writeln!(writer, "ENDMDL")?;
        Ok(())
    }
}
