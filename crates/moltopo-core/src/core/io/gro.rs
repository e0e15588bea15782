use super::coordinate_file::{
    CoordinateError, CoordinateParseErrorKind, parse_box, parse_float, parse_int, slice_and_trim,
};
use super::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::coordinates::CoordinateSet;
use nalgebra::{Point3, Vector3};
use std::io::{BufRead, Write};

const RECORD_MIN_LEN: usize = 44;
const FIELD_WRAP: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroOptions {
    pub scale_factor: f64, // Multiplies every length on read, divides on write
}

impl Default for GroOptions {
    fn default() -> Self {
        Self { scale_factor: 1.0 }
    }
}

pub struct GroFile;

impl MolecularFile for GroFile {
    type Data = CoordinateSet;
    type Options = GroOptions;
    type Error = CoordinateError;

    fn read_from(
        reader: &mut impl BufRead,
        options: &Self::Options,
    ) -> Result<Self::Data, Self::Error> {
        let scale = options.scale_factor;
        let mut lines = reader.lines();

        let title = lines
            .next()
            .transpose()?
            .ok_or_else(|| CoordinateError::MissingRecord("title line".into()))?;
        let count_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| CoordinateError::MissingRecord("atom count line".into()))?;
        let count = parse_int(&count_line, 2, 0, count_line.len())?;

        let mut set = CoordinateSet::new(title.trim_end());

        // Ids and molecule indices wrap around in large files, so both are
        // re-derived: ids sequentially, molecule indices as a counter bumped
        // whenever the column value changes.
        let mut molecule_index = 0;
        let mut last_column_index = None;
        for id in 1..=count {
            let line_num = id + 2;
            let line = lines.next().transpose()?.ok_or_else(|| {
                CoordinateError::MissingRecord(format!(
                    "atom record {} of {} (file ended at line {})",
                    id,
                    count,
                    line_num - 1
                ))
            })?;
            if line.len() < RECORD_MIN_LEN {
                return Err(CoordinateError::Parse {
                    line: line_num,
                    kind: CoordinateParseErrorKind::LineTooShort(RECORD_MIN_LEN),
                });
            }

            let column_index = parse_int(&line, line_num, 0, 5)?;
            if last_column_index != Some(column_index) {
                molecule_index += 1;
                last_column_index = Some(column_index);
            }
            let molecule_type = slice_and_trim(&line, 5, 10);
            let name = slice_and_trim(&line, 10, 15);
            let x = parse_float(&line, line_num, 20, 28)?;
            let y = parse_float(&line, line_num, 28, 36)?;
            let z = parse_float(&line, line_num, 36, 44)?;

            let atom = Atom::new(id, name, molecule_type, molecule_index)
                .with_position(Point3::new(x, y, z) * scale);
            set.insert(atom)?;
        }

        let box_line_num = count + 3;
        let box_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| CoordinateError::MissingRecord("box line".into()))?;
        let [bx, by, bz] = parse_box(box_line.split_whitespace(), &box_line, box_line_num)?;
        set.box_dims = Vector3::new(bx, by, bz) * scale;

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
            writeln!(writer, "Generated by moltopo")?;
        } else {
            writeln!(writer, "{}", data.title)?;
        }
        writeln!(writer, "{}", data.len())?;

        for atom in data.atoms() {
            let p = atom.position / scale;
            writeln!(
                writer,
                "{:>5}{:<5}{:>5}{:>5}{:>8.3}{:>8.3}{:>8.3}",
                atom.molecule_index % FIELD_WRAP,
                atom.molecule_type,
                atom.name,
                atom.id % FIELD_WRAP,
                p.x,
                p.y,
                p.z
            )?;
        }

        let b = data.box_dims / scale;
        writeln!(writer, "{:>10.5}{:>10.5}{:>10.5}", b.x, b.y, b.z)?;
        Ok(())
    }
}
