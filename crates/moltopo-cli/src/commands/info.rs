use crate::cli::InfoArgs;
use crate::error::Result;
use moltopo::core::models::coordinates::CoordinateSet;
use moltopo::core::models::terms::TermKind;
use moltopo::core::settings::Settings;
use moltopo::workflows::load::{self, CoordinateFormat, LoadedTopology};
use std::collections::BTreeSet;
use std::fmt::Write;
use tracing::info;

pub fn run(args: InfoArgs, settings: &Settings) -> Result<()> {
    let summary = if CoordinateFormat::from_path(&args.input).is_some() {
        describe_coordinates(&load::read_coordinates(&args.input, settings)?)
    } else {
        describe_topology(&load::read_topology(&args.input, settings)?)
    };
    info!("Summarized {}", args.input.display());
    print!("{}", summary);
    Ok(())
}

pub fn describe_coordinates(set: &CoordinateSet) -> String {
    let molecules: BTreeSet<(&str, usize)> = set
        .atoms()
        .map(|atom| (atom.molecule_type.as_str(), atom.molecule_index))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Title:     {}", set.title);
    let _ = writeln!(out, "Atoms:     {}", set.len());
    let _ = writeln!(out, "Molecules: {}", molecules.len());
    let _ = writeln!(
        out,
        "Box:       {:.5} {:.5} {:.5}",
        set.box_dims.x, set.box_dims.y, set.box_dims.z
    );
    out
}

pub fn describe_topology(loaded: &LoadedTopology) -> String {
    let topology = loaded.topology();
    let mut out = String::new();

    match loaded {
        LoadedTopology::Gromacs(top) => {
            if let Some(molecule) = &top.molecule_type {
                let _ = writeln!(out, "Molecule type: {} (nrexcl {})", molecule.name, molecule.nrexcl);
            }
            if let Some(system) = &top.system_name {
                let _ = writeln!(out, "System:        {}", system);
            }
            for entry in &top.molecules {
                let _ = writeln!(out, "Molecules:     {} x {}", entry.name, entry.count);
            }
            if !top.unknown_sections().is_empty() {
                let _ = writeln!(out, "Unparsed:      {}", top.unknown_sections().join(", "));
            }
        }
        LoadedTopology::Lammps(reader) => {
            if let Some(units) = reader.units() {
                let _ = writeln!(out, "Units:         {}", units);
            }
            let dims = reader.box_dims();
            let _ = writeln!(out, "Box:           {:.5} {:.5} {:.5}", dims.x, dims.y, dims.z);
        }
    }

    let _ = writeln!(out, "Atoms:         {}", topology.len());
    for kind in TermKind::all() {
        let count = topology.terms().count(kind);
        if count > 0 {
            let _ = writeln!(out, "  {:<16}{}", kind.to_string(), count);
        }
    }
    out
}
