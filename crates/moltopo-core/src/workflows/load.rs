use crate::core::graph::TopologyGraph;
use crate::core::io::coordinate_file::CoordinateError;
use crate::core::io::gro::GroFile;
use crate::core::io::lammps::{LammpsError, LammpsReader};
use crate::core::io::pdb::PdbFile;
use crate::core::io::top::{GromacsTopology, TopError, TopFile};
use crate::core::io::traits::MolecularFile;
use crate::core::models::coordinates::CoordinateSet;
use crate::core::models::topology::Topology;
use crate::core::settings::Settings;
use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
    #[error(transparent)]
    Topology(#[from] TopError),
    #[error(transparent)]
    Lammps(#[from] LammpsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    Gro,
    Pdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyFormat {
    Gromacs,
    LammpsData,
    LammpsInput,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

impl CoordinateFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension(path)?.as_str() {
            "gro" => Some(Self::Gro),
            "pdb" => Some(Self::Pdb),
            _ => None,
        }
    }
}

impl TopologyFormat {
    /// Picks a topology format from the file name. LAMMPS input scripts are
    /// recognized by an `.in` or `.lammps` extension or an `in.` prefix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let is_script = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("in."));
        if is_script {
            return Some(Self::LammpsInput);
        }
        match extension(path)?.as_str() {
            "top" => Some(Self::Gromacs),
            "data" | "lmp" => Some(Self::LammpsData),
            "in" | "lammps" => Some(Self::LammpsInput),
            _ => None,
        }
    }
}

/// A topology read from any supported format.
#[derive(Debug, Clone)]
pub enum LoadedTopology {
    Gromacs(GromacsTopology),
    Lammps(LammpsReader),
}

impl LoadedTopology {
    pub fn topology(&self) -> &Topology {
        match self {
            LoadedTopology::Gromacs(top) => &top.topology,
            LoadedTopology::Lammps(reader) => reader.topology(),
        }
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        match self {
            LoadedTopology::Gromacs(top) => &mut top.topology,
            LoadedTopology::Lammps(reader) => reader.topology_mut(),
        }
    }

    /// Builds the bond graph. Typed graphs label edges with the bond type
    /// and carry the LAMMPS box; a GROMACS topology has no box and gets a
    /// zero one.
    pub fn bond_graph(&self, typed: bool) -> TopologyGraph {
        if !typed {
            return TopologyGraph::from_topology(self.topology());
        }
        let box_dims = match self {
            LoadedTopology::Lammps(reader) => reader.box_dims(),
            LoadedTopology::Gromacs(_) => Vector3::zeros(),
        };
        TopologyGraph::from_typed_topology(self.topology(), box_dims)
    }
}

pub fn read_coordinates(path: &Path, settings: &Settings) -> Result<CoordinateSet, LoadError> {
    let set = match CoordinateFormat::from_path(path) {
        Some(CoordinateFormat::Gro) => GroFile::read_from_path(path, &settings.gro_options())?,
        Some(CoordinateFormat::Pdb) => PdbFile::read_from_path(path, &settings.pdb_options())?,
        None => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(set)
}

pub fn write_coordinates(
    set: &CoordinateSet,
    path: &Path,
    settings: &Settings,
) -> Result<(), LoadError> {
    match CoordinateFormat::from_path(path) {
        Some(CoordinateFormat::Gro) => GroFile::write_to_path(set, &settings.gro_options(), path)?,
        Some(CoordinateFormat::Pdb) => PdbFile::write_to_path(set, &settings.pdb_options(), path)?,
        None => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
    Ok(())
}

/// Reads a topology, applying the LAMMPS naming scheme from `settings` when
/// one is configured.
pub fn read_topology(path: &Path, settings: &Settings) -> Result<LoadedTopology, LoadError> {
    let format = TopologyFormat::from_path(path)
        .ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    let loaded = match format {
        TopologyFormat::Gromacs => {
            LoadedTopology::Gromacs(TopFile::read_from_path(path, &settings.top_options())?)
        }
        TopologyFormat::LammpsData | TopologyFormat::LammpsInput => {
            let mut reader = settings.lammps_reader();
            if format == TopologyFormat::LammpsData {
                reader.read_data(path)?;
            } else {
                reader.read_input(path)?;
            }
            if let Some(scheme) = settings.naming_scheme() {
                reader.assign_names(&scheme)?;
            }
            LoadedTopology::Lammps(reader)
        }
    };
    info!(
        "Loaded topology with {} atoms from {}",
        loaded.topology().len(),
        path.display()
    );
    Ok(loaded)
}
