use crate::core::io::gro::GroOptions;
use crate::core::io::lammps::{DEFAULT_DISTANCE_SCALE, LammpsReader, NamingScheme};
use crate::core::io::pdb::PdbOptions;
use crate::core::io::top::TopOptions;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct CoordinateSettings {
    pub gro_scale_factor: f64,
    pub pdb_scale_factor: f64,
}

impl Default for CoordinateSettings {
    fn default() -> Self {
        Self {
            gro_scale_factor: GroOptions::default().scale_factor,
            pdb_scale_factor: PdbOptions::default().scale_factor,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct TopologySettings {
    pub skip_cross: bool,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct NamingSettings {
    pub type_to_molecule: HashMap<String, String>,
    pub name_sequences: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct LammpsSettings {
    pub distance_scale_factor: f64,
    pub naming: Option<NamingSettings>,
}

impl Default for LammpsSettings {
    fn default() -> Self {
        Self {
            distance_scale_factor: DEFAULT_DISTANCE_SCALE,
            naming: None,
        }
    }
}

/// Reader and writer settings loaded from a TOML file.
///
/// Every table and key is optional; missing values fall back to the
/// defaults of the corresponding format options.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    pub coordinates: CoordinateSettings,
    pub topology: TopologySettings,
    pub lammps: LammpsSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| SettingsError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn gro_options(&self) -> GroOptions {
        GroOptions {
            scale_factor: self.coordinates.gro_scale_factor,
        }
    }

    pub fn pdb_options(&self) -> PdbOptions {
        PdbOptions {
            scale_factor: self.coordinates.pdb_scale_factor,
        }
    }

    pub fn top_options(&self) -> TopOptions {
        TopOptions {
            skip_cross: self.topology.skip_cross,
        }
    }

    pub fn lammps_reader(&self) -> LammpsReader {
        LammpsReader::new().with_distance_scale(self.lammps.distance_scale_factor)
    }

    pub fn naming_scheme(&self) -> Option<NamingScheme> {
        self.lammps.naming.as_ref().map(|naming| NamingScheme {
            type_to_molecule: naming.type_to_molecule.clone(),
            name_sequences: naming.name_sequences.clone(),
        })
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
