use super::atom::AtomId;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// The state of one particle as reported by a running simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleState {
    pub position: Point3<f64>,
    pub image: Vector3<i32>, // Periodic image flags
    pub velocity: Vector3<f64>,
}

impl ParticleState {
    pub fn at(position: Point3<f64>) -> Self {
        Self {
            position,
            image: Vector3::zeros(),
            velocity: Vector3::zeros(),
        }
    }

    /// Position shifted out of the primary cell by `box_dims * image`.
    pub fn unfolded(&self, box_dims: &Vector3<f64>) -> Point3<f64> {
        self.position + box_dims.component_mul(&self.image.cast::<f64>())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParticleError {
    #[error("Particle {0} is not available from the particle source")]
    MissingParticle(AtomId),
    #[error("Particle {0} is listed more than once")]
    DuplicateRecord(AtomId),
}

/// Read access to live particle data, keyed by the source's particle id.
///
/// The library never constructs a simulation; callers inject whatever holds
/// the particles (an engine binding, a parsed data file, a plain map).
pub trait ParticleSource {
    fn particle(&self, id: AtomId) -> Option<ParticleState>;
}

impl ParticleSource for HashMap<AtomId, ParticleState> {
    fn particle(&self, id: AtomId) -> Option<ParticleState> {
        self.get(&id).copied()
    }
}

impl ParticleSource for BTreeMap<AtomId, ParticleState> {
    fn particle(&self, id: AtomId) -> Option<ParticleState> {
        self.get(&id).copied()
    }
}
