use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

helix_geo::define_id!(
    /// Index into [`ParticleParams`].
    ParticleId
);

/// Speed of light in cm/ns.
pub const C_LIGHT: f64 = 29.9792458;

/// Definition of a particle type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleInput {
    pub name: String,
    /// Rest mass in MeV/c^2.
    pub mass: f64,
    /// Charge in units of the elementary charge.
    pub charge: f64,
}

/// Immutable table of particle types.
#[derive(Debug, Clone)]
pub struct ParticleParams {
    particles: Vec<ParticleInput>,
}

impl ParticleParams {
    pub fn new(particles: Vec<ParticleInput>) -> Result<Self> {
        if particles.is_empty() {
            bail!("at least one particle type is required.");
        }
        for (i, p) in particles.iter().enumerate() {
            if p.name.is_empty() {
                bail!("particle {} has an empty name.", i);
            }
            if !(p.mass >= 0.0 && p.mass.is_finite()) {
                bail!("particle '{}' has invalid mass {}.", p.name, p.mass);
            }
            if !p.charge.is_finite() {
                bail!("particle '{}' has invalid charge {}.", p.name, p.charge);
            }
            if particles[..i].iter().any(|other| other.name == p.name) {
                bail!("duplicate particle name '{}'.", p.name);
            }
        }
        Ok(Self { particles })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<ParticleId> {
        self.particles
            .iter()
            .position(|p| p.name == name)
            .map(ParticleId::new)
    }

    pub fn get(&self, id: ParticleId) -> &ParticleInput {
        &self.particles[id.get()]
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        id.get() < self.particles.len()
    }
}

/// Particle type and kinetic energy (MeV) of one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleTrackState {
    pub particle_id: ParticleId,
    pub energy: f64,
}

/// Derived kinematics of a track's particle.
#[derive(Debug, Clone, Copy)]
pub struct ParticleTrackView<'a> {
    def: &'a ParticleInput,
    state: &'a ParticleTrackState,
}

impl<'a> ParticleTrackView<'a> {
    pub fn new(params: &'a ParticleParams, state: &'a ParticleTrackState) -> Self {
        Self {
            def: params.get(state.particle_id),
            state,
        }
    }

    pub fn particle_id(&self) -> ParticleId {
        self.state.particle_id
    }

    pub fn mass(&self) -> f64 {
        self.def.mass
    }

    pub fn charge(&self) -> f64 {
        self.def.charge
    }

    /// Kinetic energy in MeV.
    pub fn energy(&self) -> f64 {
        self.state.energy
    }

    pub fn total_energy(&self) -> f64 {
        self.state.energy + self.def.mass
    }

    /// Momentum magnitude in MeV/c.
    pub fn momentum(&self) -> f64 {
        let e = self.state.energy;
        (e * e + 2.0 * self.def.mass * e).sqrt()
    }

    /// v / c
    pub fn beta(&self) -> f64 {
        self.momentum() / self.total_energy()
    }

    /// Speed in cm/ns.
    pub fn speed(&self) -> f64 {
        self.beta() * C_LIGHT
    }
}
