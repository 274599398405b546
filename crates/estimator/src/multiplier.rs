//! Per-event multiplier policies

// crate modules
use crate::particle::ParticleState;

// external crates
use serde::{Deserialize, Serialize};

/// How the state of a particle scales each raw contribution
///
/// ```rust
/// # use ntally_estimator::{MultiplierPolicy, ParticleState, ParticleType};
/// let state = ParticleState {
///     particle: ParticleType::Electron,
///     energy: 2.0,
///     weight: 0.5,
///     ..Default::default()
/// };
///
/// assert_eq!(MultiplierPolicy::WeightOnly.evaluate(&state), 0.5);
/// assert_eq!(MultiplierPolicy::WeightTimesEnergy.evaluate(&state), 1.0);
/// assert_eq!(MultiplierPolicy::WeightTimesCharge.evaluate(&state), -0.5);
/// ```
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiplierPolicy {
    /// Particle weight
    #[default]
    WeightOnly,
    /// Particle weight times kinetic energy
    WeightTimesEnergy,
    /// Particle weight times the sign of its charge
    WeightTimesCharge,
}

impl MultiplierPolicy {
    /// Multiplier for a given particle state
    pub fn evaluate(&self, state: &ParticleState) -> f64 {
        match self {
            Self::WeightOnly => state.weight,
            Self::WeightTimesEnergy => state.weight * state.energy,
            Self::WeightTimesCharge => state.weight * state.particle.charge_sign(),
        }
    }
}

impl std::fmt::Display for MultiplierPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WeightOnly => "weight",
            Self::WeightTimesEnergy => "weight x energy",
            Self::WeightTimesCharge => "weight x charge",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleType;
    use rstest::rstest;

    #[rstest]
    #[case(ParticleType::Neutron, 0.0)]
    #[case(ParticleType::Photon, 0.0)]
    #[case(ParticleType::Electron, -2.0)]
    #[case(ParticleType::Positron, 2.0)]
    #[case(ParticleType::Alpha, 2.0)]
    fn charge_weighting(#[case] particle: ParticleType, #[case] expected: f64) {
        let state = ParticleState {
            particle,
            weight: 2.0,
            ..Default::default()
        };
        assert_eq!(MultiplierPolicy::WeightTimesCharge.evaluate(&state), expected);
    }

    #[rstest]
    fn default_is_weight() {
        let state = ParticleState {
            weight: 3.0,
            energy: 10.0,
            ..Default::default()
        };
        assert_eq!(MultiplierPolicy::default().evaluate(&state), 3.0);
    }
}
