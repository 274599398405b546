//! Particle types and the state passed in with every event

// crate modules
use crate::error::Error;

// ntally modules
use ntally_utils::f;

// external crates
use serde::{Deserialize, Serialize};

/// Particle types that can be transported and scored
///
/// Numbering follows the common particle designators so that ids read from
/// other codes map directly.
///
/// ```rust
/// # use ntally_estimator::ParticleType;
/// // From the particle symbol
/// assert_eq!(ParticleType::Alpha, ParticleType::try_from("a").unwrap());
///
/// // From the particle number
/// assert_eq!(ParticleType::Alpha, ParticleType::try_from("34").unwrap());
/// assert_eq!(ParticleType::Alpha, ParticleType::try_from(34).unwrap());
///
/// // From the full name
/// assert_eq!(ParticleType::Alpha, ParticleType::try_from("alpha particle").unwrap());
/// ```
///
/// | ID | Name           | Symbol |
/// | -- | -------------- | ------ |
/// | 1  | neutron        | n      |
/// | 2  | photon         | p      |
/// | 3  | electron       | e      |
/// | 8  | positron       | f      |
/// | 9  | proton         | h      |
/// | 31 | deuteron       | d      |
/// | 32 | triton         | t      |
/// | 33 | helion         | s      |
/// | 34 | alpha particle | a      |
#[repr(u8)]
#[derive(
    Debug, Default, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize,
)]
pub enum ParticleType {
    #[default]
    Neutron = 1,
    Photon = 2,
    Electron = 3,
    Positron = 8,
    Proton = 9,
    Deuteron = 31,
    Triton = 32,
    Helion = 33,
    Alpha = 34,
}

impl ParticleType {
    /// An alternative to using `Neutron as u8`
    ///
    /// ```rust
    /// # use ntally_estimator::ParticleType;
    /// assert_eq!(ParticleType::Electron as u8, ParticleType::Electron.id());
    /// ```
    #[inline]
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Sign of the particle charge, zero for neutral particles
    ///
    /// Used by the charge-weighted multiplier policy.
    ///
    /// ```rust
    /// # use ntally_estimator::ParticleType;
    /// assert_eq!(ParticleType::Neutron.charge_sign(), 0.0);
    /// assert_eq!(ParticleType::Electron.charge_sign(), -1.0);
    /// assert_eq!(ParticleType::Alpha.charge_sign(), 1.0);
    /// ```
    pub fn charge_sign(&self) -> f64 {
        match self {
            Self::Neutron | Self::Photon => 0.0,
            Self::Electron => -1.0,
            _ => 1.0,
        }
    }
}

impl std::fmt::Display for ParticleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Neutron => "neutron",
            Self::Photon => "photon",
            Self::Electron => "electron",
            Self::Positron => "positron",
            Self::Proton => "proton",
            Self::Deuteron => "deuteron",
            Self::Triton => "triton",
            Self::Helion => "helion",
            Self::Alpha => "alpha",
        };
        write!(f, "{name}")
    }
}

/// Convert from any valid numerical designator
impl TryFrom<u8> for ParticleType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Neutron),
            2 => Ok(Self::Photon),
            3 => Ok(Self::Electron),
            8 => Ok(Self::Positron),
            9 => Ok(Self::Proton),
            31 => Ok(Self::Deuteron),
            32 => Ok(Self::Triton),
            33 => Ok(Self::Helion),
            34 => Ok(Self::Alpha),
            _ => Err(Error::FailedToInferParticle(f!("{v}"))),
        }
    }
}

/// Convert from any valid designator, number, or name
impl TryFrom<&str> for ParticleType {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let s = s.to_lowercase();

        match s.trim() {
            "1" | "n" | "neutron" => Ok(Self::Neutron),
            "2" | "p" | "photon" => Ok(Self::Photon),
            "3" | "e" | "electron" => Ok(Self::Electron),
            "8" | "f" | "positron" => Ok(Self::Positron),
            "9" | "h" | "proton" => Ok(Self::Proton),
            "31" | "d" | "deuteron" => Ok(Self::Deuteron),
            "32" | "t" | "triton" => Ok(Self::Triton),
            "33" | "s" | "helion" => Ok(Self::Helion),
            "34" | "a" | "alpha" | "alpha particle" => Ok(Self::Alpha),
            _ => Err(Error::FailedToInferParticle(s)),
        }
    }
}

/// Snapshot of a particle at the time of an event
///
/// Everything an estimator needs to bin and weight a contribution. Fields are
/// public so transport codes can fill them directly.
///
/// ```rust
/// # use ntally_estimator::{ParticleState, ParticleType};
/// let state = ParticleState {
///     particle: ParticleType::Photon,
///     energy: 2.0,
///     weight: 0.5,
///     ..Default::default()
/// };
///
/// assert_eq!(state.direction, [0.0, 0.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    /// Type of the particle
    pub particle: ParticleType,
    /// Position at the event
    pub position: [f64; 3],
    /// Unit direction of flight
    pub direction: [f64; 3],
    /// Kinetic energy
    pub energy: f64,
    /// Time since the start of the history
    pub time: f64,
    /// Statistical weight
    pub weight: f64,
    /// Number of collisions so far
    pub collision_number: u32,
    /// Energy of the source particle that started the history
    pub source_energy: f64,
}

impl Default for ParticleState {
    fn default() -> Self {
        Self {
            particle: ParticleType::default(),
            position: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            energy: 1.0,
            time: 0.0,
            weight: 1.0,
            collision_number: 0,
            source_energy: 1.0,
        }
    }
}

impl ParticleState {
    /// Default state for a particle type
    pub fn new(particle: ParticleType) -> Self {
        Self {
            particle,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, ParticleType::Neutron)]
    #[case(2, ParticleType::Photon)]
    #[case(8, ParticleType::Positron)]
    #[case(33, ParticleType::Helion)]
    fn from_id(#[case] id: u8, #[case] expected: ParticleType) {
        assert_eq!(ParticleType::try_from(id).unwrap(), expected);
        assert_eq!(expected.id(), id);
    }

    #[rstest]
    #[case("N")]
    #[case(" neutron ")]
    #[case("1")]
    fn from_str_is_case_insensitive(#[case] s: &str) {
        assert_eq!(ParticleType::try_from(s).unwrap(), ParticleType::Neutron);
    }

    #[rstest]
    fn invalid_identifiers() {
        assert!(ParticleType::try_from(0).is_err());
        assert!(ParticleType::try_from(4).is_err());
        assert!(ParticleType::try_from("muon").is_err());
    }
}
