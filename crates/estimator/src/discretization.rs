//! Multi-dimensional phase-space binning
//!
//! A [PhaseSpaceDiscretization] is an ordered list of dimensions with their
//! bin structure. The flat bin index is mixed radix in configuration order:
//! the first configured dimension is the least significant with a stride of
//! 1, and each later dimension strides over the product of the earlier bin
//! counts.

// crate modules
use crate::error::{Error, Result};
use crate::particle::ParticleState;
use crate::pqla;

// ntally modules
use ntally_utils::{f, SliceExt, ValueExt};

// external crates
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

/// Phase-space dimensions that can be binned
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseSpaceDimension {
    /// Kinetic energy of the particle
    Energy,
    /// Time of the event
    Time,
    /// Angle cosine supplied with the event
    Cosine,
    /// Energy of the source particle
    SourceEnergy,
    /// Number of collisions undergone
    CollisionNumber,
    /// Direction of flight on a PQLA quadrature
    Direction,
}

impl PhaseSpaceDimension {
    /// Dimensions binned on real-valued boundaries
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            Self::Energy | Self::Time | Self::Cosine | Self::SourceEnergy
        )
    }
}

impl std::fmt::Display for PhaseSpaceDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Energy => "Energy",
            Self::Time => "Time",
            Self::Cosine => "Cosine",
            Self::SourceEnergy => "Source Energy",
            Self::CollisionNumber => "Collision Number",
            Self::Direction => "Direction",
        };
        write!(f, "{name}")
    }
}

/// Bin structure of a single dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DimensionDiscretization {
    /// Bin boundaries, `[b0, b1]` then `(b_i, b_i+1]`
    Continuous(Vec<f64>),
    /// Inclusive upper limits, the last bin takes every larger value
    CollisionNumber(Vec<u32>),
    /// PQLA direction bins of a given order
    Direction { order: u32, forward: bool },
}

impl DimensionDiscretization {
    /// Number of bins described
    pub fn number_of_bins(&self) -> usize {
        match self {
            Self::Continuous(boundaries) => boundaries.len().saturating_sub(1),
            Self::CollisionNumber(limits) => limits.len(),
            Self::Direction { order, .. } => pqla::number_of_bins(*order),
        }
    }

    fn validate(&self, dimension: PhaseSpaceDimension) -> Result<()> {
        let fail = |reason: &str| {
            Err(Error::InvalidBoundaries {
                dimension,
                reason: reason.to_string(),
            })
        };

        match (self, dimension) {
            (Self::Continuous(boundaries), d) if d.is_continuous() => {
                if boundaries.len() < 2 {
                    return fail("at least two boundaries are required");
                }
                if !boundaries.is_strictly_increasing() {
                    return fail("boundaries must be finite and strictly increasing");
                }
                let (lower, upper) = (boundaries[0], boundaries[boundaries.len() - 1]);
                if d == PhaseSpaceDimension::Cosine && (lower < -1.0 || upper > 1.0) {
                    return fail(&f!(
                        "cosine boundaries [{}, {}] must lie in [-1, 1]",
                        lower.sci(3, 2),
                        upper.sci(3, 2)
                    ));
                }
                if d != PhaseSpaceDimension::Cosine && lower < 0.0 {
                    return fail(&f!("lower boundary {} is negative", lower.sci(3, 2)));
                }
            }
            (Self::CollisionNumber(limits), PhaseSpaceDimension::CollisionNumber) => {
                if limits.is_empty() {
                    return fail("at least one collision number limit is required");
                }
                if !limits.windows(2).all(|w| w[0] < w[1]) {
                    return fail("limits must be strictly increasing");
                }
            }
            (Self::Direction { order, .. }, PhaseSpaceDimension::Direction) => {
                if *order == 0 {
                    return fail("quadrature order must be at least 1");
                }
            }
            _ => return fail("bin type does not match the dimension"),
        }

        Ok(())
    }

    fn bin_index(&self, dimension: PhaseSpaceDimension, point: &PhaseSpacePoint) -> Option<usize> {
        match self {
            Self::Continuous(boundaries) => {
                let value = point.continuous_value(dimension)?;
                boundaries.find_bin_inclusive(value).ok()
            }
            Self::CollisionNumber(limits) => {
                let value = point.state.collision_number;
                let bin = limits.partition_point(|l| *l < value);
                Some(bin.min(limits.len() - 1))
            }
            Self::Direction { order, forward } => {
                let mut direction = point.state.direction;
                if !forward {
                    direction = direction.map(|d| -d);
                }
                pqla::bin_index(direction, *order)
            }
        }
    }

    fn bin_description(&self, bin: usize) -> String {
        match self {
            Self::Continuous(boundaries) => {
                let open = if bin == 0 { '[' } else { '(' };
                f!("{open}{}, {}]", boundaries[bin], boundaries[bin + 1])
            }
            Self::CollisionNumber(limits) => {
                let lower = match bin {
                    0 => 0,
                    _ => limits[bin - 1].saturating_add(1),
                };
                if bin + 1 == limits.len() {
                    f!("[{lower}, max]")
                } else {
                    f!("[{lower}, {}]", limits[bin])
                }
            }
            Self::Direction { order, forward } => {
                let (octant, triangle) = pqla::describe(bin, *order);
                let sense = if *forward { "" } else { " (reversed)" };
                f!("octant {octant} triangle {triangle}{sense}")
            }
        }
    }
}

/// Phase-space coordinates of an event
///
/// Wraps the particle state along with values that only exist for specific
/// events, such as the angle cosine on a surface crossing.
#[derive(Debug, Clone, Copy)]
pub struct PhaseSpacePoint<'a> {
    state: &'a ParticleState,
    cosine: Option<f64>,
}

impl<'a> PhaseSpacePoint<'a> {
    /// Point taken entirely from the particle state
    pub fn new(state: &'a ParticleState) -> Self {
        Self {
            state,
            cosine: None,
        }
    }

    /// Point with an event-supplied angle cosine
    pub fn with_cosine(state: &'a ParticleState, cosine: f64) -> Self {
        Self {
            state,
            cosine: Some(cosine),
        }
    }

    /// Underlying particle state
    pub fn state(&self) -> &'a ParticleState {
        self.state
    }

    fn continuous_value(&self, dimension: PhaseSpaceDimension) -> Option<f64> {
        match dimension {
            PhaseSpaceDimension::Energy => Some(self.state.energy),
            PhaseSpaceDimension::Time => Some(self.state.time),
            PhaseSpaceDimension::SourceEnergy => Some(self.state.source_energy),
            PhaseSpaceDimension::Cosine => self.cosine,
            _ => None,
        }
    }
}

/// Ordered set of binned dimensions
///
/// ```rust
/// # use ntally_estimator::*;
/// let mut discretization = PhaseSpaceDiscretization::default();
/// discretization
///     .set_discretization(
///         PhaseSpaceDimension::Energy,
///         DimensionDiscretization::Continuous(vec![0.0, 0.1, 1.0]),
///     )
///     .unwrap();
/// discretization
///     .set_discretization(
///         PhaseSpaceDimension::CollisionNumber,
///         DimensionDiscretization::CollisionNumber(vec![0, 1]),
///     )
///     .unwrap();
///
/// assert_eq!(discretization.total_number_of_bins(), 4);
///
/// // energy is the least significant dimension
/// let state = ParticleState { energy: 0.5, collision_number: 3, ..Default::default() };
/// let point = PhaseSpacePoint::new(&state);
/// assert_eq!(discretization.calculate_bin_index(&point), Some(3));
///
/// assert_eq!(
///     discretization.bin_name(3),
///     "Energy Bin: (0.1, 1], Collision Number Bin: [1, max]"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DimensionList", into = "DimensionList")]
pub struct PhaseSpaceDiscretization {
    dimensions: Vec<(PhaseSpaceDimension, DimensionDiscretization)>,
    strides: Vec<usize>,
}

impl PhaseSpaceDiscretization {
    /// Set the bins of a dimension
    ///
    /// A dimension that is already binned is replaced in place, keeping its
    /// position in the ordering.
    pub fn set_discretization(
        &mut self,
        dimension: PhaseSpaceDimension,
        discretization: DimensionDiscretization,
    ) -> Result<()> {
        discretization.validate(dimension)?;
        debug!(
            "{dimension} discretization set with {} bins",
            discretization.number_of_bins()
        );

        match self.dimensions.iter_mut().find(|(d, _)| *d == dimension) {
            Some((_, existing)) => *existing = discretization,
            None => self.dimensions.push((dimension, discretization)),
        }

        self.update_strides();
        Ok(())
    }

    fn update_strides(&mut self) {
        self.strides = self
            .dimensions
            .iter()
            .scan(1, |stride, (_, d)| {
                let current = *stride;
                *stride *= d.number_of_bins();
                Some(current)
            })
            .collect();
    }

    /// Binned dimensions in configuration order
    pub fn discretized_dimensions(&self) -> Vec<PhaseSpaceDimension> {
        self.dimensions.iter().map(|(d, _)| *d).collect()
    }

    /// Bin structure of a dimension, if it is binned
    pub fn discretization(&self, dimension: PhaseSpaceDimension) -> Option<&DimensionDiscretization> {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, discretization)| discretization)
    }

    /// Number of bins of one dimension, 1 if it is not binned
    pub fn number_of_bins(&self, dimension: PhaseSpaceDimension) -> usize {
        self.discretization(dimension)
            .map_or(1, DimensionDiscretization::number_of_bins)
    }

    /// Product of the bin counts of every dimension
    pub fn total_number_of_bins(&self) -> usize {
        self.dimensions
            .iter()
            .map(|(_, d)| d.number_of_bins())
            .product()
    }

    /// Flat bin index of a point
    ///
    /// `None` if any binned dimension cannot place the point, which means the
    /// event is outside of the tallied phase space.
    pub fn calculate_bin_index(&self, point: &PhaseSpacePoint) -> Option<usize> {
        self.dimensions
            .iter()
            .zip(self.strides.iter())
            .try_fold(0, |index, ((dimension, discretization), stride)| {
                discretization
                    .bin_index(*dimension, point)
                    .map(|bin| index + bin * stride)
            })
    }

    /// Human-readable description of a flat bin
    pub fn bin_name(&self, bin: usize) -> String {
        if self.dimensions.is_empty() {
            return "Total Bin".to_string();
        }

        self.dimensions
            .iter()
            .zip(self.strides.iter())
            .map(|((dimension, discretization), stride)| {
                let local = (bin / stride) % discretization.number_of_bins();
                f!("{dimension} Bin: {}", discretization.bin_description(local))
            })
            .join(", ")
    }
}

/// Ordered dimensions used to validate deserialised discretizations
#[derive(Serialize, Deserialize)]
struct DimensionList(Vec<(PhaseSpaceDimension, DimensionDiscretization)>);

impl TryFrom<DimensionList> for PhaseSpaceDiscretization {
    type Error = Error;

    fn try_from(raw: DimensionList) -> Result<Self> {
        let mut discretization = Self::default();
        for (dimension, bins) in raw.0 {
            if discretization.discretization(dimension).is_some() {
                return Err(Error::InvalidBoundaries {
                    dimension,
                    reason: "dimension is binned more than once".to_string(),
                });
            }
            discretization.set_discretization(dimension, bins)?;
        }
        Ok(discretization)
    }
}

impl From<PhaseSpaceDiscretization> for DimensionList {
    fn from(discretization: PhaseSpaceDiscretization) -> Self {
        Self(discretization.dimensions)
    }
}
