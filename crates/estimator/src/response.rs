//! Response functions applied on top of the multiplier

// crate modules
use crate::error::{Error, Result};
use crate::particle::ParticleState;

// ntally modules
use ntally_utils::SliceExt;

// external crates
use serde::{Deserialize, Serialize};

/// Named function of the particle state that weights every contribution
///
/// Every estimator has at least one response. Each response gets its own set
/// of moments, so that several quantities can share one phase-space
/// histogram.
///
/// ```rust
/// # use ntally_estimator::{ParticleState, ResponseFunction};
/// let response = ResponseFunction::energy_table(
///     "dose",
///     vec![1.0, 2.0, 4.0],
///     vec![10.0, 20.0, 0.0],
/// ).unwrap();
///
/// let state = ParticleState { energy: 1.5, ..Default::default() };
/// assert_eq!(response.evaluate(&state), 15.0);
///
/// // zero outside of the table
/// let state = ParticleState { energy: 5.0, ..Default::default() };
/// assert_eq!(response.evaluate(&state), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResponseDefinition", into = "ResponseDefinition")]
pub struct ResponseFunction {
    name: String,
    kind: ResponseKind,
}

/// Supported response function shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Always 1.0
    Unity,
    /// Fixed value
    Constant(f64),
    /// Lin-lin interpolation on energy, zero outside of the table
    EnergyTable {
        energies: Vec<f64>,
        values: Vec<f64>,
    },
}

impl Default for ResponseFunction {
    fn default() -> Self {
        Self::unity()
    }
}

impl ResponseFunction {
    /// The default response of every estimator
    pub fn unity() -> Self {
        Self {
            name: "default".to_string(),
            kind: ResponseKind::Unity,
        }
    }

    /// Response returning the same value for every state
    pub fn constant(name: &str, value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(invalid(name, "constant must be finite"));
        }

        Ok(Self {
            name: name.to_string(),
            kind: ResponseKind::Constant(value),
        })
    }

    /// Response tabulated on energy
    ///
    /// Energies must be finite and strictly increasing, with one value for
    /// every energy and at least two points.
    pub fn energy_table(name: &str, energies: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if energies.len() < 2 {
            return Err(invalid(name, "at least two table points required"));
        }
        if energies.len() != values.len() {
            return Err(invalid(name, "energy and value lengths differ"));
        }
        if energies.iter().chain(values.iter()).any(|v| !v.is_finite()) {
            return Err(invalid(name, "table contains non-finite entries"));
        }
        if !energies.is_strictly_increasing() {
            return Err(invalid(name, "energies must be strictly increasing"));
        }

        Ok(Self {
            name: name.to_string(),
            kind: ResponseKind::EnergyTable { energies, values },
        })
    }

    /// Name used in bin descriptions and output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the response
    pub fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    /// Response value for a particle state
    pub fn evaluate(&self, state: &ParticleState) -> f64 {
        match &self.kind {
            ResponseKind::Unity => 1.0,
            ResponseKind::Constant(value) => *value,
            ResponseKind::EnergyTable { energies, values } => {
                interpolate(energies, values, state.energy)
            }
        }
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidResponseFunction {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Name and shape used to validate deserialised responses
#[derive(Serialize, Deserialize)]
struct ResponseDefinition {
    name: String,
    kind: ResponseKind,
}

impl TryFrom<ResponseDefinition> for ResponseFunction {
    type Error = Error;

    fn try_from(raw: ResponseDefinition) -> Result<Self> {
        match raw.kind {
            ResponseKind::Unity => Ok(Self {
                name: raw.name,
                kind: ResponseKind::Unity,
            }),
            ResponseKind::Constant(value) => Self::constant(&raw.name, value),
            ResponseKind::EnergyTable { energies, values } => {
                Self::energy_table(&raw.name, energies, values)
            }
        }
    }
}

impl From<ResponseFunction> for ResponseDefinition {
    fn from(response: ResponseFunction) -> Self {
        Self {
            name: response.name,
            kind: response.kind,
        }
    }
}

/// Lin-lin interpolation, zero outside of `[x0, xn]`
fn interpolate(x: &[f64], y: &[f64], value: f64) -> f64 {
    let Ok(i) = x.find_bin_inclusive(value) else {
        return 0.0;
    };
    let fraction = (value - x[i]) / (x[i + 1] - x[i]);
    y[i] + fraction * (y[i + 1] - y[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, 10.0)]
    #[case(2.0, 20.0)]
    #[case(3.0, 10.0)]
    #[case(4.0, 0.0)]
    #[case(0.999, 0.0)]
    #[case(4.001, 0.0)]
    fn table_interpolation(#[case] energy: f64, #[case] expected: f64) {
        let response =
            ResponseFunction::energy_table("test", vec![1.0, 2.0, 4.0], vec![10.0, 20.0, 0.0])
                .unwrap();
        let state = ParticleState {
            energy,
            ..Default::default()
        };
        assert!((response.evaluate(&state) - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(vec![1.0], vec![1.0])]
    #[case(vec![1.0, 2.0], vec![1.0])]
    #[case(vec![2.0, 1.0], vec![1.0, 1.0])]
    #[case(vec![1.0, f64::NAN], vec![1.0, 1.0])]
    fn invalid_tables(#[case] energies: Vec<f64>, #[case] values: Vec<f64>) {
        assert!(matches!(
            ResponseFunction::energy_table("bad", energies, values),
            Err(Error::InvalidResponseFunction { .. })
        ));
    }

    #[rstest]
    #[case(r#"{"name":"short","kind":{"EnergyTable":{"energies":[1.0,2.0],"values":[1.0]}}}"#)]
    #[case(r#"{"name":"reversed","kind":{"EnergyTable":{"energies":[2.0,1.0],"values":[1.0,1.0]}}}"#)]
    #[case(r#"{"name":"single","kind":{"EnergyTable":{"energies":[1.0],"values":[1.0]}}}"#)]
    fn invalid_tables_are_not_loaded(#[case] json: &str) {
        assert!(serde_json::from_str::<ResponseFunction>(json).is_err());
    }

    #[rstest]
    fn valid_tables_are_loaded() {
        let json = r#"{"name":"dose","kind":{"EnergyTable":{"energies":[1.0,2.0],"values":[1.0,3.0]}}}"#;
        let response: ResponseFunction = serde_json::from_str(json).unwrap();
        let state = ParticleState {
            energy: 1.5,
            ..Default::default()
        };
        assert_eq!(response.name(), "dose");
        assert_eq!(response.evaluate(&state), 2.0);
        assert_eq!(serde_json::to_string(&response).unwrap(), json);
    }

    #[rstest]
    fn unity_and_constant() {
        let state = ParticleState::default();
        assert_eq!(ResponseFunction::unity().evaluate(&state), 1.0);
        assert_eq!(ResponseFunction::constant("c", 2.5).unwrap().evaluate(&state), 2.5);
        assert!(ResponseFunction::constant("c", f64::INFINITY).is_err());
    }
}
