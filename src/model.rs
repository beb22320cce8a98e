//! Five-compartment model of tumour-immune dynamics.
//!
//! The state is ordered `(C, H, IL, T, S)`:
//!
//! * `C`  - cytotoxic T lymphocytes (CTL)
//! * `H`  - helper T cells
//! * `IL` - interleukin-2 concentration
//! * `T`  - tumour cells
//! * `S`  - immune suppression factor
//!
//! The equations are
//!
//! ```text
//! dC/dt  = rC * C * (1 - T/K) * (1 - S) - dC * C
//! dH/dt  = rH * H
//! dIL/dt = kIL * H
//! dT/dt  = -kCT * C * T
//! dS/dt  = s * T
//! ```

use crate::dop_shared::System;
use crate::Vector5;
use serde::{Deserialize, Serialize};

/// State vector `(C, H, IL, T, S)`.
pub type State = Vector5<f64>;

/// Initial condition used by every simulation.
pub const INITIAL_STATE: [f64; 5] = [50.0, 10.0, 0.0, 1000.0, 0.0];

/// Returns [`INITIAL_STATE`] as a state vector.
pub fn initial_state() -> State {
    State::from(INITIAL_STATE)
}

/// Rate parameters of the model.
///
/// Any finite value is accepted here, including zero and negative rates. Finiteness and a
/// non-zero carrying capacity are checked by the simulator before integrating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// CTL proliferation rate.
    #[serde(rename = "rC")]
    pub r_c: f64,
    /// CTL death rate.
    #[serde(rename = "dC")]
    pub d_c: f64,
    /// Helper T cell growth rate.
    #[serde(rename = "rH")]
    pub r_h: f64,
    /// IL-2 production rate per helper cell.
    #[serde(rename = "kIL")]
    pub k_il: f64,
    /// Tumour kill rate per CTL.
    #[serde(rename = "kCT")]
    pub k_ct: f64,
    /// Suppression accumulation rate per tumour cell.
    pub s: f64,
    /// Tumour carrying capacity.
    #[serde(rename = "K")]
    pub k: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            r_c: 0.1,
            d_c: 0.05,
            r_h: 0.05,
            k_il: 0.1,
            k_ct: 0.01,
            s: 0.01,
            k: 1000.0,
        }
    }
}

impl Parameters {
    /// Parameter values paired with their conventional names, in declaration order.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("rC", self.r_c),
            ("dC", self.d_c),
            ("rH", self.r_h),
            ("kIL", self.k_il),
            ("kCT", self.k_ct),
            ("s", self.s),
            ("K", self.k),
        ]
    }
}

/// Right-hand side of the model.
pub fn derivatives(y: &State, p: &Parameters) -> State {
    let (c, h, t, s) = (y[0], y[1], y[3], y[4]);
    State::new(
        p.r_c * c * (1.0 - t / p.k) * (1.0 - s) - p.d_c * c,
        p.r_h * h,
        p.k_il * h,
        -p.k_ct * c * t,
        p.s * t,
    )
}

/// The model bound to a parameter set, ready to be handed to the stepper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TumourImmune {
    params: Parameters,
}

impl TumourImmune {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }
}

impl System<State> for TumourImmune {
    // Autonomous, the time is not used
    fn system(&self, _t: f64, y: &State, dy: &mut State) {
        *dy = derivatives(y, &self.params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_documented_values() {
        let p = Parameters::default();
        assert_eq!(
            p.named(),
            [
                ("rC", 0.1),
                ("dC", 0.05),
                ("rH", 0.05),
                ("kIL", 0.1),
                ("kCT", 0.01),
                ("s", 0.01),
                ("K", 1000.0),
            ]
        );
    }

    #[test]
    fn partial_documents_keep_defaults() {
        use serde::de::{value::Error, IntoDeserializer};
        use std::collections::HashMap;

        let mut doc = HashMap::new();
        doc.insert("kCT", 0.02);
        doc.insert("K", 1500.0);
        let p: Result<Parameters, Error> = Parameters::deserialize(doc.into_deserializer());
        let p = p.unwrap();
        assert_eq!(p.k_ct, 0.02);
        assert_eq!(p.k, 1500.0);
        assert_eq!(p.r_c, 0.1);
        assert_eq!(p.s, 0.01);
    }

    #[test]
    fn derivatives_at_initial_state() {
        let dy = derivatives(&initial_state(), &Parameters::default());
        // T = K cancels CTL proliferation, only death remains
        assert_relative_eq!(dy[0], -2.5, epsilon = 1e-12);
        assert_relative_eq!(dy[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(dy[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dy[3], -500.0, epsilon = 1e-12);
        assert_relative_eq!(dy[4], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn suppression_above_one_reverses_ctl_growth() {
        let p = Parameters::default();
        let y = State::new(10.0, 1.0, 0.0, 0.0, 2.0);
        let dy = derivatives(&y, &p);
        // rC * C * 1 * (1 - 2) - dC * C
        assert_relative_eq!(dy[0], -1.0 - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn negative_states_are_not_clamped() {
        let p = Parameters::default();
        let y = State::new(-5.0, -2.0, 0.0, -10.0, 0.0);
        let dy = derivatives(&y, &p);
        assert!(dy[1] < 0.0);
        assert!(dy[2] < 0.0);
        assert!(dy[3] < 0.0);
        assert!(dy[4] < 0.0);
    }

    #[test]
    fn system_ignores_time() {
        let model = TumourImmune::new(Parameters::default());
        let y = State::new(12.0, 3.0, 1.0, 400.0, 0.3);
        let mut dy_early = State::zeros();
        let mut dy_late = State::zeros();
        model.system(0.0, &y, &mut dy_early);
        model.system(73.5, &y, &mut dy_late);
        assert_eq!(dy_early, dy_late);
        assert_eq!(dy_early, derivatives(&y, model.params()));
    }

    #[test]
    fn zero_capacity_yields_non_finite_derivative() {
        let p = Parameters {
            k: 0.0,
            ..Parameters::default()
        };
        let dy = derivatives(&initial_state(), &p);
        assert!(!dy[0].is_finite());
    }
}
