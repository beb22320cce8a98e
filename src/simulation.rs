//! Integration of the tumour-immune model over the reporting grid.

use crate::dop_shared::IntegrationError;
use crate::dop_shared::Stats;
use crate::dopri5::Dopri5;
use crate::grid::TimeGrid;
use crate::model::{initial_state, Parameters, State, TumourImmune};
use crate::radau5::Radau5;
use crate::trajectory::Trajectory;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enumeration of the errors that may arise when running a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Invalid parameter {name} = {value}. Parameters must be finite and K must be non-zero.")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Invalid initial state: component {index} = {value} is not finite.")]
    InvalidInitialState { index: usize, value: f64 },
    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),
    #[error("Integration did not converge: {0}")]
    Integration(#[from] IntegrationError),
}

/// Tolerances and step control of the steppers.
///
/// `n_stiff`, `beta`, `fac_min` and `fac_max` only concern the explicit stepper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
    /// Maximum number of steps of each stepper before giving up.
    pub n_max: u32,
    /// Stiffness is tested every `n_stiff` accepted steps.
    pub n_stiff: u32,
    pub safety_factor: f64,
    pub beta: f64,
    /// Minimum factor between two successive steps.
    pub fac_min: f64,
    /// Maximum factor between two successive steps.
    pub fac_max: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            n_max: 100000,
            n_stiff: 1000,
            safety_factor: 0.9,
            beta: 0.04,
            fac_min: 0.2,
            fac_max: 10.0,
        }
    }
}

impl SolverSettings {
    /// Checks that the settings describe a usable controller.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |msg: String| -> Result<(), SimulationError> {
            Err(SimulationError::InvalidSettings(msg))
        };

        if !(self.rtol > 0.0 && self.rtol.is_finite()) {
            return invalid(format!("rtol must be positive, got {}", self.rtol));
        }
        if !(self.atol > 0.0 && self.atol.is_finite()) {
            return invalid(format!("atol must be positive, got {}", self.atol));
        }
        if self.n_max == 0 {
            return invalid("n_max must be at least 1".to_string());
        }
        if self.n_stiff == 0 {
            return invalid("n_stiff must be at least 1".to_string());
        }
        if !(self.safety_factor > 0.0 && self.safety_factor < 1.0) {
            return invalid(format!(
                "safety_factor must lie in (0, 1), got {}",
                self.safety_factor
            ));
        }
        if !self.beta.is_finite() {
            return invalid(format!("beta must be finite, got {}", self.beta));
        }
        if !(self.fac_min > 0.0 && self.fac_min <= 1.0 && self.fac_max >= 1.0)
            || !self.fac_max.is_finite()
        {
            return invalid(format!(
                "step factors must satisfy 0 < fac_min <= 1 <= fac_max, got {} and {}",
                self.fac_min, self.fac_max
            ));
        }
        Ok(())
    }
}

/// Checks that every parameter is finite and that the carrying capacity is non-zero.
pub fn validate_parameters(params: &Parameters) -> Result<(), SimulationError> {
    for (name, value) in params.named() {
        if !value.is_finite() {
            return Err(SimulationError::InvalidParameter { name, value });
        }
    }
    if params.k == 0.0 {
        return Err(SimulationError::InvalidParameter {
            name: "K",
            value: params.k,
        });
    }
    Ok(())
}

/// Runs the model from a fixed initial condition over a fixed grid.
///
/// A simulator holds no mutable state; one instance can serve any number of runs, from any number
/// of threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Simulator {
    settings: SolverSettings,
    grid: TimeGrid,
}

impl Simulator {
    /// Creates a simulator reporting on the default grid, 1000 points over `[0, 100]`.
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            settings,
            grid: TimeGrid::default(),
        }
    }

    /// Replaces the reporting grid.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Integrates the model from [`INITIAL_STATE`](crate::model::INITIAL_STATE).
    pub fn run(&self, params: &Parameters) -> Result<Trajectory, SimulationError> {
        self.run_from(initial_state(), params)
    }

    /// Integrates the model from the given initial state.
    ///
    /// The first row of the returned trajectory is `initial`, unchanged. On failure no
    /// trajectory is returned.
    pub fn run_from(
        &self,
        initial: State,
        params: &Parameters,
    ) -> Result<Trajectory, SimulationError> {
        self.settings.validate()?;
        validate_parameters(params)?;
        if let Some((index, value)) = initial.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SimulationError::InvalidInitialState {
                index,
                value: *value,
            });
        }

        debug!(
            "simulating over [{}, {}] ({} points) with {:?}",
            self.grid.start(),
            self.grid.end(),
            self.grid.len(),
            params
        );

        let settings = &self.settings;
        let mut stepper = Dopri5::from_param(
            TumourImmune::new(*params),
            self.grid.start(),
            self.grid.end(),
            self.grid.points().to_vec(),
            initial,
            settings.rtol,
            settings.atol,
            settings.safety_factor,
            settings.beta,
            settings.fac_min,
            settings.fac_max,
            self.grid.end() - self.grid.start(),
            0.0,
            settings.n_max,
            settings.n_stiff,
        );

        let (times, states, stats) = match stepper.integrate() {
            Ok(stats) => {
                let (times, states) = stepper.into_output();
                (times, states, stats)
            }
            Err(IntegrationError::StiffnessDetected { x }) => {
                info!(
                    "stiffness detected at t = {}, switching to the implicit stepper",
                    x
                );
                self.finish_implicit(stepper, params)?
            }
            Err(e) => {
                warn!("integration failed: {}", e);
                return Err(e.into());
            }
        };
        debug!(
            "integration finished: {} evaluations, {} accepted and {} rejected steps",
            stats.num_eval, stats.accepted_steps, stats.rejected_steps
        );

        Ok(Trajectory::new(times, states, stats))
    }

    /// Integrates the rest of the grid with the Radau IIA stepper, starting from the last step
    /// accepted by the explicit one.
    fn finish_implicit(
        &self,
        explicit: Dopri5<State, TumourImmune>,
        params: &Parameters,
    ) -> Result<(Vec<f64>, Vec<State>, Stats), SimulationError> {
        let settings = &self.settings;
        let mut stepper = Radau5::from_param(
            TumourImmune::new(*params),
            explicit.x(),
            self.grid.end(),
            explicit.pending_output().to_vec(),
            *explicit.y(),
            settings.rtol,
            settings.atol,
            settings.safety_factor,
            self.grid.end() - self.grid.start(),
            explicit.step_size(),
            settings.n_max,
        );
        let stats = stepper.integrate().map_err(|e| {
            warn!("integration failed: {}", e);
            SimulationError::from(e)
        })?;

        let stats = explicit.stats() + stats;
        let (mut times, mut states) = explicit.into_output();
        let (implicit_times, implicit_states) = stepper.into_output();
        times.extend(implicit_times);
        states.extend(implicit_states);
        Ok((times, states, stats))
    }
}

/// Runs the default simulator with the given parameters.
pub fn simulate(params: &Parameters) -> Result<Trajectory, SimulationError> {
    Simulator::default().run(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert_eq!(SolverSettings::default().validate(), Ok(()));
    }

    #[test]
    fn partial_settings_keep_defaults() {
        use serde::de::{value::Error, IntoDeserializer};
        use std::collections::HashMap;

        let mut doc = HashMap::new();
        doc.insert("rtol", 1e-6);
        let settings: Result<SolverSettings, Error> =
            SolverSettings::deserialize(doc.into_deserializer());
        let settings = settings.unwrap();
        assert_eq!(settings.rtol, 1e-6);
        assert_eq!(settings.atol, 1.49012e-8);
        assert_eq!(settings.n_max, 100000);
    }

    #[test]
    fn rejects_bad_settings() {
        let cases = [
            SolverSettings {
                rtol: 0.0,
                ..SolverSettings::default()
            },
            SolverSettings {
                atol: f64::NAN,
                ..SolverSettings::default()
            },
            SolverSettings {
                n_max: 0,
                ..SolverSettings::default()
            },
            SolverSettings {
                n_stiff: 0,
                ..SolverSettings::default()
            },
            SolverSettings {
                safety_factor: 1.5,
                ..SolverSettings::default()
            },
            SolverSettings {
                fac_min: 2.0,
                ..SolverSettings::default()
            },
            SolverSettings {
                fac_max: 0.5,
                ..SolverSettings::default()
            },
        ];
        for settings in cases.iter() {
            assert!(
                matches!(
                    settings.validate(),
                    Err(SimulationError::InvalidSettings(_))
                ),
                "{:?} should be rejected",
                settings
            );
        }
    }

    #[test]
    fn parameter_validation() {
        assert_eq!(validate_parameters(&Parameters::default()), Ok(()));

        let negative = Parameters {
            r_c: -0.3,
            s: 0.0,
            ..Parameters::default()
        };
        assert_eq!(validate_parameters(&negative), Ok(()));

        let nan = Parameters {
            k_ct: f64::NAN,
            ..Parameters::default()
        };
        assert!(matches!(
            validate_parameters(&nan),
            Err(SimulationError::InvalidParameter { name: "kCT", .. })
        ));

        let infinite = Parameters {
            d_c: f64::NEG_INFINITY,
            ..Parameters::default()
        };
        assert!(matches!(
            validate_parameters(&infinite),
            Err(SimulationError::InvalidParameter { name: "dC", .. })
        ));

        let zero_capacity = Parameters {
            k: 0.0,
            ..Parameters::default()
        };
        assert_eq!(
            validate_parameters(&zero_capacity),
            Err(SimulationError::InvalidParameter {
                name: "K",
                value: 0.0
            })
        );
    }

    #[test]
    fn invalid_settings_stop_before_integration() {
        let simulator = Simulator::new(SolverSettings {
            n_max: 0,
            ..SolverSettings::default()
        });
        assert!(matches!(
            simulator.run(&Parameters::default()),
            Err(SimulationError::InvalidSettings(_))
        ));
    }

    #[test]
    fn non_finite_initial_state_is_rejected() {
        let mut initial = initial_state();
        initial[2] = f64::INFINITY;
        let err = Simulator::default()
            .run_from(initial, &Parameters::default())
            .unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidInitialState {
                index: 2,
                value: f64::INFINITY
            }
        );
    }

    #[test]
    fn custom_grid_is_reported_exactly() {
        let grid = TimeGrid::linspace(0.0, 10.0, 11).unwrap();
        let trajectory = Simulator::default()
            .with_grid(grid.clone())
            .run(&Parameters::default())
            .unwrap();
        assert_eq!(trajectory.times(), grid.points());
        assert_eq!(trajectory.len(), 11);
    }

    #[test]
    fn step_ceiling_surfaces_as_integration_error() {
        let simulator = Simulator::new(SolverSettings {
            n_max: 5,
            ..SolverSettings::default()
        });
        assert!(matches!(
            simulator.run(&Parameters::default()),
            Err(SimulationError::Integration(
                IntegrationError::MaxNumStepReached { .. }
            ))
        ));
    }
}
