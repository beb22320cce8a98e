//! # Tumour-immune dynamics
//! `tumour_immune` simulates a five-compartment ODE model of cytotoxic T cells, helper T cells,
//! interleukin-2, tumour cells and an immune suppression factor.
//!
//! The model is integrated over `[0, 100]` from the fixed initial condition `(50, 10, 0, 1000, 0)`
//! with an explicit Runge-Kutta method of order 5(4) (Dormand-Prince), and the solution is reported
//! at 1000 equally spaced times. When the explicit method detects stiffness, the integration
//! carries on from the last accepted step with the implicit Radau IIA method of order 5.
//!
//! ```no_run
//! use tumour_immune::{simulate, Compartment, Parameters};
//!
//! let trajectory = simulate(&Parameters::default()).unwrap();
//! let tumour = trajectory.column(Compartment::Tumour);
//! println!("tumour cells at t = 100: {}", tumour[tumour.len() - 1]);
//! ```

// Re-export from external crate
use nalgebra as na;
pub use crate::na::{OVector, Vector1, Vector5};

// Declare modules
pub mod butcher_tableau;
pub mod chart;
pub mod constants;
pub mod controller;
pub mod dop_shared;
pub mod dopri5;
pub mod form;
pub mod grid;
pub mod model;
pub mod radau5;
pub mod simulation;
pub mod trajectory;

pub use dopri5::Dopri5;
pub use radau5::Radau5;

pub use dop_shared::{IntegrationError, Stats, System};
pub use form::{FormError, ParameterForm};
pub use grid::{TimeGrid, TimeGridError};
pub use model::{derivatives, initial_state, Parameters, State, TumourImmune, INITIAL_STATE};
pub use simulation::{simulate, SimulationError, Simulator, SolverSettings};
pub use trajectory::{Compartment, Trajectory};
