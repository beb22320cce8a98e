//! Shared traits and structures for the explicit and implicit steppers.

use std::fmt;
use std::ops::Add;
use thiserror::Error;

/// Trait implemented by the right-hand side handed to the stepper.
pub trait System<V> {
    /// System of ordinary differential equations.
    fn system(&self, x: f64, y: &V, dy: &mut V);
}

/// Enumeration of the errors that may arise during integration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("Stopped at x = {x}. Need more than {n_step} steps.")]
    MaxNumStepReached { x: f64, n_step: u32 },
    #[error("Stopped at x = {x}. Step size underflow.")]
    StepSizeUnderflow { x: f64 },
    #[error("The problem seems to become stiff at x = {x}.")]
    StiffnessDetected { x: f64 },
    #[error("Stopped at x = {x}. The solution is no longer finite.")]
    NonFiniteState { x: f64 },
    #[error("Stopped at x = {x}. The iteration matrix is repeatedly singular.")]
    SingularMatrix { x: f64 },
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats {
            num_eval: 0,
            accepted_steps: 0,
            rejected_steps: 0,
        }
    }
}

/// Counters of an integration carried out by several steppers in turn.
impl Add for Stats {
    type Output = Stats;

    fn add(self, other: Stats) -> Stats {
        Stats {
            num_eval: self.num_eval + other.num_eval,
            accepted_steps: self.accepted_steps + other.accepted_steps,
            rejected_steps: self.rejected_steps + other.rejected_steps,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        write!(f, "Number of rejected steps: {}", self.rejected_steps)
    }
}
