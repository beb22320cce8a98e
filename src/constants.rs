//! Numerical constants of the explicit and implicit steppers.

/// Stiffness detection thresholds
pub mod stiffness {
    /// Stiffness threshold for DOPRI5
    /// Based on Hairer & Wanner, "Solving Ordinary Differential Equations II"
    pub const DOPRI5_THRESHOLD: f64 = 3.25;

    /// Maximum consecutive stiffness detections before error
    pub const MAX_STIFF_ITERATIONS: u32 = 15;

    /// Number of non-stiff steps needed to reset stiffness counter
    pub const NON_STIFF_RESET_COUNT: u32 = 6;
}

/// Initial step size computation constants
pub mod initial_step {
    /// Minimum squared norm below which the heuristic estimate is skipped
    pub const MIN_TOLERANCE: f64 = 1.0e-10;

    /// Default initial step when tolerance conditions not met
    pub const DEFAULT_INITIAL_STEP: f64 = 1.0e-6;

    /// Safety factor for initial step estimation
    pub const SAFETY_FACTOR: f64 = 0.01;
}

/// Step size control constants
pub mod step_control {
    /// Lower bound stored for the previous error in the PI controller
    pub const MIN_ERROR_MEMORY: f64 = 1.0e-4;

    /// Exponent weight relating alpha and beta of the PI controller: alpha = 0.2 - beta * 0.75
    pub const ALPHA_BETA_RATIO: f64 = 0.75;
}

/// Simplified Newton iteration and step control of the Radau IIA stepper
pub mod implicit {
    /// Maximum number of Newton iterations per step
    pub const MAX_NEWTON_ITERATIONS: usize = 7;

    /// Contraction rate above which the Newton iteration is considered divergent
    pub const MAX_CONTRACTION: f64 = 0.99;

    /// Lower bound of h / h_new
    pub const FAC_RIGHT: f64 = 0.125;

    /// Upper bound of h / h_new
    pub const FAC_LEFT: f64 = 5.0;

    /// Lower bound of the error kept for the predictive controller
    pub const MIN_ERROR_MEMORY: f64 = 1.0e-2;

    /// Consecutive singular iteration matrices before giving up
    pub const MAX_SINGULAR: u32 = 5;
}
