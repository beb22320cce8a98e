//! Output time grid.

use thiserror::Error;

/// Start of the default simulation horizon.
pub const DEFAULT_START: f64 = 0.0;
/// End of the default simulation horizon.
pub const DEFAULT_END: f64 = 100.0;
/// Number of reported points on the default grid.
pub const DEFAULT_POINTS: usize = 1000;

/// Enumeration of the errors raised when building a grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeGridError {
    #[error("A time grid needs at least 2 points, got {0}.")]
    TooFewPoints(usize),
    #[error("Invalid grid bounds [{start}, {end}]. Bounds must be finite with start < end.")]
    InvalidBounds { start: f64, end: f64 },
}

/// Equally spaced, strictly increasing times at which a trajectory is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    /// Builds `n` equally spaced points over the closed interval `[start, end]`.
    ///
    /// Point `i` is `start + i * (end - start) / (n - 1)`; the last point is exactly `end`.
    pub fn linspace(start: f64, end: f64, n: usize) -> Result<Self, TimeGridError> {
        if n < 2 {
            return Err(TimeGridError::TooFewPoints(n));
        }
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(TimeGridError::InvalidBounds { start, end });
        }
        Ok(Self::linspace_unchecked(start, end, n))
    }

    fn linspace_unchecked(start: f64, end: f64, n: usize) -> Self {
        let step = (end - start) / (n - 1) as f64;
        let mut points: Vec<f64> = (0..n).map(|i| i as f64 * step + start).collect();
        points[n - 1] = end;
        Self { points }
    }

    /// First time of the grid.
    pub fn start(&self) -> f64 {
        self.points[0]
    }

    /// Last time of the grid.
    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false, a grid holds at least two points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }
}

impl Default for TimeGrid {
    /// 1000 points over `[0, 100]`.
    fn default() -> Self {
        Self::linspace_unchecked(DEFAULT_START, DEFAULT_END, DEFAULT_POINTS)
    }
}
