//! Explicit Runge-Kutta method with Dormand-Prince coefficients of order 5(4) and dense output of order 4.
//!
//! The stepper reports the solution at a caller-supplied list of output times. Steps are chosen by
//! the PI controller; states between two accepted steps come from the dense output polynomial.

use crate::butcher_tableau::dopri54;
use crate::constants::{initial_step, stiffness, step_control};
use crate::controller::Controller;
use crate::dop_shared::*;

use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};

trait DefaultController {
    fn default(x: f64, x_end: f64) -> Self;
}

impl DefaultController for Controller {
    fn default(x: f64, x_end: f64) -> Self {
        let alpha = 0.2 - 0.04 * step_control::ALPHA_BETA_RATIO;
        Controller::new(alpha, 0.04, 10.0, 0.2, x_end - x, 0.9, sign(1.0, x_end - x))
    }
}

/// Structure containing the parameters for the numerical integration.
pub struct Dopri5<V, F>
where
    F: System<V>,
{
    f: F,
    x: f64,
    x_old: f64,
    x_end: f64,
    y: V,
    rtol: f64,
    atol: f64,
    t_out: Vec<f64>,
    next_out: usize,
    x_out: Vec<f64>,
    y_out: Vec<V>,
    uround: f64,
    h: f64,
    h_old: f64,
    n_max: u32,
    n_stiff: u32,
    controller: Controller,
    rcont: [V; 5],
    stats: Stats,
}

impl<D: Dim, F> Dopri5<OVector<f64, D>, F>
where
    F: System<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `f`       - Structure implementing the System<V> trait
    /// * `x`       - Initial value of the independent variable (usually time)
    /// * `x_end`   - Final value of the independent variable
    /// * `t_out`   - Times at which the solution is reported, in the direction of integration.
    ///               Times outside of `[x, x_end]` are ignored
    /// * `y`       - Initial value of the dependent variable(s)
    /// * `rtol`    - Relative tolerance used in the computation of the adaptive step size
    /// * `atol`    - Absolute tolerance used in the computation of the adaptive step size
    ///
    pub fn new(
        f: F,
        x: f64,
        x_end: f64,
        t_out: Vec<f64>,
        y: OVector<f64, D>,
        rtol: f64,
        atol: f64,
    ) -> Self {
        let controller = Controller::default(x, x_end);
        Self::build(f, x, x_end, t_out, y, rtol, atol, 0.0, 100000, 1000, controller)
    }

    /// Advanced initializer for the structure.
    ///
    /// # Arguments
    ///
    /// * `f`       - Structure implementing the System<V> trait
    /// * `x`       - Initial value of the independent variable (usually time)
    /// * `x_end`   - Final value of the independent variable
    /// * `t_out`   - Times at which the solution is reported
    /// * `y`       - Initial value of the dependent variable(s)
    /// * `rtol`    - Relative tolerance used in the computation of the adaptive step size
    /// * `atol`    - Absolute tolerance used in the computation of the adaptive step size
    /// * `safety_factor`   - Safety factor used in the computation of the adaptive step size
    /// * `beta`    - Value of the beta coefficient of the PI controller. Default is 0.04
    /// * `fac_min` - Minimum factor between two successive steps. Default is 0.2
    /// * `fac_max` - Maximum factor between two successive steps. Default is 10.0
    /// * `h_max`   - Maximum step size. Default is `x_end-x`
    /// * `h`       - Initial value of the step size. If h = 0.0, the intial value of h is computed automatically
    /// * `n_max`   - Maximum number of iterations. Default is 100000
    /// * `n_stiff` - Stifness is tested when the number of iterations is a multiple of n_stiff. Default is 1000
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn from_param(
        f: F,
        x: f64,
        x_end: f64,
        t_out: Vec<f64>,
        y: OVector<f64, D>,
        rtol: f64,
        atol: f64,
        safety_factor: f64,
        beta: f64,
        fac_min: f64,
        fac_max: f64,
        h_max: f64,
        h: f64,
        n_max: u32,
        n_stiff: u32,
    ) -> Self {
        let alpha = 0.2 - beta * step_control::ALPHA_BETA_RATIO;
        let controller = Controller::new(
            alpha,
            beta,
            fac_max,
            fac_min,
            h_max,
            safety_factor,
            sign(1.0, x_end - x),
        );
        Self::build(f, x, x_end, t_out, y, rtol, atol, h, n_max, n_stiff, controller)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        f: F,
        x: f64,
        x_end: f64,
        mut t_out: Vec<f64>,
        y: OVector<f64, D>,
        rtol: f64,
        atol: f64,
        h: f64,
        n_max: u32,
        n_stiff: u32,
        controller: Controller,
    ) -> Self {
        let posneg = sign(1.0, x_end - x);
        t_out.retain(|t| (t - x) * posneg >= 0.0 && (t - x_end) * posneg <= 0.0);
        let (rows, cols) = y.shape_generic();
        Self {
            f,
            x,
            x_old: x,
            x_end,
            y,
            rtol,
            atol,
            x_out: Vec::with_capacity(t_out.len()),
            y_out: Vec::with_capacity(t_out.len()),
            t_out,
            next_out: 0,
            uround: f64::EPSILON,
            h,
            h_old: 0.0,
            n_max,
            n_stiff,
            controller,
            rcont: [
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
                OVector::zeros_generic(rows, cols),
            ],
            stats: Stats::new(),
        }
    }

    /// Compute the initial stepsize
    fn hinit(&self) -> f64 {
        let (rows, cols) = self.y.shape_generic();
        let mut f0 = OVector::zeros_generic(rows, cols);
        self.f.system(self.x, &self.y, &mut f0);
        let posneg = sign(1.0, self.x_end - self.x);

        // Compute the norm of y0 and f0
        let dim = rows.value();
        let mut d0 = 0.0;
        let mut d1 = 0.0;
        for i in 0..dim {
            let sci = self.atol + self.y[i].abs() * self.rtol;
            d0 += (self.y[i] / sci) * (self.y[i] / sci);
            d1 += (f0[i] / sci) * (f0[i] / sci);
        }

        // Compute h0
        let mut h0 = if d0 < initial_step::MIN_TOLERANCE || d1 < initial_step::MIN_TOLERANCE {
            initial_step::DEFAULT_INITIAL_STEP
        } else {
            initial_step::SAFETY_FACTOR * (d0 / d1).sqrt()
        };

        h0 = h0.min(self.controller.h_max());
        h0 = sign(h0, posneg);

        let y1 = &self.y + &f0 * h0;
        let mut f1 = OVector::zeros_generic(rows, cols);
        self.f.system(self.x + h0, &y1, &mut f1);

        // Compute the norm of f1-f0 divided by h0
        let mut d2: f64 = 0.0;
        for i in 0..dim {
            let sci = self.atol + self.y[i].abs() * self.rtol;
            d2 += ((f1[i] - f0[i]) / sci) * ((f1[i] - f0[i]) / sci);
        }
        d2 = d2.sqrt() / h0;

        let h1 = if d1.sqrt().max(d2.abs()) <= 1.0E-15 {
            (1.0E-6_f64).max(h0.abs() * 1.0E-3)
        } else {
            (0.01 / (d1.sqrt().max(d2))).powf(1.0 / 5.0)
        };

        sign(
            (100.0 * h0.abs()).min(h1.min(self.controller.h_max())),
            posneg,
        )
    }

    /// Core integration method.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        // Initilization
        let (rows, cols) = self.y.shape_generic();
        self.x_old = self.x;
        let mut n_step = 0;
        let mut last = false;
        let dim = rows.value();
        let mut non_stiff = 0;
        let mut iasti = 0;
        let posneg = sign(1.0, self.x_end - self.x);

        if !is_finite(&self.y) {
            return Err(IntegrationError::NonFiniteState { x: self.x });
        }

        // Output times located at the initial point get the initial values unchanged
        self.initial_output();
        if self.x == self.x_end {
            return Ok(self.stats);
        }

        let mut k = vec![OVector::zeros_generic(rows, cols); 7];
        self.f.system(self.x, &self.y, &mut k[0]);
        self.stats.num_eval += 1;
        if !is_finite(&k[0]) {
            return Err(IntegrationError::NonFiniteState { x: self.x });
        }

        if self.h == 0.0 {
            self.h = self.hinit();
            self.stats.num_eval += 2;
        }
        self.h_old = self.h;

        // Main loop
        while !last {
            // Check if step number is within allowed range
            if n_step > self.n_max {
                self.h_old = self.h;
                return Err(IntegrationError::MaxNumStepReached { x: self.x, n_step });
            }

            // Check for step size underflow
            if !self.h.is_finite() || 0.1 * self.h.abs() <= self.uround * self.x.abs() {
                self.h_old = self.h;
                return Err(IntegrationError::StepSizeUnderflow { x: self.x });
            }

            // Check if it's the last iteration
            if (self.x + 1.01 * self.h - self.x_end) * posneg > 0.0 {
                self.h = self.x_end - self.x;
                last = true;
            }
            n_step += 1;

            let h = self.h;
            // 6 Stages
            let mut y_next = OVector::zeros_generic(rows, cols);
            let mut y_stiff = OVector::zeros_generic(rows, cols);
            for s in 1..7 {
                y_next = self.y.clone();
                for (j, k_value) in k.iter().enumerate().take(s) {
                    y_next += k_value * (h * dopri54::a(s + 1, j + 1));
                }
                self.f
                    .system(self.x + h * dopri54::c(s + 1), &y_next, &mut k[s]);
                if s == 5 {
                    y_stiff = y_next.clone();
                }
            }
            k[1] = k[6].clone();
            self.stats.num_eval += 6;

            // Prepare dense output
            self.rcont[4] = (&k[0] * dopri54::d(1)
                + &k[2] * dopri54::d(3)
                + &k[3] * dopri54::d(4)
                + &k[4] * dopri54::d(5)
                + &k[5] * dopri54::d(6)
                + &k[1] * dopri54::d(7))
                * h;

            // Compute error estimate
            k[3] = (&k[0] * dopri54::e(1)
                + &k[2] * dopri54::e(3)
                + &k[3] * dopri54::e(4)
                + &k[4] * dopri54::e(5)
                + &k[5] * dopri54::e(6)
                + &k[1] * dopri54::e(7))
                * h;

            // Compute error
            let mut err = 0.0;
            for i in 0..dim {
                let sc_i = self.atol + self.y[i].abs().max(y_next[i].abs()) * self.rtol;
                err += (k[3][i] / sc_i) * (k[3][i] / sc_i);
            }
            err = (err / dim as f64).sqrt();
            // A trial step that overflowed is rejected with the largest allowed reduction
            if err.is_nan() {
                err = f64::INFINITY;
            }

            // Step size control
            let (accepted, h_new) = self.controller.accept(err, h);
            if accepted {
                self.stats.accepted_steps += 1;

                // Stifness detection
                if self.stats.accepted_steps % self.n_stiff == 0 || iasti > 0 {
                    let num = (&k[1] - &k[5]).norm_squared();
                    let den = (&y_next - &y_stiff).norm_squared();
                    let h_lamb = if den > 0.0 { h * (num / den).sqrt() } else { 0.0 };

                    if h_lamb > stiffness::DOPRI5_THRESHOLD {
                        iasti += 1;
                        non_stiff = 0;
                        if iasti == stiffness::MAX_STIFF_ITERATIONS {
                            self.h_old = h;
                            return Err(IntegrationError::StiffnessDetected { x: self.x });
                        }
                    } else {
                        non_stiff += 1;
                        if non_stiff == stiffness::NON_STIFF_RESET_COUNT {
                            iasti = 0;
                        }
                    }
                }

                // Prepare dense output
                let ydiff = &y_next - &self.y;
                let bspl = &k[0] * h - &ydiff;
                self.rcont[0] = self.y.clone();
                self.rcont[1] = ydiff.clone();
                self.rcont[2] = bspl.clone();
                self.rcont[3] = -&k[1] * h + ydiff - bspl;

                k[0] = k[1].clone();
                self.y = y_next;
                self.x_old = self.x;
                self.x = if last { self.x_end } else { self.x + h };
                self.h_old = h;

                if !is_finite(&self.y) || !is_finite(&k[0]) {
                    return Err(IntegrationError::NonFiniteState { x: self.x });
                }

                self.solution_output(posneg);

                // Normal exit
                if last {
                    self.h_old = posneg * h_new.abs();
                    return Ok(self.stats);
                }
            } else {
                last = false;
                if self.stats.accepted_steps >= 1 {
                    self.stats.rejected_steps += 1;
                }
            }
            self.h = h_new;
        }
        Ok(self.stats)
    }

    fn initial_output(&mut self) {
        while let Some(&t) = self.t_out.get(self.next_out) {
            if t != self.x {
                break;
            }
            self.x_out.push(t);
            self.y_out.push(self.y.clone());
            self.next_out += 1;
        }
    }

    /// Evaluates the dense output of the last accepted step at every pending output time it covers.
    fn solution_output(&mut self, posneg: f64) {
        while let Some(&t) = self.t_out.get(self.next_out) {
            if (t - self.x) * posneg > 0.0 {
                break;
            }
            let theta = (t - self.x_old) / self.h_old;
            let theta1 = 1.0 - theta;
            self.x_out.push(t);
            self.y_out.push(
                &self.rcont[0]
                    + (&self.rcont[1]
                        + (&self.rcont[2] + (&self.rcont[3] + &self.rcont[4] * theta1) * theta)
                            * theta1)
                        * theta,
            );
            self.next_out += 1;
        }
    }

    /// Getter for the independent variable's output.
    pub fn x_out(&self) -> &Vec<f64> {
        &self.x_out
    }

    /// Getter for the dependent variables' output.
    pub fn y_out(&self) -> &Vec<OVector<f64, D>> {
        &self.y_out
    }

    /// Consumes the stepper and returns the output times and states.
    pub fn into_output(self) -> (Vec<f64>, Vec<OVector<f64, D>>) {
        (self.x_out, self.y_out)
    }

    /// Independent variable at the last accepted step.
    ///
    /// When the integration stops on an error, `x()` and `y()` give the point from which another
    /// stepper can take over.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Dependent variables at the last accepted step.
    pub fn y(&self) -> &OVector<f64, D> {
        &self.y
    }

    /// Size of the last step taken.
    pub fn step_size(&self) -> f64 {
        self.h_old
    }

    /// Output times not reached yet.
    pub fn pending_output(&self) -> &[f64] {
        &self.t_out[self.next_out..]
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }
}

fn is_finite<D: Dim>(v: &OVector<f64, D>) -> bool
where
    DefaultAllocator: Allocator<D>,
{
    v.iter().all(|value| value.is_finite())
}

fn sign(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}
