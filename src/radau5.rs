//! Implicit Runge-Kutta method of Radau IIA type, order 5, with dense output of order 3.
//!
//! Meant for stiff problems. Each step solves the collocation equations with a simplified Newton
//! iteration in the eigenbasis of the method: one real `n x n` system and one complex `n x n`
//! system, the latter written as a real `2n x 2n` block. The Jacobian is approximated by forward
//! differences at the start of every step.
//!
//! Like [`Dopri5`](crate::Dopri5), the stepper reports the solution at a caller-supplied list of
//! output times.

use crate::butcher_tableau::radau5::*;
use crate::constants::{implicit, initial_step};
use crate::dop_shared::*;

use nalgebra::{allocator::Allocator, DMatrix, DVector, DefaultAllocator, Dim, Dyn, OVector, LU};

/// Structure containing the parameters for the numerical integration.
pub struct Radau5<V, F>
where
    F: System<V>,
{
    f: F,
    x: f64,
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
    h_max: f64,
    safety_factor: f64,
    n_max: u32,
    stats: Stats,
}

impl<D: Dim, F> Radau5<OVector<f64, D>, F>
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
    /// * `t_out`   - Times at which the solution is reported. Times outside of `[x, x_end]` are ignored
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
        Self::from_param(
            f,
            x,
            x_end,
            t_out,
            y,
            rtol,
            atol,
            0.9,
            (x_end - x).abs(),
            0.0,
            100000,
        )
    }

    /// Advanced initializer for the structure.
    ///
    /// # Arguments
    ///
    /// * `safety_factor`   - Safety factor used in the computation of the adaptive step size. Default is 0.9
    /// * `h_max`   - Maximum step size. Default is `|x_end - x|`
    /// * `h`       - Initial value of the step size. If h = 0.0, 1e-6 is used
    /// * `n_max`   - Maximum number of steps. Default is 100000
    ///
    /// The other arguments are those of [`Radau5::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_param(
        f: F,
        x: f64,
        x_end: f64,
        mut t_out: Vec<f64>,
        y: OVector<f64, D>,
        rtol: f64,
        atol: f64,
        safety_factor: f64,
        h_max: f64,
        h: f64,
        n_max: u32,
    ) -> Self {
        let posneg = sign(1.0, x_end - x);
        t_out.retain(|t| (t - x) * posneg >= 0.0 && (t - x_end) * posneg <= 0.0);
        Self {
            f,
            x,
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
            h_max: h_max.abs(),
            safety_factor,
            n_max,
            stats: Stats::new(),
        }
    }

    /// Core integration method.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        let posneg = sign(1.0, self.x_end - self.x);
        let n = self.y.len();
        let mut y = to_dynamic(&self.y);
        if !is_finite(&y) {
            return Err(IntegrationError::NonFiniteState { x: self.x });
        }

        // The embedded estimate is of order 3, tolerances are tightened accordingly
        let ratio = self.atol / self.rtol;
        let rtol = 0.1 * self.rtol.powf(2.0 / 3.0);
        let atol = rtol * ratio;
        let fnewt = (10.0 * self.uround / rtol).max(0.03_f64.min(rtol.sqrt()));

        self.initial_output();
        if self.x == self.x_end {
            return Ok(self.stats);
        }

        let mut y0 = self.eval(self.x, &y);
        if !is_finite(&y0) {
            return Err(IntegrationError::NonFiniteState { x: self.x });
        }
        let mut jac = self.jacobian(&y, &y0);

        let mut h = if self.h == 0.0 {
            initial_step::DEFAULT_INITIAL_STEP
        } else {
            self.h
        };
        h = sign(h.abs().min(self.h_max), posneg);

        // Dense output of the last accepted step and its length
        let mut cont: Option<[DVector<f64>; 4]> = None;
        let mut h_old = h;
        // Step size and error of the last accepted step, for the predictive controller
        let mut previous: Option<(f64, f64)> = None;
        let mut faccon = 1.0_f64;
        let mut reject = false;
        let mut last = false;
        let mut n_step = 0;
        let mut n_singular = 0;

        loop {
            if n_step > self.n_max {
                self.h = h;
                return Err(IntegrationError::MaxNumStepReached { x: self.x, n_step });
            }
            if !h.is_finite() || 0.1 * h.abs() <= self.uround * self.x.abs() {
                self.h = h;
                return Err(IntegrationError::StepSizeUnderflow { x: self.x });
            }
            if (self.x + 1.01 * h - self.x_end) * posneg > 0.0 {
                h = self.x_end - self.x;
                last = true;
            }
            n_step += 1;

            let systems = match LinearSystems::new(&jac, h) {
                Some(systems) => {
                    n_singular = 0;
                    systems
                }
                None => {
                    n_singular += 1;
                    if n_singular >= implicit::MAX_SINGULAR {
                        return Err(IntegrationError::SingularMatrix { x: self.x });
                    }
                    h *= 0.5;
                    reject = true;
                    last = false;
                    continue;
                }
            };
            let fac1 = U1 / h;
            let alphn = ALPH / h;
            let betan = BETA / h;
            let scal = y.map(|v| atol + rtol * v.abs());

            // Starting values of the Newton iteration, extrapolated from the previous step
            let (mut z1, mut z2, mut z3) = match &cont {
                Some(c) => {
                    let c3q = h / h_old;
                    (
                        extrapolate(c, C1 * c3q),
                        extrapolate(c, C2 * c3q),
                        extrapolate(c, c3q),
                    )
                }
                None => (DVector::zeros(n), DVector::zeros(n), DVector::zeros(n)),
            };
            let mut w1 = &z1 * TI11 + &z2 * TI12 + &z3 * TI13;
            let mut w2 = &z1 * TI21 + &z2 * TI22 + &z3 * TI23;
            let mut w3 = &z1 * TI31 + &z2 * TI32 + &z3 * TI33;

            // Simplified Newton iteration
            faccon = faccon.max(self.uround).powf(0.8);
            let mut newt = 0;
            let mut dyno_old = 0.0;
            let mut thq_old = 0.0;
            let mut shrink = None;
            loop {
                if newt >= implicit::MAX_NEWTON_ITERATIONS {
                    shrink = Some(0.5);
                    break;
                }
                let a1 = self.eval(self.x + C1 * h, &(&y + &z1));
                let a2 = self.eval(self.x + C2 * h, &(&y + &z2));
                let a3 = self.eval(self.x + h, &(&y + &z3));

                let r1 = &a1 * TI11 + &a2 * TI12 + &a3 * TI13 - &w1 * fac1;
                let r2 = &a1 * TI21 + &a2 * TI22 + &a3 * TI23 - &w2 * alphn + &w3 * betan;
                let r3 = &a1 * TI31 + &a2 * TI32 + &a3 * TI33 - &w3 * alphn - &w2 * betan;
                let (d1, (d2, d3)) = match (systems.solve_real(&r1), systems.solve_complex(&r2, &r3))
                {
                    (Some(d1), Some(d23)) => (d1, d23),
                    _ => {
                        shrink = Some(0.5);
                        break;
                    }
                };
                newt += 1;

                let mut dyno = 0.0;
                for i in 0..n {
                    dyno += (d1[i] / scal[i]).powi(2)
                        + (d2[i] / scal[i]).powi(2)
                        + (d3[i] / scal[i]).powi(2);
                }
                let dyno = (dyno / (3 * n) as f64).sqrt();

                // Rate of convergence
                if newt > 1 && newt < implicit::MAX_NEWTON_ITERATIONS {
                    let thq = dyno / dyno_old;
                    let theta = if newt == 2 { thq } else { (thq * thq_old).sqrt() };
                    thq_old = thq;
                    if theta < implicit::MAX_CONTRACTION {
                        faccon = theta / (1.0 - theta);
                        let remaining = (implicit::MAX_NEWTON_ITERATIONS - 1 - newt) as i32;
                        let dyth = faccon * dyno * theta.powi(remaining) / fnewt;
                        if dyth >= 1.0 {
                            // Convergence is too slow for the iterations left
                            let qnewt = dyth.min(20.0).max(1.0e-4);
                            shrink = Some(0.8 * qnewt.powf(-1.0 / (4.0 + remaining as f64)));
                            break;
                        }
                    } else {
                        shrink = Some(0.5);
                        break;
                    }
                }
                dyno_old = dyno.max(self.uround);

                w1 += d1;
                w2 += d2;
                w3 += d3;
                z1 = &w1 * T11 + &w2 * T12 + &w3 * T13;
                z2 = &w1 * T21 + &w2 * T22 + &w3 * T23;
                z3 = &w1 * T31 + &w2;
                if faccon * dyno <= fnewt {
                    break;
                }
            }

            if let Some(factor) = shrink {
                h *= factor;
                reject = true;
                last = false;
                if self.stats.accepted_steps >= 1 {
                    self.stats.rejected_steps += 1;
                }
                continue;
            }

            // Error estimate
            let f2 = &z1 * (DD1 / h) + &z2 * (DD2 / h) + &z3 * (DD3 / h);
            let mut estimate = systems.solve_real(&(&f2 + &y0));
            let mut err = scaled_rms(&estimate, &scal);
            if err >= 1.0 && (cont.is_none() || reject) {
                if let Some(e) = estimate {
                    let f1 = self.eval(self.x, &(&y + e));
                    estimate = systems.solve_real(&(f1 + &f2));
                    err = scaled_rms(&estimate, &scal);
                }
            }

            // Step size control
            let fac = self.safety_factor.min(
                self.safety_factor * (1 + 2 * implicit::MAX_NEWTON_ITERATIONS) as f64
                    / (newt + 2 * implicit::MAX_NEWTON_ITERATIONS) as f64,
            );
            let mut quot = (err.powf(0.25) / fac)
                .min(implicit::FAC_LEFT)
                .max(implicit::FAC_RIGHT);
            let mut h_new = h / quot;

            if err < 1.0 {
                self.stats.accepted_steps += 1;
                // Predictive controller of Gustafsson
                if let Some((h_acc, err_acc)) = previous {
                    let fac_gus = ((h_acc / h) * (err * err / err_acc).powf(0.25)
                        / self.safety_factor)
                        .min(implicit::FAC_LEFT)
                        .max(implicit::FAC_RIGHT);
                    quot = quot.max(fac_gus);
                    h_new = h / quot;
                }
                previous = Some((h, err.max(implicit::MIN_ERROR_MEMORY)));

                let y_new = &y + &z3;
                let c1 = (&z2 - &z3) / C2M1;
                let ak = (&z1 - &z2) / C1MC2;
                let acont3 = (&ak - &z1 / C1) / C2;
                let c2 = (ak - &c1) / C1M1;
                let c3 = &c2 - acont3;
                let dense = [y_new.clone(), c1, c2, c3];

                h_old = h;
                self.x = if last { self.x_end } else { self.x + h };
                y = y_new;
                if !is_finite(&y) {
                    return Err(IntegrationError::NonFiniteState { x: self.x });
                }
                self.y = self.to_state(&y);
                self.solution_output(&dense, h_old, posneg);
                cont = Some(dense);

                if last {
                    self.h = h_new;
                    return Ok(self.stats);
                }

                y0 = self.eval(self.x, &y);
                if !is_finite(&y0) {
                    return Err(IntegrationError::NonFiniteState { x: self.x });
                }
                jac = self.jacobian(&y, &y0);

                h_new = sign(h_new.abs().min(self.h_max), posneg);
                if reject {
                    h_new = sign(h_new.abs().min(h.abs()), posneg);
                }
                reject = false;
                h = h_new;
            } else {
                reject = true;
                last = false;
                h = if cont.is_none() { 0.1 * h } else { h_new };
                if self.stats.accepted_steps >= 1 {
                    self.stats.rejected_steps += 1;
                }
            }
        }
    }

    fn eval(&mut self, x: f64, y: &DVector<f64>) -> DVector<f64> {
        let state = self.to_state(y);
        let (rows, cols) = self.y.shape_generic();
        let mut dy = OVector::zeros_generic(rows, cols);
        self.f.system(x, &state, &mut dy);
        self.stats.num_eval += 1;
        to_dynamic(&dy)
    }

    /// Forward difference approximation of the Jacobian at `(x, y)`, `f0` being `f(x, y)`.
    fn jacobian(&mut self, y: &DVector<f64>, f0: &DVector<f64>) -> DMatrix<f64> {
        let n = y.len();
        let mut jac = DMatrix::zeros(n, n);
        let mut y_pert = y.clone();
        for i in 0..n {
            let delta = (self.uround * y[i].abs().max(1.0e-5)).sqrt();
            y_pert[i] = y[i] + delta;
            let f_pert = self.eval(self.x, &y_pert);
            jac.set_column(i, &((f_pert - f0) / delta));
            y_pert[i] = y[i];
        }
        jac
    }

    fn to_state(&self, y: &DVector<f64>) -> OVector<f64, D> {
        let (rows, cols) = self.y.shape_generic();
        OVector::from_iterator_generic(rows, cols, y.iter().copied())
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

    /// Evaluates the collocation polynomial of the last accepted step at every pending output
    /// time it covers. The polynomial is expanded around the end of the step.
    fn solution_output(&mut self, cont: &[DVector<f64>; 4], h: f64, posneg: f64) {
        while let Some(&t) = self.t_out.get(self.next_out) {
            if (t - self.x) * posneg > 0.0 {
                break;
            }
            let s = (t - self.x) / h;
            let value =
                &cont[0] + (&cont[1] + (&cont[2] + &cont[3] * (s - C1M1)) * (s - C2M1)) * s;
            let state = self.to_state(&value);
            self.x_out.push(t);
            self.y_out.push(state);
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
}

/// LU factorisations of the two iteration matrices of a step.
///
/// With `J` the Jacobian, the real system is `(U1/h) I - J` and the complex one
/// `((ALPH + i BETA)/h) I - J`, stored as the real block `[[A, -B], [B, A]]`.
struct LinearSystems {
    real: LU<f64, Dyn, Dyn>,
    complex: LU<f64, Dyn, Dyn>,
    n: usize,
}

impl LinearSystems {
    fn new(jac: &DMatrix<f64>, h: f64) -> Option<Self> {
        let n = jac.nrows();
        let real = DMatrix::identity(n, n) * (U1 / h) - jac;

        let a = DMatrix::identity(n, n) * (ALPH / h) - jac;
        let b = DMatrix::identity(n, n) * (BETA / h);
        let mut complex = DMatrix::zeros(2 * n, 2 * n);
        complex.view_mut((0, 0), (n, n)).copy_from(&a);
        complex.view_mut((0, n), (n, n)).copy_from(&(-&b));
        complex.view_mut((n, 0), (n, n)).copy_from(&b);
        complex.view_mut((n, n), (n, n)).copy_from(&a);

        let real = real.lu();
        let complex = complex.lu();
        if real.is_invertible() && complex.is_invertible() {
            Some(Self { real, complex, n })
        } else {
            None
        }
    }

    fn solve_real(&self, rhs: &DVector<f64>) -> Option<DVector<f64>> {
        self.real.solve(rhs)
    }

    /// Solves the complex system for the right-hand side `re + i im`.
    fn solve_complex(
        &self,
        re: &DVector<f64>,
        im: &DVector<f64>,
    ) -> Option<(DVector<f64>, DVector<f64>)> {
        let n = self.n;
        let mut rhs = DVector::zeros(2 * n);
        rhs.rows_mut(0, n).copy_from(re);
        rhs.rows_mut(n, n).copy_from(im);
        let sol = self.complex.solve(&rhs)?;
        Some((sol.rows(0, n).into_owned(), sol.rows(n, n).into_owned()))
    }
}

/// Collocation polynomial of the previous step, evaluated `q` previous step lengths after its end.
fn extrapolate(cont: &[DVector<f64>; 4], q: f64) -> DVector<f64> {
    (&cont[1] + (&cont[2] + &cont[3] * (q - C1M1)) * (q - C2M1)) * q
}

fn scaled_rms(v: &Option<DVector<f64>>, scal: &DVector<f64>) -> f64 {
    match v {
        Some(v) => {
            let sum: f64 = v.iter().zip(scal.iter()).map(|(e, s)| (e / s).powi(2)).sum();
            let err = (sum / v.len() as f64).sqrt();
            if err.is_nan() {
                f64::INFINITY
            } else {
                err.max(1.0e-10)
            }
        }
        None => f64::INFINITY,
    }
}

fn to_dynamic<D: Dim>(v: &OVector<f64, D>) -> DVector<f64>
where
    DefaultAllocator: Allocator<D>,
{
    DVector::from_iterator(v.len(), v.iter().copied())
}

fn is_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|value| value.is_finite())
}

fn sign(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}
