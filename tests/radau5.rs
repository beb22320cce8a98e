use approx::assert_relative_eq;
use nalgebra::Vector3;
use tumour_immune::{Radau5, System, Vector1};

const INTEGRATION_TOLERANCE: f64 = 1e-10;
const STEP_SIZE: f64 = 0.1;

type State = Vector1<f64>;
type Time = f64;

struct Ode;

// Implement the ODE dy/dt = -3 * t^2 * exp(y)
impl System<State> for Ode {
    fn system(&self, t: Time, y: &State, dy: &mut State) {
        dy[0] = -3.0 * t * t * y[0].exp();
    }
}

// Robertson's chemical reaction, stiff
struct ChemicalReaction;

impl System<Vector3<f64>> for ChemicalReaction {
    fn system(&self, _: Time, y: &Vector3<f64>, dy: &mut Vector3<f64>) {
        dy[0] = -0.04 * y[0] + 10000. * y[1] * y[2];
        dy[1] = 0.04 * y[0] - 10000. * y[1] * y[2] - 3. * 10_f64.powi(7) * y[1] * y[1];
        dy[2] = 3. * 10_f64.powi(7) * y[1] * y[1];
    }
}

fn output_times(x_start: Time, x_end: Time, step: Time) -> Vec<Time> {
    let n = ((x_end - x_start) / step).round() as usize;
    let step = (x_end - x_start) / n as f64;
    let mut times: Vec<Time> = (0..=n).map(|i| x_start + i as f64 * step).collect();
    times[n] = x_end;
    times
}

#[test]
fn test_radau5() {
    let x_start = 0.0;
    let x_end = 6.0;
    let mut stepper = Radau5::new(
        Ode {},
        x_start,
        x_end,
        output_times(x_start, x_end, STEP_SIZE),
        State::new(0.0),
        INTEGRATION_TOLERANCE,
        INTEGRATION_TOLERANCE,
    );
    let res = stepper.integrate();
    assert!(res.is_ok());

    let times_s = stepper.x_out();
    let states = stepper.y_out();
    assert_eq!(times_s.len(), 61);
    assert_eq!(states.len(), 61);

    times_s
        .iter()
        .zip(states.iter())
        .for_each(|(time_s, state)| {
            let analytic = analytic_solution(*time_s);
            assert_relative_eq!(*state, analytic, epsilon = 1e-7);
        });
}

#[test]
fn test_radau5_solves_stiff_chemical_reaction() {
    let y0 = Vector3::new(1.0, 0.0, 0.0);
    let mut stepper = Radau5::new(
        ChemicalReaction,
        0.,
        1.0e5,
        vec![0.0, 40.0, 1.0e5],
        y0,
        1.0e-6,
        1.0e-10,
    );
    let stats = stepper.integrate().unwrap();
    // Thousands of steps would be needed by an explicit method
    assert!(stats.accepted_steps < 1000, "{}", stats);

    let states = stepper.y_out();
    assert_eq!(states.len(), 3);
    assert_relative_eq!(states[1][0], 0.7158271, max_relative = 1e-5);
    assert_relative_eq!(states[1][1], 9.185535e-6, max_relative = 1e-4);
    assert_relative_eq!(states[1][2], 0.2841637, max_relative = 1e-5);
    assert_relative_eq!(states[2][0], 0.01786592, max_relative = 1e-4);
    assert_relative_eq!(states[2][2], 0.9821340, max_relative = 1e-5);
    for state in states.iter() {
        assert_relative_eq!(state.sum(), 1.0, epsilon = 1e-8);
    }
}

/// Evaluates the analytic solution of the ODE at the given time.
fn analytic_solution(t: Time) -> State {
    State::new(-(t.powi(3) + 1.0).ln())
}
