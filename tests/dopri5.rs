use approx::assert_relative_eq;
use nalgebra::Vector3;
use tumour_immune::{Dopri5, IntegrationError, System, Vector1};

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
fn test_dopri5() {
    let f = Ode {};
    let initial_value = State::new(0.0);
    let x_start = 0.0;
    let x_end = 6.0;
    let mut stepper = Dopri5::new(
        f,
        x_start,
        x_end,
        output_times(x_start, x_end, STEP_SIZE),
        initial_value,
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
            assert_relative_eq!(*state, analytic, epsilon = 1e-8);
        });
}

#[test]
fn test_dopri5_reports_between_steps() {
    let f = Ode {};
    let x_start = 0.0;
    let x_end = 6.0;
    let times: Vec<Time> = (0..100).map(|i| i as f64 * 0.0601).collect();
    let mut stepper = Dopri5::new(
        f,
        x_start,
        x_end,
        times.clone(),
        State::new(0.0),
        INTEGRATION_TOLERANCE,
        INTEGRATION_TOLERANCE,
    );
    let stats = stepper.integrate().unwrap();
    assert!(stats.num_eval > 0);

    let (times_s, states) = stepper.into_output();
    assert_eq!(times_s, times);
    for (t, state) in times_s.iter().zip(states.iter()) {
        assert_relative_eq!(*state, analytic_solution(*t), epsilon = 1e-8);
    }
}

#[test]
fn test_dopri5_detects_stiffness() {
    let y0 = Vector3::new(1.0, 0.0, 0.0);
    let mut stepper = Dopri5::new(
        ChemicalReaction,
        0.,
        10.,
        vec![0.0, 10.0],
        y0,
        1.0e-2,
        1.0e-6,
    );
    match stepper.integrate() {
        Err(IntegrationError::StiffnessDetected { x }) => assert!(x > 0.0 && x < 10.0),
        other => panic!("expected stiffness to be detected, got {:?}", other),
    }
}

/// Evaluates the analytic solution of the ODE at the given time.
fn analytic_solution(t: Time) -> State {
    State::new(-(t.powi(3) + 1.0).ln())
}
