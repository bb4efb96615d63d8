mod common;

use approx::assert_relative_eq;
use common::{reference_euler, reference_rk4, Rossler};
use dynet_core::{
    DynamicalSystem, Euler, Integrator, IntegratorSettings, Method, RungeKutta4, Vector,
};

fn integrate(integrator: &mut impl Integrator<f64>, steps: usize) -> ([f64; 3], f64) {
    let mut system = Rossler::standard();
    system.init(&[0.0, 0.0, 0.0]).unwrap();
    let mut t = 0.0;
    for _ in 0..steps {
        integrator.step(&mut t, &mut system);
    }
    ([system.x(0), system.x(1), system.x(2)], t)
}

#[test]
fn rk4_trajectory_matches_plain_array_reference() {
    let (state, t) = integrate(&mut RungeKutta4::new(1e-2), 10_000);
    let expected = reference_rk4([0.0, 0.0, 0.0], 1e-2, 10_000);

    assert_eq!(state, expected);
    assert!((t - 100.0).abs() < 1e-9, "t = {t}");
    // The attractor is bounded.
    assert!(state.iter().all(|v| v.is_finite() && v.abs() < 50.0), "{state:?}");
}

#[test]
fn rk4_trajectory_reproduces_recorded_golden_state() {
    let (state, _) = integrate(&mut RungeKutta4::new(1e-2), 10_000);
    let golden = [-0.7056374992125546, 2.332702020873962, 0.5575467053612039];
    for (value, expected) in state.iter().zip(golden) {
        assert_relative_eq!(*value, expected, max_relative = 1e-12);
    }

    // Halving the step lands on the same state: the golden values are converged.
    let (fine, _) = integrate(&mut RungeKutta4::new(5e-3), 20_000);
    for (value, expected) in fine.iter().zip(golden) {
        assert_relative_eq!(*value, expected, epsilon = 1e-6);
    }
}

#[test]
fn euler_trajectory_reproduces_recorded_golden_state() {
    let (state, _) = integrate(&mut Euler::new(1e-3), 5_000);
    let golden = [1.138397166755535, -0.4566114664664927, 0.6945194876944674];
    for (value, expected) in state.iter().zip(golden) {
        assert_relative_eq!(*value, expected, max_relative = 1e-12);
    }
}

#[test]
fn euler_trajectory_matches_plain_array_reference() {
    let (state, _) = integrate(&mut Euler::new(1e-3), 5_000);
    assert_eq!(state, reference_euler([0.0, 0.0, 0.0], 1e-3, 5_000));
}

#[test]
fn repeated_runs_are_bit_identical() {
    let first = integrate(&mut RungeKutta4::new(1e-2), 2_500);
    let second = integrate(&mut RungeKutta4::new(1e-2), 2_500);
    assert_eq!(first, second);
}

#[test]
fn reused_integrator_keeps_no_hidden_state_between_systems() {
    let mut rk4 = RungeKutta4::new(1e-2);
    let warm = integrate(&mut rk4, 300);
    let again = integrate(&mut rk4, 300);
    assert_eq!(warm, again);
}

#[test]
fn configured_stepper_matches_direct_integrator() {
    let settings = IntegratorSettings {
        method: Method::RungeKutta4,
        step_size: 1e-2,
    };
    let mut stepper = settings.build::<f64>().unwrap();
    let configured = integrate(&mut stepper, 1_000);
    let direct = integrate(&mut RungeKutta4::new(1e-2), 1_000);
    assert_eq!(configured, direct);
}

#[test]
fn derivative_slot_holds_last_stage_after_a_step() {
    let mut system = Rossler::standard();
    system.init(&[1.0, 2.0, 3.0]).unwrap();
    let mut t = 0.0;
    RungeKutta4::new(0.1).step(&mut t, &mut system);

    // The k4 stage was sampled at a candidate, not at the new state.
    let candidate = system.states().derivative_vector().to_vec();
    system.derive_current(t);
    let at_new_state = system.states().derivative_vector().to_vec();
    assert_ne!(candidate, at_new_state);

    let x = Vector::from_slice(&[1.0, 2.0, 3.0]);
    system.derive(0.0, &x);
    assert_eq!(system.dx(0), -5.0);
    assert_eq!(system.dx(1), 1.0 + common::A * 2.0);
    assert_eq!(system.dx(2), common::B + 3.0 * (1.0 - common::C));
}
