//! Signomial program tests for the local-solve driver.

use gpsca::prelude::*;
use gpsca::sp::{ScaDriver, ScaState};

const TOL: f64 = 1e-3;

/// maximize x s.t. x <= y + 1, y <= 2; optimum x = 3.
fn shifted_bound() -> (Problem, Variable, Variable) {
    let x = scalar_var("x");
    let y = scalar_var("y");
    let prob = Problem::maximize(&x)
        .subject_to([x.leq(&y + 1.0).unwrap(), y.leq(2.0).unwrap()])
        .build();
    (prob, x, y)
}

#[test]
fn test_converges_to_local_optimum() {
    let (prob, x, y) = shifted_bound();
    let result = prob.localsolve().unwrap();

    assert_eq!(result.status, ScaStatus::Converged);
    assert!(result.is_converged());
    assert!((result[&x] - 3.0).abs() < TOL, "x = {}", result[&x]);
    assert!((result[&y] - 2.0).abs() < TOL, "y = {}", result[&y]);
    assert!((result.cost() - 3.0).abs() < TOL);
    assert_eq!(result.history.len(), result.iterations);
    assert!(result.iterations >= 2);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_iteration_cap_is_an_outcome() {
    let (prob, x, _) = shifted_bound();
    let result = prob
        .localsolve_with(ScaConfig::default().max_iterations(2))
        .unwrap();

    assert_eq!(result.status, ScaStatus::MaxIterExceeded);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.history.len(), 2);
    assert!(!result.operating_point.is_empty());
    assert!(result.operating_point.contains_key(&x));
}

#[test]
fn test_history_records_objective_and_violation() {
    let (prob, _, _) = shifted_bound();
    let result = prob.localsolve().unwrap();
    for (i, record) in result.history.iter().enumerate() {
        assert_eq!(record.iteration, i + 1);
        assert!(record.cost > 0.0);
        // linearized solutions are feasible for the original problem
        assert!(record.max_violation < 1e-6, "violation {}", record.max_violation);
    }
    let last = result.history.last().unwrap();
    assert!(last.max_change < 1e-4);
}

#[test]
fn test_step_at_converged_point_is_fixed() {
    let (prob, _, _) = shifted_bound();
    let mut driver = ScaDriver::new(&prob, ScaConfig::default()).unwrap();
    assert_eq!(driver.state(), ScaState::Initializing);

    let result = driver.run().unwrap();
    assert_eq!(driver.state(), ScaState::Converged);

    let again = driver.step(&result.operating_point).unwrap();
    let next = driver.operating_point(&again);
    let change = gpsca::sp::max_relative_change(&result.operating_point, &next);
    assert!(change < 1e-4, "change {}", change);
}

#[test]
fn test_lower_bound_by_sum() {
    // minimize x s.t. x + y >= 1, y <= 0.1
    let x = scalar_var("x");
    let y = scalar_var("y");
    let result = Problem::minimize(&x)
        .subject_to([(&x + &y).geq(1.0).unwrap(), y.leq(0.1).unwrap()])
        .localsolve()
        .unwrap();
    assert!((result[&x] - 0.9).abs() < TOL, "x = {}", result[&x]);
}

#[test]
fn test_initial_guess_is_used() {
    let (prob, x, y) = shifted_bound();
    let config = ScaConfig::default().guess(&x, 3.0).guess(&y, 2.0);
    let result = prob.localsolve_with(config).unwrap();
    // starting at the optimum, the first iteration already stands still
    assert_eq!(result.iterations, 1);
    assert!((result[&x] - 3.0).abs() < TOL);
}

#[test]
fn test_relaxed_start() {
    // the GP subset (y <= 2 alone) is unbounded for maximize x; falls back to defaults
    let (prob, x, _) = shifted_bound();
    let result = prob
        .localsolve_with(ScaConfig::default().relaxed_start(true))
        .unwrap();
    assert!((result[&x] - 3.0).abs() < TOL);
}

#[test]
fn test_signomial_equality() {
    // minimize x s.t. x + y == 3, y <= 1
    let x = scalar_var("x");
    let y = scalar_var("y");
    let result = Problem::minimize(&x)
        .subject_to([(&x + &y).equals(3.0).unwrap(), y.leq(1.0).unwrap()])
        .localsolve()
        .unwrap();
    assert!((result[&x] - 2.0).abs() < TOL, "x = {}", result[&x]);
    assert!((result[&y] - 1.0).abs() < TOL, "y = {}", result[&y]);
}

#[test]
fn test_infeasible_linearization_names_iteration() {
    // x <= y + z with y, z <= 1 and x >= 3
    let x = scalar_var("x");
    let y = scalar_var("y");
    let z = scalar_var("z");
    let prob = Problem::minimize(&x)
        .subject_to([
            x.leq(&y + &z).unwrap(),
            y.leq(1.0).unwrap(),
            z.leq(1.0).unwrap(),
            x.geq(3.0).unwrap(),
        ])
        .build();

    let mut driver = ScaDriver::new(&prob, ScaConfig::default()).unwrap();
    match driver.run() {
        Err(GpError::Infeasible(msg)) => assert!(msg.contains("iteration 1"), "{}", msg),
        other => panic!("expected infeasible, got {:?}", other),
    }
    assert_eq!(driver.state(), ScaState::Infeasible);
}

#[test]
fn test_infeasible_relaxed_start_sets_state() {
    // the GP subset x <= 1, x >= 2 has no solution
    let x = scalar_var("x");
    let y = scalar_var("y");
    let z = scalar_var("z");
    let prob = Problem::minimize(&x)
        .subject_to([
            x.leq(&y + &z).unwrap(),
            x.leq(1.0).unwrap(),
            x.geq(2.0).unwrap(),
        ])
        .build();

    let mut driver = ScaDriver::new(&prob, ScaConfig::default().relaxed_start(true)).unwrap();
    assert!(driver.run().unwrap_err().is_infeasible());
    assert_eq!(driver.state(), ScaState::Infeasible);
}

#[test]
fn test_pure_gp_solved_once() {
    let x = scalar_var("x");
    let result = Problem::minimize(&x)
        .subject_to([x.geq(2.0).unwrap()])
        .localsolve()
        .unwrap();
    assert_eq!(result.status, ScaStatus::Converged);
    assert_eq!(result.iterations, 1);
    assert!((result.cost() - 2.0).abs() < 1e-4);
}

#[test]
fn test_invalid_config_rejected() {
    let (prob, _, _) = shifted_bound();
    assert!(ScaDriver::new(&prob, ScaConfig::default().max_iterations(0)).is_err());
    assert!(ScaDriver::new(&prob, ScaConfig::default().tolerance(0.0)).is_err());
    assert!(ScaDriver::new(&prob, ScaConfig::default().tolerance(f64::NAN)).is_err());
}

// ============================================================================
// Post-solve checks
// ============================================================================

#[test]
fn test_loose_tight_constraint_warns() {
    let x = scalar_var("x");
    let result = Problem::minimize(&x)
        .subject_to([x.geq(2.0).unwrap(), x.leq(10.0).unwrap().tight()])
        .localsolve()
        .unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("not tight"));
}

#[test]
fn test_active_tight_constraint_is_quiet() {
    let x = scalar_var("x");
    let result = Problem::minimize(&x)
        .subject_to([x.geq(2.0).unwrap().tight()])
        .localsolve()
        .unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn test_fit_used_off_curve_warns() {
    // w >= 2u from a fit, but w is pushed to 5 by another constraint
    let table = FitTable::from_json(
        r#"{
            "kind": {"type": "MaxAffine"},
            "terms": [{"log_coeff": 0.6931471805599453, "exponents": [1.0]}],
            "rms_error": 0.01
        }"#,
    )
    .unwrap();
    let w = scalar_var("w");
    let u = parameter("u", 1.0, "-").unwrap();
    let mut constraints = table.constraints("drag", &w, &[Monomial::from(&u)]).unwrap();
    constraints.push(w.geq(5.0).unwrap());

    let result = Problem::minimize(&w)
        .subject_to(constraints)
        .localsolve()
        .unwrap();
    assert!((result[&w] - 5.0).abs() < TOL);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("drag"));
}

#[test]
fn test_fit_on_curve_is_quiet() {
    let table = FitTable::from_json(
        r#"{
            "kind": {"type": "SoftmaxAffine", "alpha": 3.0},
            "terms": [
                {"log_coeff": 0.0, "exponents": [1.0]},
                {"log_coeff": 0.5, "exponents": [-0.5]}
            ],
            "rms_error": 0.02
        }"#,
    )
    .unwrap();
    let w = scalar_var("w");
    let u = scalar_var("u");
    let mut constraints = table.constraints("power", &w, &[Monomial::from(&u)]).unwrap();
    constraints.push(u.geq(0.5).unwrap());
    constraints.push(u.leq(4.0).unwrap());

    let result = Problem::minimize(&w)
        .subject_to(constraints)
        .localsolve()
        .unwrap();
    let expected = table.evaluate(&[result[&u]]).unwrap();
    assert!((result[&w] - expected).abs() / expected < TOL);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

/// Single-term fit `w = u` with `u = 1`, solved with `w` held at `w_min`.
fn fit_warnings(kind: &str, w_min: f64) -> Vec<String> {
    let table = FitTable::from_json(&format!(
        r#"{{
            "kind": {},
            "terms": [{{"log_coeff": 0.0, "exponents": [1.0]}}],
            "rms_error": 0.04
        }}"#,
        kind
    ))
    .unwrap();
    let w = scalar_var("w");
    let u = parameter("u", 1.0, "-").unwrap();
    let mut constraints = table.constraints("lift", &w, &[Monomial::from(&u)]).unwrap();
    constraints.push(w.geq(w_min).unwrap());

    let result = Problem::minimize(&w)
        .subject_to(constraints)
        .localsolve()
        .unwrap();
    assert!((result[&w] - w_min).abs() < TOL);
    result.warnings
}

#[test]
fn test_fit_error_is_measured_on_the_output() {
    let max_affine = r#"{"type": "MaxAffine"}"#;
    let softmax = r#"{"type": "SoftmaxAffine", "alpha": 10.0}"#;

    // 0.5% off the curve is within a 4% fit, whatever the exponent
    assert!(fit_warnings(max_affine, 1.005).is_empty());
    let quiet = fit_warnings(softmax, 1.005);
    assert!(quiet.is_empty(), "{:?}", quiet);

    // 20% off the curve is not
    assert_eq!(fit_warnings(max_affine, 1.2).len(), 1);
    assert_eq!(fit_warnings(softmax, 1.2).len(), 1);
}
