//! Parameter sweeps.
//!
//! Each sweep point clones the problem, substitutes one value and runs an
//! independent local solve. Points run in parallel on the rayon thread pool and
//! share no mutable state.

use log::info;
use rayon::prelude::*;

use crate::error::{GpError, Result};
use crate::expr::Variable;
use crate::problem::Problem;
use crate::sp::{LocalSolution, ScaConfig};

/// Outcome of one sweep point.
#[derive(Debug)]
pub struct SweepPoint {
    /// Substituted value, in the swept variable's unit.
    pub value: f64,
    /// Local solve outcome at this value.
    pub result: Result<LocalSolution>,
}

impl SweepPoint {
    /// Optimal cost, if the solve succeeded.
    pub fn cost(&self) -> Option<f64> {
        self.result.as_ref().ok().map(LocalSolution::cost)
    }

    /// Value of a variable at this point's solution, if the solve succeeded.
    pub fn value_of(&self, var: &Variable) -> Option<f64> {
        self.result.as_ref().ok().and_then(|s| s.value(var))
    }
}

/// Solve `problem` once per value of `var`, in parallel.
///
/// Results are returned in the order of `values`. A failed point (for example an
/// infeasible one) does not stop the others.
pub fn sweep(
    problem: &Problem,
    var: &Variable,
    values: &[f64],
    config: &ScaConfig,
) -> Result<Vec<SweepPoint>> {
    if !problem.variables().contains(var) {
        return Err(GpError::InvalidProblem(format!(
            "swept variable '{}' does not appear in the problem",
            var
        )));
    }

    let points: Vec<SweepPoint> = values
        .par_iter()
        .map(|&value| SweepPoint {
            value,
            result: problem
                .with_substitution(var, value)
                .localsolve_with(config.clone()),
        })
        .collect();

    let failed = points.iter().filter(|p| p.result.is_err()).count();
    info!(
        "swept '{}' over {} values ({} failed)",
        var,
        points.len(),
        failed
    );
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintExt;
    use crate::expr::{parameter, scalar_var};
    use approx::assert_relative_eq;

    #[test]
    fn test_sweep_order_and_values() {
        // minimize x s.t. x >= k
        let x = scalar_var("x");
        let k = parameter("k", 1.0, "-").unwrap();
        let problem = Problem::minimize(&x)
            .subject_to([x.geq(&k).unwrap()])
            .build();

        let values = [1.0, 2.0, 4.0, 8.0];
        let points = sweep(&problem, &k, &values, &ScaConfig::default()).unwrap();
        assert_eq!(points.len(), 4);
        for (p, v) in points.iter().zip(values) {
            assert_eq!(p.value, v);
            assert_relative_eq!(p.cost().unwrap(), v, max_relative = 1e-4);
            assert_relative_eq!(p.value_of(&x).unwrap(), v, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_failed_point_does_not_stop_sweep() {
        // x <= 1, x >= k: infeasible for k = 2
        let x = scalar_var("x");
        let k = parameter("k", 0.5, "-").unwrap();
        let problem = Problem::minimize(&x)
            .subject_to([x.leq(1.0).unwrap(), x.geq(&k).unwrap()])
            .build();

        let points = sweep(&problem, &k, &[0.5, 2.0], &ScaConfig::default()).unwrap();
        assert!(points[0].result.is_ok());
        assert!(points[1].result.as_ref().unwrap_err().is_infeasible());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let x = scalar_var("x");
        let other = scalar_var("z");
        let problem = Problem::minimize(&x)
            .subject_to([x.geq(1.0).unwrap()])
            .build();
        assert!(sweep(&problem, &other, &[1.0], &ScaConfig::default()).is_err());
    }
}
