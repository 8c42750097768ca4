//! Clarabel solver integration.
//!
//! This module provides the interface to the Clarabel conic solver and the
//! recovery of GP quantities (objective, primal values, sensitivities) from its
//! primal and dual vectors.

use std::collections::BTreeMap;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use super::stuffing::{ConeDims, StuffedProblem};
use crate::error::{GpError, Result};
use crate::expr::{VarId, Values, Variable};

/// Solution status from the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Iteration or time limit reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations => SolveStatus::MaxIterations,
            SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError => SolveStatus::NumericalError,
            _ => SolveStatus::Unknown,
        }
    }
}

impl SolveStatus {
    /// Convert a non-optimal status into the matching error.
    pub fn into_result(self, context: &str) -> Result<()> {
        match self {
            SolveStatus::Optimal => Ok(()),
            SolveStatus::Infeasible => Err(GpError::Infeasible(context.to_string())),
            SolveStatus::Unbounded => Err(GpError::Unbounded(context.to_string())),
            other => Err(GpError::SolverError(format!(
                "{}: solver stopped with status {:?}",
                context, other
            ))),
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 100,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

/// Raw conic solution in stuffed coordinates.
#[derive(Debug, Clone)]
pub struct RawSolution {
    /// Solution status.
    pub status: SolveStatus,
    /// Primal vector.
    pub x: Vec<f64>,
    /// Dual vector, one entry per stuffed row.
    pub z: Vec<f64>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

impl RawSolution {
    /// Optimal value of the log objective.
    pub fn log_objective(&self, problem: &StuffedProblem) -> f64 {
        self.x[problem.objective_col]
    }

    /// Value of a column (a log variable), if present.
    pub fn column(&self, problem: &StuffedProblem, id: VarId) -> Option<f64> {
        problem.var_map.get(id).map(|col| self.x[col])
    }

    /// `d (log objective) / d ln v` for every fixed variable folded into a row.
    pub fn param_sensitivities(&self, problem: &StuffedProblem) -> BTreeMap<VarId, f64> {
        let mut out = BTreeMap::new();
        for (row, info) in problem.rows.iter().enumerate() {
            for (id, d) in &info.params {
                *out.entry(*id).or_insert(0.0) -= self.z[row] * d;
            }
        }
        out
    }

    /// Decrease of the log objective per unit of log relaxation of each source
    /// constraint (`posy <= 1` becoming `posy <= e^s`). Non-negative for inequalities.
    pub fn constraint_sensitivities(&self, problem: &StuffedProblem, count: usize) -> Vec<f64> {
        let mut out = vec![0.0; count];
        for (row, info) in problem.rows.iter().enumerate() {
            if let Some(src) = info.tag.source {
                if src < count {
                    out[src] += self.z[row] * info.tag.ds;
                }
            }
        }
        out
    }
}

/// Solve the stuffed problem using Clarabel.
pub fn solve(problem: &StuffedProblem, settings: &Settings) -> Result<RawSolution> {
    let p = to_clarabel_csc(&problem.p);
    let a = to_clarabel_csc(&problem.a);
    let cones = to_clarabel_cones(&problem.cone_dims);

    let clarabel_settings = DefaultSettingsBuilder::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit)
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .build()
        .map_err(|e| GpError::SolverError(format!("invalid solver settings: {:?}", e)))?;

    let mut solver = DefaultSolver::new(&p, &problem.q, &a, &problem.b, &cones, clarabel_settings);
    solver.solve();

    Ok(RawSolution {
        status: solver.solution.status.into(),
        x: solver.solution.x.clone(),
        z: solver.solution.z.clone(),
        solve_time: solver.solution.solve_time,
        iterations: solver.info.iterations,
    })
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    for _ in 0..dims.exp {
        cones.push(SupportedConeT::ExponentialConeT());
    }

    cones
}

/// Solution of a geometric program, in user units.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status.
    pub status: SolveStatus,
    /// Optimal objective value, in the objective's unit.
    pub cost: f64,
    /// Values of free variables, and the substituted values of fixed variables.
    pub primal: Values,
    /// `d ln(cost) / d ln(value)` for every fixed variable.
    pub sensitivities: Values,
    /// Objective improvement in log space per unit log relaxation of each
    /// constraint, by constraint index. Zero for inactive constraints.
    pub constraint_sensitivities: Vec<f64>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

impl Solution {
    /// Get the value of a variable.
    pub fn value(&self, var: &Variable) -> Option<f64> {
        self.primal.get(var).copied()
    }

    /// Get the value of a variable, returning an error on failure.
    pub fn try_value(&self, var: &Variable) -> Result<f64> {
        self.value(var).ok_or_else(|| {
            GpError::InvalidProblem(format!("variable '{}' is not in the solution", var))
        })
    }

    /// Sensitivity of the log objective to the log of a fixed variable.
    ///
    /// Zero for fixed variables the optimum does not depend on; `None` for
    /// variables that were not fixed.
    pub fn sensitivity(&self, var: &Variable) -> Option<f64> {
        self.sensitivities.get(var).copied()
    }

    /// Log-space objective improvement per unit log relaxation of a constraint.
    pub fn constraint_sensitivity(&self, idx: usize) -> Option<f64> {
        self.constraint_sensitivities.get(idx).copied()
    }
}

impl std::ops::Index<&Variable> for Solution {
    type Output = f64;

    /// Get the value of a variable using index operator.
    ///
    /// # Panics
    ///
    /// Panics if the variable is not in the solution (use `.value()` to check).
    fn index(&self, var: &Variable) -> &f64 {
        match self.primal.get(var) {
            Some(v) => v,
            None => panic!("variable '{}' is not in the solution", var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 100);
    }

    #[test]
    fn test_to_clarabel_cones() {
        let dims = ConeDims {
            zero: 2,
            nonneg: 3,
            exp: 4,
        };
        let cones = to_clarabel_cones(&dims);
        assert_eq!(cones.len(), 6);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(SolveStatus::from(SolverStatus::AlmostSolved), SolveStatus::Optimal);
        assert_eq!(
            SolveStatus::from(SolverStatus::PrimalInfeasible),
            SolveStatus::Infeasible
        );
        assert!(SolveStatus::Unbounded.into_result("x").unwrap_err().is_unbounded());
        assert!(matches!(
            SolveStatus::MaxIterations.into_result("x"),
            Err(GpError::SolverError(_))
        ));
    }
}
