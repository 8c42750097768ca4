//! Successive convex approximation ("local solve") driver.
//!
//! The driver moves through `Initializing -> Solving -> Converged`, stopping early in
//! `MaxIterExceeded` (an `Ok` outcome carrying the last iterate) or `Infeasible` (an
//! error naming the iteration). Each iteration linearizes every signomial constraint
//! at the current operating point, solves the resulting GP and compares the new
//! operating point with the previous one.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::linearize::linearize_all;
use crate::error::{GpError, Result};
use crate::problem::{Problem, SignomialProgram};
use crate::solver::{Settings, Solution};
use crate::expr::{Values, Variable};

/// Configuration for a local solve.
#[derive(Debug, Clone)]
pub struct ScaConfig {
    /// Largest relative change of any free variable accepted as converged.
    pub tolerance: f64,
    /// Maximum number of GP solves.
    pub max_iterations: usize,
    /// Starting values for free variables.
    pub guess: Values,
    /// Starting value for free variables without a guess.
    pub default_start: f64,
    /// Start from a solve of the GP-compatible constraints alone.
    pub relaxed_start: bool,
    /// Relative slack above which a constraint marked tight triggers a warning.
    pub tight_tolerance: f64,
    /// Allowed excess of a fit log error over the fit's RMS error, as a fraction.
    pub fit_margin: f64,
    /// Settings for each GP solve.
    pub settings: Settings,
}

impl Default for ScaConfig {
    fn default() -> Self {
        ScaConfig {
            tolerance: 1e-4,
            max_iterations: 50,
            guess: Values::new(),
            default_start: 1.0,
            relaxed_start: false,
            tight_tolerance: 1e-3,
            fit_margin: 0.1,
            settings: Settings::default(),
        }
    }
}

impl ScaConfig {
    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set the iteration cap.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Provide a starting value for a free variable.
    pub fn guess(mut self, var: &Variable, value: f64) -> Self {
        self.guess.insert(var.clone(), value);
        self
    }

    /// Start from the GP-compatible subset of the problem.
    pub fn relaxed_start(mut self, on: bool) -> Self {
        self.relaxed_start = on;
        self
    }

    /// Set the slack tolerance for constraints marked tight.
    pub fn tight_tolerance(mut self, tol: f64) -> Self {
        self.tight_tolerance = tol;
        self
    }

    /// Set the fit error margin.
    pub fn fit_margin(mut self, margin: f64) -> Self {
        self.fit_margin = margin;
        self
    }

    /// Set the GP solver settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }
}

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaState {
    /// Building the initial operating point.
    Initializing,
    /// Iterating; holds the 1-based iteration in progress.
    Solving(usize),
    /// The operating point stopped moving.
    Converged,
    /// The iteration cap was reached first.
    MaxIterExceeded,
    /// A linearized GP was infeasible.
    Infeasible,
}

/// Terminal status of a successful local solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaStatus {
    /// Converged within tolerance.
    Converged,
    /// Stopped at the iteration cap; the last iterate is reported.
    MaxIterExceeded,
}

/// Diagnostics for one iteration.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Objective of the linearized GP.
    pub cost: f64,
    /// Largest violation of any original constraint at the new point.
    pub max_violation: f64,
    /// Largest relative change of a free variable.
    pub max_change: f64,
}

/// Outcome of a local solve.
#[derive(Debug, Clone)]
pub struct LocalSolution {
    /// How the driver stopped.
    pub status: ScaStatus,
    /// Last GP solution.
    pub solution: Solution,
    /// Number of GP solves performed.
    pub iterations: usize,
    /// Last operating point (free variables only).
    pub operating_point: Values,
    /// Per-iteration diagnostics.
    pub history: Vec<IterationRecord>,
    /// Non-fatal model-validity warnings.
    pub warnings: Vec<String>,
}

impl LocalSolution {
    /// Check if the driver converged.
    pub fn is_converged(&self) -> bool {
        self.status == ScaStatus::Converged
    }

    /// Objective value in the objective's unit.
    pub fn cost(&self) -> f64 {
        self.solution.cost
    }

    /// Value of a variable in the last solution.
    pub fn value(&self, var: &Variable) -> Option<f64> {
        self.solution.value(var)
    }
}

impl std::ops::Index<&Variable> for LocalSolution {
    type Output = f64;

    fn index(&self, var: &Variable) -> &f64 {
        &self.solution[var]
    }
}

/// The local-solve state machine.
#[derive(Debug)]
pub struct ScaDriver {
    program: SignomialProgram,
    config: ScaConfig,
    state: ScaState,
}

impl ScaDriver {
    /// Prepare a problem for local solving.
    pub fn new(problem: &Problem, config: ScaConfig) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(GpError::InvalidProblem(
                "max_iterations must be at least 1".into(),
            ));
        }
        if config.tolerance.is_nan() || config.tolerance <= 0.0 {
            return Err(GpError::InvalidProblem(format!(
                "tolerance must be positive, got {}",
                config.tolerance
            )));
        }
        Ok(ScaDriver {
            program: problem.prepare()?,
            config,
            state: ScaState::Initializing,
        })
    }

    /// Current state.
    pub fn state(&self) -> ScaState {
        self.state
    }

    /// The substituted and classified problem.
    pub fn program(&self) -> &SignomialProgram {
        &self.program
    }

    /// Build the starting operating point.
    pub fn initial_point(&self) -> Result<Values> {
        let mut point = Values::new();
        for v in &self.program.gp.free {
            let x = self
                .config
                .guess
                .get(v)
                .copied()
                .unwrap_or(self.config.default_start);
            if !(x.is_finite() && x > 0.0) {
                return Err(GpError::InvalidProblem(format!(
                    "initial value for '{}' must be positive, got {}",
                    v, x
                )));
            }
            point.insert(v.clone(), x);
        }

        if self.config.relaxed_start {
            match self.program.gp.solve(&self.config.settings) {
                Ok(sol) => {
                    debug!("starting from the GP-compatible subset");
                    for v in &self.program.gp.free {
                        if !self.config.guess.contains_key(v) {
                            if let Some(x) = sol.value(v) {
                                point.insert(v.clone(), x);
                            }
                        }
                    }
                }
                Err(e) if e.is_unbounded() => {
                    debug!("GP-compatible subset is unbounded; using default start");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(point)
    }

    /// Run one linearize-and-solve iteration at `point`.
    pub fn step(&self, point: &Values) -> Result<Solution> {
        let linearized = linearize_all(&self.program.sp, point)?;
        self.program
            .gp
            .with_constraints(linearized)
            .solve(&self.config.settings)
    }

    /// Free-variable values of a solution.
    pub fn operating_point(&self, solution: &Solution) -> Values {
        self.program
            .gp
            .free
            .iter()
            .filter_map(|v| solution.value(v).map(|x| (v.clone(), x)))
            .collect()
    }

    /// Iterate to convergence or the iteration cap.
    pub fn run(&mut self) -> Result<LocalSolution> {
        self.state = ScaState::Initializing;

        if self.program.sp.is_empty() {
            info!("no signomial constraints; solving as a single GP");
            self.state = ScaState::Solving(1);
            let solution = self.program.gp.solve(&self.config.settings).map_err(|e| {
                if e.is_infeasible() {
                    self.state = ScaState::Infeasible;
                }
                e
            })?;
            self.state = ScaState::Converged;
            let operating_point = self.operating_point(&solution);
            let record = IterationRecord {
                iteration: 1,
                cost: solution.cost,
                max_violation: self.max_violation(&solution.primal)?,
                max_change: 0.0,
            };
            let warnings = self.check_constraints(&solution.primal)?;
            return Ok(LocalSolution {
                status: ScaStatus::Converged,
                solution,
                iterations: 1,
                operating_point,
                history: vec![record],
                warnings,
            });
        }

        let mut point = self.initial_point().map_err(|e| {
            if e.is_infeasible() {
                self.state = ScaState::Infeasible;
            }
            e
        })?;
        let mut history = Vec::new();
        let mut last: Option<Solution> = None;

        for iteration in 1..=self.config.max_iterations {
            self.state = ScaState::Solving(iteration);
            let solution = match self.step(&point) {
                Ok(s) => s,
                Err(GpError::Infeasible(msg)) => {
                    self.state = ScaState::Infeasible;
                    return Err(GpError::Infeasible(format!(
                        "linearized GP at iteration {}: {}",
                        iteration, msg
                    )));
                }
                Err(e) => return Err(e),
            };

            let new_point = self.operating_point(&solution);
            let max_change = max_relative_change(&point, &new_point);
            let max_violation = self.max_violation(&solution.primal)?;
            debug!(
                "SCA iteration {}: cost {:.6e}, max violation {:.3e}, max change {:.3e}",
                iteration, solution.cost, max_violation, max_change
            );
            history.push(IterationRecord {
                iteration,
                cost: solution.cost,
                max_violation,
                max_change,
            });
            point = new_point;

            if max_change < self.config.tolerance {
                self.state = ScaState::Converged;
                info!(
                    "SCA converged in {} iterations, cost {:.6e}",
                    iteration, solution.cost
                );
                let warnings = self.check_constraints(&solution.primal)?;
                return Ok(LocalSolution {
                    status: ScaStatus::Converged,
                    solution,
                    iterations: iteration,
                    operating_point: point,
                    history,
                    warnings,
                });
            }
            last = Some(solution);
        }

        self.state = ScaState::MaxIterExceeded;
        warn!(
            "SCA stopped after {} iterations without converging (tolerance {:.1e})",
            self.config.max_iterations, self.config.tolerance
        );
        let solution = last.ok_or_else(|| {
            GpError::SolverError("local solve finished without any GP solution".into())
        })?;
        Ok(LocalSolution {
            status: ScaStatus::MaxIterExceeded,
            solution,
            iterations: self.config.max_iterations,
            operating_point: point,
            history,
            warnings: Vec::new(),
        })
    }

    fn max_violation(&self, values: &Values) -> Result<f64> {
        let mut worst: f64 = 0.0;
        for c in &self.program.constraints {
            worst = worst.max(c.violation(values)?);
        }
        Ok(worst)
    }

    /// Warnings for constraints expected to be tight and for fits used beyond
    /// their accuracy. Fit constraints sharing a label are checked as one fit,
    /// using the smallest log error of the fit output among them.
    fn check_constraints(&self, values: &Values) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut fits: HashMap<String, (f64, f64)> = HashMap::new();

        for (idx, c) in self.program.constraints.iter().enumerate() {
            if c.is_tight() {
                let slack = c.slack(values)?;
                if slack > self.config.tight_tolerance {
                    let msg = format!(
                        "constraint '{}' is not tight: relative slack {:.3e}",
                        c.describe(),
                        slack
                    );
                    warn!("{}", msg);
                    warnings.push(msg);
                }
            }
            if let Some(rms) = c.fit_rms() {
                let key = c.label().map(str::to_string).unwrap_or_else(|| idx.to_string());
                let err = c.fit_log_error(values)?;
                let entry = fits.entry(key).or_insert((rms, f64::INFINITY));
                entry.1 = entry.1.min(err);
            }
        }

        let mut fits: Vec<_> = fits.into_iter().collect();
        fits.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, (rms, err)) in fits {
            if err > rms * (1.0 + self.config.fit_margin) {
                let msg = format!(
                    "fit '{}' log error {:.3e} exceeds its RMS error {:.3e}",
                    name, err, rms
                );
                warn!("{}", msg);
                warnings.push(msg);
            }
        }
        Ok(warnings)
    }
}

/// Largest `|new - old| / old` over the variables of `old`.
pub fn max_relative_change(old: &Values, new: &Values) -> f64 {
    old.iter()
        .map(|(v, &x0)| match new.get(v) {
            Some(&x1) => (x1 - x0).abs() / x0.abs().max(f64::MIN_POSITIVE),
            None => f64::INFINITY,
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintExt;
    use crate::expr::scalar_var;

    #[test]
    fn test_max_relative_change() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let old: Values = [(x.clone(), 1.0), (y.clone(), 4.0)].into_iter().collect();
        let new: Values = [(x.clone(), 1.1), (y.clone(), 4.0)].into_iter().collect();
        assert!((max_relative_change(&old, &new) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let x = scalar_var("x");
        let problem = Problem::minimize(&x).subject_to([x.geq(1.0).unwrap()]).build();
        let err = ScaDriver::new(&problem, ScaConfig::default().max_iterations(0)).unwrap_err();
        assert!(matches!(err, GpError::InvalidProblem(_)));
    }

    #[test]
    fn test_initial_point_uses_guess_and_default() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let problem = Problem::minimize(&x)
            .subject_to([x.geq(&y + 1.0).unwrap(), y.leq(2.0).unwrap()])
            .build();
        let config = ScaConfig::default().guess(&x, 5.0);
        let driver = ScaDriver::new(&problem, config).unwrap();
        assert_eq!(driver.state(), ScaState::Initializing);
        let p = driver.initial_point().unwrap();
        assert_eq!(p[&x], 5.0);
        assert_eq!(p[&y], 1.0);
    }
}
