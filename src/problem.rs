//! Problem definition and solving API.
//!
//! The `Problem` struct represents a geometric or signomial program with:
//! - An objective (minimize a posynomial or maximize a monomial)
//! - A set of constraints
//! - Substitutions for fixed variables
//!
//! Use the builder pattern to construct problems:
//! ```ignore
//! let solution = Problem::minimize(objective)
//!     .subject_to([constraint1, constraint2])
//!     .solve()?;
//! ```
//!
//! `solve` accepts only GP-compatible problems. `localsolve` runs the successive
//! convex approximation driver and accepts signomial constraints too.

use log::debug;

use crate::canon::canonicalize;
use crate::constraints::classify::objective_posynomial;
use crate::constraints::{classify, Constraint, GpConstraint, SpConstraint};
use crate::error::{GpError, Result};
use crate::expr::{Monomial, Posynomial, Signomial, Values, Variable};
use crate::solver::{solve, stuff_problem, Settings, Solution, SolveStatus};
use crate::sp::{LocalSolution, ScaConfig, ScaDriver};

/// Objective type for optimization problems.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize a posynomial.
    Minimize(Signomial),
    /// Maximize a monomial (internally converted to minimizing its inverse).
    Maximize(Signomial),
}

impl Objective {
    /// Get the expression being optimized.
    pub fn expr(&self) -> &Signomial {
        match self {
            Objective::Minimize(e) | Objective::Maximize(e) => e,
        }
    }

    /// Check if this is a minimization.
    pub fn is_minimize(&self) -> bool {
        matches!(self, Objective::Minimize(_))
    }
}

/// A geometric or signomial program.
#[derive(Debug, Clone)]
pub struct Problem {
    /// The objective to optimize.
    pub objective: Objective,
    /// The constraints.
    pub constraints: Vec<Constraint>,
    /// Values for fixed variables, overriding values declared on the variables.
    pub substitutions: Values,
}

impl Problem {
    /// Create a minimization problem.
    pub fn minimize(expr: impl Into<Signomial>) -> ProblemBuilder {
        ProblemBuilder::new(Objective::Minimize(expr.into()))
    }

    /// Create a maximization problem.
    pub fn maximize(expr: impl Into<Signomial>) -> ProblemBuilder {
        ProblemBuilder::new(Objective::Maximize(expr.into()))
    }

    /// Get all variables in this problem, including fixed ones.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = self.objective.expr().variables();
        for c in &self.constraints {
            vars.extend(c.variables());
        }
        vars.sort();
        vars.dedup();
        vars
    }

    /// Effective substitutions: declared values, overridden by `substitutions`.
    pub fn fixed_values(&self) -> Values {
        let mut subs: Values = self
            .variables()
            .into_iter()
            .filter_map(|v| v.value().map(|x| (v, x)))
            .collect();
        for (v, x) in &self.substitutions {
            subs.insert(v.clone(), *x);
        }
        subs
    }

    /// Variables left free after substitution.
    pub fn free_variables(&self) -> Vec<Variable> {
        let subs = self.fixed_values();
        self.variables()
            .into_iter()
            .filter(|v| !subs.contains_key(v))
            .collect()
    }

    /// Return a copy with one more substitution.
    pub fn with_substitution(&self, var: &Variable, value: f64) -> Problem {
        let mut p = self.clone();
        p.substitutions.insert(var.clone(), value);
        p
    }

    /// Substitute, classify and split the problem into its GP part and its
    /// signomial constraints.
    pub fn prepare(&self) -> Result<SignomialProgram> {
        let subs = self.fixed_values();
        for (v, x) in &subs {
            if !(x.is_finite() && *x > 0.0) {
                return Err(GpError::InvalidProblem(format!(
                    "substitution for '{}' must be positive and finite, got {}",
                    v, x
                )));
            }
        }

        let raw_obj = self.objective.expr();
        let obj_unit = raw_obj.unit()?;
        let obj = raw_obj.substitute(&subs);
        let (objective, maximize) = match &self.objective {
            Objective::Minimize(_) => (objective_posynomial(&obj)?, false),
            Objective::Maximize(_) => {
                let m = obj.as_monomial().filter(|m| m.coeff > 0.0).ok_or_else(|| {
                    GpError::InvalidProblem(format!(
                        "maximized objective '{}' must be a positive monomial",
                        raw_obj
                    ))
                })?;
                let inv = Monomial::constant(1.0).div_mono(&m.to_si());
                (Posynomial::new(Signomial::from(inv))?, true)
            }
        };

        let constraints: Vec<Constraint> =
            self.constraints.iter().map(|c| c.substitute(&subs)).collect();
        let classified = classify(&constraints)?;

        let free = self.free_variables();
        debug!(
            "prepared problem: {} free variables, {} GP constraints, {} signomial constraints",
            free.len(),
            classified.gp.len(),
            classified.sp.len()
        );

        Ok(SignomialProgram {
            gp: GeometricProgram {
                objective,
                maximize,
                cost_scale: obj_unit.scale(),
                constraints: classified.gp,
                free,
                fixed: subs,
                n_sources: constraints.len(),
            },
            sp: classified.sp,
            constraints,
        })
    }

    /// Solve a GP-compatible problem with default settings.
    pub fn solve(&self) -> Result<Solution> {
        self.solve_with(Settings::default())
    }

    /// Solve a GP-compatible problem with custom settings.
    ///
    /// Fails with `InvalidProblem` if any constraint is signomial; use `localsolve`.
    pub fn solve_with(&self, settings: Settings) -> Result<Solution> {
        let program = self.prepare()?;
        if !program.sp.is_empty() {
            return Err(GpError::InvalidProblem(format!(
                "problem has {} signomial constraint(s); use localsolve",
                program.sp.len()
            )));
        }
        program.gp.solve(&settings)
    }

    /// Solve by successive convex approximation with default configuration.
    pub fn localsolve(&self) -> Result<LocalSolution> {
        self.localsolve_with(ScaConfig::default())
    }

    /// Solve by successive convex approximation.
    pub fn localsolve_with(&self, config: ScaConfig) -> Result<LocalSolution> {
        ScaDriver::new(self, config)?.run()
    }
}

/// A GP in minimization form, after substitution. Coefficients are in SI.
#[derive(Debug, Clone)]
pub struct GeometricProgram {
    /// Posynomial to minimize.
    pub objective: Posynomial,
    /// Whether the user maximized (the objective is then the inverse).
    pub maximize: bool,
    /// SI scale of the user's objective unit.
    pub cost_scale: f64,
    /// GP constraints.
    pub constraints: Vec<GpConstraint>,
    /// Free variables.
    pub free: Vec<Variable>,
    /// Substituted values of fixed variables.
    pub fixed: Values,
    /// Number of user constraints, for per-constraint sensitivities.
    pub n_sources: usize,
}

impl GeometricProgram {
    /// Solve with Clarabel and recover the solution in user units.
    pub fn solve(&self, settings: &Settings) -> Result<Solution> {
        let canon = canonicalize(&self.objective, &self.constraints)?;
        let free_ids: Vec<_> = self.free.iter().map(Variable::id).collect();
        let stuffed = stuff_problem(&canon, &free_ids);
        let raw = solve(&stuffed, settings)?;
        raw.status.into_result("geometric program")?;

        let log_obj = raw.log_objective(&stuffed);
        let cost_si = if self.maximize {
            (-log_obj).exp()
        } else {
            log_obj.exp()
        };

        let mut primal = self.fixed.clone();
        for v in &self.free {
            let y = raw.column(&stuffed, v.id()).unwrap_or(0.0);
            primal.insert(v.clone(), y.exp());
        }

        let sign = if self.maximize { -1.0 } else { 1.0 };
        let param = raw.param_sensitivities(&stuffed);
        let sensitivities: Values = self
            .fixed
            .keys()
            .map(|v| (v.clone(), sign * param.get(&v.id()).copied().unwrap_or(0.0)))
            .collect();

        debug!(
            "GP solved in {} iterations ({:.3e} s), cost {:.6e}",
            raw.iterations, raw.solve_time, cost_si
        );

        Ok(Solution {
            status: SolveStatus::Optimal,
            cost: cost_si / self.cost_scale,
            primal,
            sensitivities,
            constraint_sensitivities: raw.constraint_sensitivities(&stuffed, self.n_sources),
            solve_time: raw.solve_time,
            iterations: raw.iterations,
        })
    }

    /// Copy with extra GP constraints appended.
    pub fn with_constraints(&self, extra: Vec<GpConstraint>) -> GeometricProgram {
        let mut gp = self.clone();
        gp.constraints.extend(extra);
        gp
    }
}

/// A problem split into its GP part and the constraints that need local approximation.
#[derive(Debug, Clone)]
pub struct SignomialProgram {
    /// Objective and GP-compatible constraints.
    pub gp: GeometricProgram,
    /// Signomial constraints.
    pub sp: Vec<SpConstraint>,
    /// All constraints after substitution, indexed as in the problem.
    pub constraints: Vec<Constraint>,
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    objective: Objective,
    constraints: Vec<Constraint>,
    substitutions: Values,
}

impl ProblemBuilder {
    fn new(objective: Objective) -> Self {
        ProblemBuilder {
            objective,
            constraints: Vec::new(),
            substitutions: Values::new(),
        }
    }

    /// Add constraints to the problem.
    pub fn subject_to(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Add a single constraint.
    pub fn constraint(mut self, c: Constraint) -> Self {
        self.constraints.push(c);
        self
    }

    /// Fix a variable to a value (in the variable's unit).
    pub fn substitute(mut self, var: &Variable, value: f64) -> Self {
        self.substitutions.insert(var.clone(), value);
        self
    }

    /// Build the problem.
    pub fn build(self) -> Problem {
        Problem {
            objective: self.objective,
            constraints: self.constraints,
            substitutions: self.substitutions,
        }
    }

    /// Build and solve the problem with default settings.
    pub fn solve(self) -> Result<Solution> {
        self.build().solve()
    }

    /// Build and solve the problem with custom settings.
    pub fn solve_with(self, settings: Settings) -> Result<Solution> {
        self.build().solve_with(settings)
    }

    /// Build and solve by successive convex approximation.
    pub fn localsolve(self) -> Result<LocalSolution> {
        self.build().localsolve()
    }

    /// Build and solve by successive convex approximation with a configuration.
    pub fn localsolve_with(self, config: ScaConfig) -> Result<LocalSolution> {
        self.build().localsolve_with(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintExt;
    use crate::expr::{parameter, scalar_var, variable};
    use approx::assert_relative_eq;

    #[test]
    fn test_problem_builder() {
        let x = scalar_var("x");
        let problem = Problem::minimize(&x).subject_to([x.geq(1.0).unwrap()]).build();
        assert_eq!(problem.variables(), vec![x]);
    }

    #[test]
    fn test_fixed_values_and_overrides() {
        let x = scalar_var("x");
        let k = parameter("k", 2.0, "-").unwrap();
        let problem = Problem::minimize(&x)
            .subject_to([x.geq(&k).unwrap()])
            .build();
        assert_eq!(problem.fixed_values()[&k], 2.0);
        assert_eq!(problem.free_variables(), vec![x.clone()]);
        assert_eq!(problem.with_substitution(&k, 5.0).fixed_values()[&k], 5.0);
    }

    #[test]
    fn test_posynomial_maximize_rejected() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let problem = Problem::maximize(&x + &y).build();
        assert!(matches!(problem.prepare(), Err(GpError::InvalidProblem(_))));
    }

    #[test]
    fn test_signomial_objective_rejected() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let problem = Problem::minimize(&x - &y).build();
        assert!(matches!(problem.prepare(), Err(GpError::InvalidProblem(_))));
    }

    #[test]
    fn test_solve_rejects_signomial_constraints() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        // x - y <= 1 has a two-term right side x <= 1 + y
        let problem = Problem::minimize(&x)
            .subject_to([(&x - &y).leq(1.0).unwrap(), x.geq(2.0).unwrap()])
            .build();
        assert!(matches!(problem.solve(), Err(GpError::InvalidProblem(_))));

        // x - y >= 1 is x >= 1 + y, a posynomial bound
        let gp = Problem::minimize(&x)
            .subject_to([(&x - &y).geq(1.0).unwrap()])
            .build();
        assert!(gp.prepare().unwrap().sp.is_empty());
    }

    #[test]
    fn test_solve_simple_gp() {
        // minimize x s.t. x >= 2
        let x = scalar_var("x");
        let result = Problem::minimize(&x)
            .subject_to([x.geq(2.0).unwrap()])
            .solve()
            .expect("solve failed");

        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.cost - 2.0).abs() < 1e-4, "Expected ~2.0, got {}", result.cost);
        assert_relative_eq!(result[&x], 2.0, max_relative = 1e-4);
    }

    #[test]
    fn test_cost_in_objective_unit() {
        // minimize L [ft] s.t. L >= 1 m
        let l = variable("L", "ft").unwrap();
        let one_m = Monomial::with_unit(1.0, crate::units::Unit::parse("m").unwrap());
        let result = Problem::minimize(&l)
            .subject_to([l.geq(one_m).unwrap()])
            .solve()
            .expect("solve failed");
        assert_relative_eq!(result.cost, 1.0 / 0.3048, max_relative = 1e-4);
        assert_relative_eq!(result[&l], 1.0 / 0.3048, max_relative = 1e-4);
    }
}
