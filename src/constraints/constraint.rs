//! Constraint types for geometric and signomial programs.
//!
//! A constraint compares two signomials:
//! - `Leq`: lhs <= rhs
//! - `Eq`: lhs == rhs
//!
//! Both sides must have the same physical dimension. Whether the constraint is
//! GP-compatible is decided later by `classify`, after fixed values are substituted.

use std::fmt;

use crate::error::Result;
use crate::expr::{Signomial, Values, Variable};

/// Relation between the two sides of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// lhs <= rhs.
    Leq,
    /// lhs == rhs.
    Eq,
}

/// A constraint in a geometric or signomial program.
#[derive(Debug, Clone)]
pub struct Constraint {
    lhs: Signomial,
    rhs: Signomial,
    kind: ConstraintKind,
    label: Option<String>,
    tight: bool,
    fit_rms: Option<f64>,
    fit_exponent: f64,
}

impl Constraint {
    fn build(lhs: Signomial, rhs: Signomial, kind: ConstraintKind) -> Result<Self> {
        let lu = lhs.unit()?;
        let ru = rhs.unit()?;
        if !lhs.is_empty() && !rhs.is_empty() {
            lu.check_compatible(&ru)?;
        }
        Ok(Constraint {
            lhs,
            rhs,
            kind,
            label: None,
            tight: false,
            fit_rms: None,
            fit_exponent: 1.0,
        })
    }

    /// Create an inequality constraint: lhs <= rhs.
    pub fn leq(lhs: impl Into<Signomial>, rhs: impl Into<Signomial>) -> Result<Self> {
        Self::build(lhs.into(), rhs.into(), ConstraintKind::Leq)
    }

    /// Create an inequality constraint: lhs >= rhs.
    pub fn geq(lhs: impl Into<Signomial>, rhs: impl Into<Signomial>) -> Result<Self> {
        Self::build(rhs.into(), lhs.into(), ConstraintKind::Leq)
    }

    /// Create an equality constraint: lhs == rhs.
    pub fn eq(lhs: impl Into<Signomial>, rhs: impl Into<Signomial>) -> Result<Self> {
        Self::build(lhs.into(), rhs.into(), ConstraintKind::Eq)
    }

    /// Attach a label used in logs and warnings.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Expect this constraint to be active at the optimum.
    ///
    /// After a local solve converges, a tight constraint with slack above the
    /// configured tolerance produces a warning.
    pub fn tight(mut self) -> Self {
        self.tight = true;
        self
    }

    /// Record the RMS error of the curve fit this constraint encodes.
    ///
    /// `exponent` is the power the fit output carries inside the constraint, so that
    /// `|ln(lhs / rhs)| / exponent` is the log error of the output itself.
    pub fn with_fit_rms(mut self, rms: f64, exponent: f64) -> Self {
        self.fit_rms = Some(rms);
        self.fit_exponent = exponent;
        self
    }

    /// Smaller side (or left side of an equality).
    pub fn lhs(&self) -> &Signomial {
        &self.lhs
    }

    /// Larger side (or right side of an equality).
    pub fn rhs(&self) -> &Signomial {
        &self.rhs
    }

    /// Relation between the sides.
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Check if the constraint is expected to be active.
    pub fn is_tight(&self) -> bool {
        self.tight
    }

    /// RMS error of the encoded fit, if any.
    pub fn fit_rms(&self) -> Option<f64> {
        self.fit_rms
    }

    /// `lhs - rhs` in SI units with like terms merged.
    pub fn difference(&self) -> Signomial {
        self.lhs.to_si().add_sig(&self.rhs.to_si().neg_sig())
    }

    /// Substitute fixed values into both sides.
    pub fn substitute(&self, subs: &Values) -> Constraint {
        Constraint {
            lhs: self.lhs.substitute(subs),
            rhs: self.rhs.substitute(subs),
            ..self.clone()
        }
    }

    /// Get all variables in this constraint.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = self.lhs.variables();
        vars.extend(self.rhs.variables());
        vars.sort();
        vars.dedup();
        vars
    }

    /// Relative residual `lhs / rhs - 1` at a point.
    ///
    /// Positive values violate an inequality. When the right side is not positive the
    /// absolute difference is returned instead.
    pub fn residual(&self, values: &Values) -> Result<f64> {
        let l = self.lhs.evaluate(values)?;
        let r = self.rhs.evaluate(values)?;
        if r > 0.0 {
            Ok(l / r - 1.0)
        } else {
            Ok(l - r)
        }
    }

    /// Log-space error of the encoded fit output, `|ln(lhs / rhs)| / exponent`.
    ///
    /// Falls back to `|residual|` when either side is not positive.
    pub fn fit_log_error(&self, values: &Values) -> Result<f64> {
        let l = self.lhs.evaluate(values)?;
        let r = self.rhs.evaluate(values)?;
        if l > 0.0 && r > 0.0 {
            Ok((l / r).ln().abs() / self.fit_exponent)
        } else {
            Ok((l - r).abs())
        }
    }

    /// Amount by which the constraint is violated at a point (zero when satisfied).
    pub fn violation(&self, values: &Values) -> Result<f64> {
        let res = self.residual(values)?;
        Ok(match self.kind {
            ConstraintKind::Leq => res.max(0.0),
            ConstraintKind::Eq => res.abs(),
        })
    }

    /// Relative slack `1 - lhs / rhs` of an inequality at a point.
    pub fn slack(&self, values: &Values) -> Result<f64> {
        Ok(-self.residual(values)?)
    }

    /// Label if present, else the formatted constraint.
    pub fn describe(&self) -> String {
        match &self.label {
            Some(l) => l.clone(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            ConstraintKind::Leq => "<=",
            ConstraintKind::Eq => "==",
        };
        write!(f, "{} {} {}", self.lhs, op, self.rhs)
    }
}

/// Extension trait for creating constraints from expressions.
pub trait ConstraintExt {
    /// Create equality constraint: self == rhs.
    fn equals(&self, rhs: impl Into<Signomial>) -> Result<Constraint>;

    /// Create inequality constraint: self <= rhs.
    fn leq(&self, rhs: impl Into<Signomial>) -> Result<Constraint>;

    /// Create inequality constraint: self >= rhs.
    fn geq(&self, rhs: impl Into<Signomial>) -> Result<Constraint>;
}

impl<T> ConstraintExt for T
where
    T: Clone + Into<Signomial>,
{
    fn equals(&self, rhs: impl Into<Signomial>) -> Result<Constraint> {
        Constraint::eq(self.clone(), rhs)
    }

    fn leq(&self, rhs: impl Into<Signomial>) -> Result<Constraint> {
        Constraint::leq(self.clone(), rhs)
    }

    fn geq(&self, rhs: impl Into<Signomial>) -> Result<Constraint> {
        Constraint::geq(self.clone(), rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpError;
    use crate::expr::{parameter, scalar_var, variable};
    use approx::assert_relative_eq;

    #[test]
    fn test_geq_swaps_sides() {
        let x = scalar_var("x");
        let c = Constraint::geq(&x, 2.0).unwrap();
        assert_eq!(c.kind(), ConstraintKind::Leq);
        assert!(c.lhs().as_monomial().unwrap().is_constant());
    }

    #[test]
    fn test_unit_mismatch_rejected() {
        let l = variable("L", "m").unwrap();
        let t = variable("t", "s").unwrap();
        assert!(matches!(
            l.leq(&t),
            Err(GpError::UnitMismatch { .. })
        ));

        let ft = variable("h", "ft").unwrap();
        assert!(l.leq(&ft).is_ok());
    }

    #[test]
    fn test_dimensionless_constant_against_unit_rejected() {
        let l = variable("L", "m").unwrap();
        assert!(l.leq(2.0).is_err());
    }

    #[test]
    fn test_residual_and_slack() {
        let x = scalar_var("x");
        let c = x.leq(2.0).unwrap().tight().named("cap");
        let mut values = Values::new();
        values.insert(x.clone(), 1.5);
        assert_relative_eq!(c.slack(&values).unwrap(), 0.25);
        assert_relative_eq!(c.violation(&values).unwrap(), 0.0);
        values.insert(x.clone(), 3.0);
        assert_relative_eq!(c.violation(&values).unwrap(), 0.5);
        assert!(c.is_tight());
        assert_eq!(c.describe(), "cap");
    }

    #[test]
    fn test_substitute_removes_parameter() {
        let x = scalar_var("x");
        let k = parameter("k", 3.0, "-").unwrap();
        let c = (&x * &k).leq(6.0).unwrap();
        let mut subs = Values::new();
        subs.insert(k.clone(), 3.0);
        let s = c.substitute(&subs);
        assert_eq!(s.variables(), vec![x]);
    }
}
