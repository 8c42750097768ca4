//! Monomials: a coefficient times a product of variable powers.

use std::collections::BTreeMap;
use std::fmt;

use super::variable::{Values, Variable};
use crate::error::{GpError, Result};
use crate::units::Unit;

/// Exponents closer to zero than this are dropped.
const EXP_TOL: f64 = 1e-14;

/// A monomial `c * x_1^a_1 * ... * x_n^a_n`.
///
/// `unit` is the unit of the whole term. Evaluating the term with every variable in
/// its own unit gives a value in `unit`; multiplying by `unit.scale()` gives SI.
#[derive(Debug, Clone)]
pub struct Monomial {
    /// Signed coefficient.
    pub coeff: f64,
    /// Variable exponents.
    pub exps: BTreeMap<Variable, f64>,
    /// Unit of the whole term.
    pub unit: Unit,
    /// Exponents of parameters already folded into `coeff` by substitution,
    /// expressed as `d ln|coeff| / d ln value`.
    pub(crate) folded: BTreeMap<Variable, f64>,
}

impl Monomial {
    /// A dimensionless constant.
    pub fn constant(c: f64) -> Self {
        Monomial::with_unit(c, Unit::dimensionless())
    }

    /// A constant carrying a unit.
    pub fn with_unit(c: f64, unit: Unit) -> Self {
        Monomial {
            coeff: c,
            exps: BTreeMap::new(),
            unit,
            folded: BTreeMap::new(),
        }
    }

    /// Build a monomial from a coefficient, the unit of the coefficient and exponents.
    pub fn new(coeff: f64, coeff_unit: Unit, exps: impl IntoIterator<Item = (Variable, f64)>) -> Self {
        let mut m = Monomial::with_unit(coeff, coeff_unit);
        for (var, a) in exps {
            m.unit = m.unit * var.unit().powf(a);
            *m.exps.entry(var).or_insert(0.0) += a;
        }
        m.exps.retain(|_, a| a.abs() > EXP_TOL);
        m
    }

    /// Check if the monomial has no variables.
    pub fn is_constant(&self) -> bool {
        self.exps.is_empty()
    }

    /// Exponent of a variable (zero if absent).
    pub fn exponent(&self, var: &Variable) -> f64 {
        self.exps.get(var).copied().unwrap_or(0.0)
    }

    /// Coefficient expressed in SI units.
    pub fn si_coeff(&self) -> f64 {
        self.coeff * self.unit.scale()
    }

    /// The same term with its coefficient converted to SI.
    pub fn to_si(&self) -> Monomial {
        Monomial {
            coeff: self.si_coeff(),
            exps: self.exps.clone(),
            unit: self.unit.to_si(),
            folded: self.folded.clone(),
        }
    }

    /// Check if two monomials have identical exponents.
    pub fn same_exponents(&self, other: &Monomial) -> bool {
        self.exps.len() == other.exps.len()
            && self
                .exps
                .iter()
                .zip(other.exps.iter())
                .all(|((va, a), (vb, b))| va == vb && (a - b).abs() <= EXP_TOL)
    }

    /// Product of two monomials.
    pub fn mul_mono(&self, other: &Monomial) -> Monomial {
        let mut exps = self.exps.clone();
        for (var, a) in &other.exps {
            *exps.entry(var.clone()).or_insert(0.0) += a;
        }
        exps.retain(|_, a| a.abs() > EXP_TOL);

        let mut folded = self.folded.clone();
        for (var, a) in &other.folded {
            *folded.entry(var.clone()).or_insert(0.0) += a;
        }

        Monomial {
            coeff: self.coeff * other.coeff,
            exps,
            unit: self.unit * other.unit,
            folded,
        }
    }

    /// Quotient of two monomials.
    pub fn div_mono(&self, other: &Monomial) -> Monomial {
        self.mul_mono(&other.powf(-1.0))
    }

    /// Raise to a real power. Exact for monomials.
    ///
    /// A negative coefficient raised to a non-integer power yields a NaN coefficient,
    /// which is rejected when the constraint is classified.
    pub fn powf(&self, p: f64) -> Monomial {
        Monomial {
            coeff: self.coeff.powf(p),
            exps: self
                .exps
                .iter()
                .map(|(v, a)| (v.clone(), a * p))
                .filter(|(_, a)| a.abs() > EXP_TOL)
                .collect(),
            unit: self.unit.powf(p),
            folded: self.folded.iter().map(|(v, a)| (v.clone(), a * p)).collect(),
        }
    }

    /// Scale the coefficient.
    pub fn scale(&self, factor: f64) -> Monomial {
        let mut m = self.clone();
        m.coeff *= factor;
        m
    }

    /// Evaluate in the term's own unit.
    pub fn evaluate(&self, values: &Values) -> Result<f64> {
        let mut acc = self.coeff;
        for (var, a) in &self.exps {
            let x = values.get(var).copied().ok_or_else(|| {
                GpError::InvalidProblem(format!("no value for variable '{}'", var))
            })?;
            acc *= x.powf(*a);
        }
        Ok(acc)
    }

    /// Evaluate in SI units.
    pub fn evaluate_si(&self, values: &Values) -> Result<f64> {
        Ok(self.evaluate(values)? * self.unit.scale())
    }

    /// Fold the values of substituted variables into the coefficient.
    ///
    /// Folded exponents are remembered so that sensitivities to the substituted
    /// parameters can be reported after solving.
    pub fn substitute(&self, subs: &Values) -> Monomial {
        let mut out = Monomial {
            coeff: self.coeff,
            exps: BTreeMap::new(),
            unit: self.unit,
            folded: self.folded.clone(),
        };
        for (var, a) in &self.exps {
            match subs.get(var) {
                Some(&v) => {
                    out.coeff *= v.powf(*a);
                    *out.folded.entry(var.clone()).or_insert(0.0) += a;
                }
                None => {
                    out.exps.insert(var.clone(), *a);
                }
            }
        }
        out
    }

    /// Folded parameter exponents.
    pub fn folded(&self) -> &BTreeMap<Variable, f64> {
        &self.folded
    }
}

impl From<Variable> for Monomial {
    fn from(var: Variable) -> Self {
        let unit = var.unit();
        let mut exps = BTreeMap::new();
        exps.insert(var, 1.0);
        Monomial {
            coeff: 1.0,
            exps,
            unit,
            folded: BTreeMap::new(),
        }
    }
}

impl From<&Variable> for Monomial {
    fn from(var: &Variable) -> Self {
        Monomial::from(var.clone())
    }
}

impl From<&Monomial> for Monomial {
    fn from(m: &Monomial) -> Self {
        m.clone()
    }
}

impl From<f64> for Monomial {
    fn from(c: f64) -> Self {
        Monomial::constant(c)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if (self.coeff - 1.0).abs() > 1e-12 || self.exps.is_empty() {
            parts.push(format!("{}", self.coeff));
        }
        for (var, a) in &self.exps {
            if (a - 1.0).abs() < EXP_TOL {
                parts.push(var.name().to_string());
            } else {
                parts.push(format!("{}^{}", var.name(), a));
            }
        }
        write!(f, "{}", parts.join("*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parameter, scalar_var, variable};
    use approx::assert_relative_eq;

    #[test]
    fn test_mul_adds_exponents() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let m = Monomial::new(2.0, Unit::dimensionless(), [(x.clone(), 2.0), (y.clone(), -1.0)]);
        let n = Monomial::new(3.0, Unit::dimensionless(), [(x.clone(), -2.0)]);
        let p = m.mul_mono(&n);
        assert_relative_eq!(p.coeff, 6.0);
        assert_eq!(p.exponent(&x), 0.0);
        assert!(!p.exps.contains_key(&x));
        assert_relative_eq!(p.exponent(&y), -1.0);
    }

    #[test]
    fn test_powf_units() {
        let s = variable("S", "ft**2").unwrap();
        let m = Monomial::from(&s).powf(0.5);
        assert!(m.unit.same_dimension(&Unit::parse("m").unwrap()));
        assert_relative_eq!(m.unit.scale(), 0.3048, max_relative = 1e-12);
    }

    #[test]
    fn test_evaluate_si() {
        let l = variable("L", "ft").unwrap();
        let m = Monomial::from(&l).scale(2.0);
        let mut values = Values::new();
        values.insert(l, 10.0);
        assert_relative_eq!(m.evaluate(&values).unwrap(), 20.0);
        assert_relative_eq!(m.evaluate_si(&values).unwrap(), 20.0 * 0.3048);
    }

    #[test]
    fn test_substitute_tracks_folded() {
        let x = scalar_var("x");
        let k = parameter("k", 4.0, "-").unwrap();
        let m = Monomial::new(1.0, Unit::dimensionless(), [(x.clone(), 1.0), (k.clone(), 0.5)]);
        let mut subs = Values::new();
        subs.insert(k.clone(), 4.0);
        let s = m.substitute(&subs);
        assert_relative_eq!(s.coeff, 2.0);
        assert!(!s.exps.contains_key(&k));
        assert_relative_eq!(s.folded()[&k], 0.5);
    }

    #[test]
    fn test_missing_value_is_error() {
        let x = scalar_var("x");
        let m = Monomial::from(&x);
        assert!(m.evaluate(&Values::new()).is_err());
    }
}
