//! Signomials: sums of monomials with coefficients of any sign.
//!
//! A posynomial is a signomial whose terms all have positive coefficients.
//! `Posynomial` wraps a signomial whose positivity has been checked.

use std::collections::BTreeMap;
use std::fmt;

use super::monomial::Monomial;
use super::variable::{Values, Variable};
use crate::error::{GpError, Result};
use crate::units::Unit;

/// Relative size below which a merged coefficient is treated as cancelled.
const CANCEL_TOL: f64 = 1e-12;

/// Largest integer power a multi-term signomial is expanded to.
pub const MAX_EXPANSION_POWER: u32 = 64;

/// A sum of monomials.
#[derive(Debug, Clone, Default)]
pub struct Signomial {
    /// Terms, in insertion order.
    pub terms: Vec<Monomial>,
}

impl Signomial {
    /// The empty sum.
    pub fn zero() -> Self {
        Signomial { terms: Vec::new() }
    }

    /// A dimensionless constant.
    pub fn constant(c: f64) -> Self {
        Signomial::from(Monomial::constant(c))
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check if there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Check if this is a single term.
    pub fn is_monomial(&self) -> bool {
        self.terms.len() == 1
    }

    /// The single term, if this is a monomial.
    pub fn as_monomial(&self) -> Option<&Monomial> {
        match self.terms.as_slice() {
            [m] => Some(m),
            _ => None,
        }
    }

    /// Check if every coefficient is strictly positive.
    pub fn is_posynomial(&self) -> bool {
        !self.terms.is_empty() && self.terms.iter().all(|t| t.sign().is_positive())
    }

    /// Unit of the expression. Fails if two terms have different dimensions.
    pub fn unit(&self) -> Result<Unit> {
        let mut iter = self.terms.iter();
        let first = match iter.next() {
            Some(t) => t.unit,
            None => return Ok(Unit::dimensionless()),
        };
        for t in iter {
            first.check_compatible(&t.unit)?;
        }
        Ok(first)
    }

    /// Add, checking that the dimensions agree.
    pub fn checked_add(&self, other: &Signomial) -> Result<Signomial> {
        if !self.is_empty() && !other.is_empty() {
            self.unit()?.check_compatible(&other.unit()?)?;
        }
        Ok(self.add_sig(other))
    }

    /// Sum of two signomials (unchecked; see `checked_add`).
    pub fn add_sig(&self, other: &Signomial) -> Signomial {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Signomial { terms }.simplify()
    }

    /// Negation.
    pub fn neg_sig(&self) -> Signomial {
        Signomial {
            terms: self.terms.iter().map(|t| t.scale(-1.0)).collect(),
        }
    }

    /// Product, distributed term by term.
    pub fn mul_sig(&self, other: &Signomial) -> Signomial {
        let mut terms = Vec::with_capacity(self.len() * other.len());
        for a in &self.terms {
            for b in &other.terms {
                terms.push(a.mul_mono(b));
            }
        }
        Signomial { terms }.simplify()
    }

    /// Product with a monomial.
    pub fn mul_mono(&self, m: &Monomial) -> Signomial {
        Signomial {
            terms: self.terms.iter().map(|t| t.mul_mono(m)).collect(),
        }
    }

    /// Quotient by a monomial.
    pub fn div_mono(&self, m: &Monomial) -> Signomial {
        self.mul_mono(&m.powf(-1.0))
    }

    /// Quotient by a signomial. Only single-term divisors have a closed form.
    pub fn try_div(&self, other: &Signomial) -> Result<Signomial> {
        match other.as_monomial() {
            Some(m) => Ok(self.div_mono(m)),
            None => Err(GpError::InvalidProblem(format!(
                "cannot divide by the {}-term expression '{}'",
                other.len(),
                other
            ))),
        }
    }

    /// Raise to a non-negative integer power by expansion.
    pub fn powi(&self, n: u32) -> Signomial {
        let mut acc = Signomial::constant(1.0);
        for _ in 0..n {
            acc = acc.mul_sig(self);
        }
        acc
    }

    /// Raise to a real power.
    ///
    /// Exact for single terms and for non-negative integer powers up to
    /// `MAX_EXPANSION_POWER`. Any other power of a multi-term expression has no
    /// closed form; use `mono_approx` to build a local monomial approximation and
    /// raise that instead.
    pub fn powf(&self, p: f64) -> Result<Signomial> {
        if let Some(m) = self.as_monomial() {
            return Ok(Signomial::from(m.powf(p)));
        }
        if p >= 0.0 && p.fract() == 0.0 {
            if p > MAX_EXPANSION_POWER as f64 {
                return Err(GpError::InvalidProblem(format!(
                    "power {} of the {}-term expression '{}' exceeds the expansion limit {}",
                    p,
                    self.len(),
                    self,
                    MAX_EXPANSION_POWER
                )));
            }
            return Ok(self.powi(p as u32));
        }
        Err(GpError::InvalidProblem(format!(
            "power {} of the {}-term expression '{}' has no exact form",
            p,
            self.len(),
            self
        )))
    }

    /// Merge terms with identical exponents and drop cancelled terms.
    pub fn simplify(self) -> Signomial {
        let mut merged: Vec<Monomial> = Vec::with_capacity(self.terms.len());
        let mut magnitude: Vec<f64> = Vec::with_capacity(self.terms.len());

        for term in self.terms {
            let slot = merged.iter().position(|m| {
                m.same_exponents(&term) && m.unit.same_dimension(&term.unit)
            });
            match slot {
                Some(i) => {
                    let existing = &merged[i];
                    let (a, b) = if existing.unit == term.unit {
                        (existing.clone(), term)
                    } else {
                        (existing.to_si(), term.to_si())
                    };
                    magnitude[i] += b.coeff.abs();
                    merged[i] = merge_like_terms(&a, &b);
                }
                None => {
                    magnitude.push(term.coeff.abs());
                    merged.push(term);
                }
            }
        }

        let terms = merged
            .into_iter()
            .zip(magnitude)
            .filter(|(m, mag)| m.coeff.abs() > CANCEL_TOL * mag)
            .map(|(m, _)| m)
            .collect();
        Signomial { terms }
    }

    /// Evaluate in SI units.
    pub fn evaluate(&self, values: &Values) -> Result<f64> {
        self.terms.iter().map(|t| t.evaluate_si(values)).sum()
    }

    /// Fold substituted values into the coefficients.
    pub fn substitute(&self, subs: &Values) -> Signomial {
        Signomial {
            terms: self.terms.iter().map(|t| t.substitute(subs)).collect(),
        }
        .simplify()
    }

    /// All variables appearing in the expression, ordered by id.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = self
            .terms
            .iter()
            .flat_map(|t| t.exps.keys().cloned())
            .collect();
        vars.sort();
        vars.dedup();
        vars
    }

    /// The same expression with every coefficient in SI.
    pub fn to_si(&self) -> Signomial {
        Signomial {
            terms: self.terms.iter().map(Monomial::to_si).collect(),
        }
    }

    /// Split into positive terms and the negation of the negative terms,
    /// so that `self = pos - neg` with both parts posynomials (or empty).
    pub fn split_signs(&self) -> (Signomial, Signomial) {
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for t in &self.terms {
            if t.coeff > 0.0 {
                pos.push(t.clone());
            } else if t.coeff < 0.0 {
                neg.push(t.scale(-1.0));
            }
        }
        (Signomial { terms: pos }, Signomial { terms: neg })
    }

    /// Local monomial approximation at a point.
    ///
    /// The result has the same value and the same first derivatives in log space at
    /// `values`. For a posynomial it is the tangent of a log-convex function, so it
    /// never exceeds the posynomial anywhere. The result is in SI.
    pub fn mono_approx(&self, values: &Values) -> Result<Monomial> {
        let term_values = self
            .terms
            .iter()
            .map(|t| t.evaluate_si(values))
            .collect::<Result<Vec<f64>>>()?;
        let total: f64 = term_values.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(GpError::NumericalError(format!(
                "cannot approximate '{}' by a monomial: value {} is not positive",
                self, total
            )));
        }

        let mut exps: BTreeMap<Variable, f64> = BTreeMap::new();
        let mut folded: BTreeMap<Variable, f64> = BTreeMap::new();
        for (t, v) in self.terms.iter().zip(&term_values) {
            let w = v / total;
            for (var, a) in &t.exps {
                *exps.entry(var.clone()).or_insert(0.0) += w * a;
            }
            for (var, a) in &t.folded {
                *folded.entry(var.clone()).or_insert(0.0) += w * a;
            }
        }

        let mut coeff = total;
        for (var, a) in &exps {
            let x = values.get(var).copied().ok_or_else(|| {
                GpError::InvalidProblem(format!("no value for variable '{}'", var))
            })?;
            coeff /= x.powf(*a);
        }

        let unit = self.unit()?.to_si();
        let mut m = Monomial::with_unit(coeff, unit);
        m.exps = exps.into_iter().filter(|(_, a)| a.abs() > 1e-14).collect();
        m.folded = folded;
        Ok(m)
    }
}

/// Combine two terms with identical exponents and units.
fn merge_like_terms(a: &Monomial, b: &Monomial) -> Monomial {
    let coeff = a.coeff + b.coeff;
    let mut folded: BTreeMap<Variable, f64> = BTreeMap::new();
    if coeff != 0.0 {
        for (var, f) in &a.folded {
            *folded.entry(var.clone()).or_insert(0.0) += a.coeff * f / coeff;
        }
        for (var, f) in &b.folded {
            *folded.entry(var.clone()).or_insert(0.0) += b.coeff * f / coeff;
        }
    }
    Monomial {
        coeff,
        exps: a.exps.clone(),
        unit: a.unit,
        folded,
    }
}

/// A signomial whose terms are all positive.
#[derive(Debug, Clone)]
pub struct Posynomial(Signomial);

impl Posynomial {
    /// Check positivity and wrap.
    pub fn new(s: Signomial) -> Result<Self> {
        if s.is_posynomial() {
            Ok(Posynomial(s))
        } else {
            Err(GpError::InvalidProblem(format!(
                "'{}' is not a posynomial",
                s
            )))
        }
    }

    /// The underlying signomial.
    pub fn as_signomial(&self) -> &Signomial {
        &self.0
    }

    /// Terms of the posynomial.
    pub fn terms(&self) -> &[Monomial] {
        &self.0.terms
    }

    /// Unwrap.
    pub fn into_inner(self) -> Signomial {
        self.0
    }
}

impl From<Monomial> for Signomial {
    fn from(m: Monomial) -> Self {
        Signomial { terms: vec![m] }
    }
}

impl From<&Monomial> for Signomial {
    fn from(m: &Monomial) -> Self {
        Signomial::from(m.clone())
    }
}

impl From<Variable> for Signomial {
    fn from(v: Variable) -> Self {
        Signomial::from(Monomial::from(v))
    }
}

impl From<&Variable> for Signomial {
    fn from(v: &Variable) -> Self {
        Signomial::from(Monomial::from(v))
    }
}

impl From<&Signomial> for Signomial {
    fn from(s: &Signomial) -> Self {
        s.clone()
    }
}

impl From<f64> for Signomial {
    fn from(c: f64) -> Self {
        Signomial::constant(c)
    }
}

impl From<Posynomial> for Signomial {
    fn from(p: Posynomial) -> Self {
        p.0
    }
}

impl std::iter::Sum for Signomial {
    fn sum<I: Iterator<Item = Signomial>>(iter: I) -> Self {
        let terms = iter.flat_map(|s| s.terms).collect();
        Signomial { terms }.simplify()
    }
}

impl fmt::Display for Signomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, t) in self.terms.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", t)?;
            } else if t.coeff < 0.0 {
                write!(f, " - {}", t.scale(-1.0))?;
            } else {
                write!(f, " + {}", t)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Posynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{scalar_var, variable};
    use approx::assert_relative_eq;

    fn point(pairs: &[(&Variable, f64)]) -> Values {
        pairs.iter().map(|(v, x)| ((*v).clone(), *x)).collect()
    }

    #[test]
    fn test_simplify_merges_like_terms() {
        let x = scalar_var("x");
        let s = &x + &x + 1.0;
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_simplify_cancels() {
        let x = scalar_var("x");
        let s = (&x + 1.0) - &x;
        assert_eq!(s.len(), 1);
        assert!(s.as_monomial().unwrap().is_constant());
    }

    #[test]
    fn test_mixed_scale_merge() {
        let l = variable("L", "m").unwrap();
        let ft = Monomial::with_unit(1.0, Unit::parse("ft").unwrap());
        let m = Monomial::with_unit(1.0, Unit::parse("m").unwrap());
        let s = Signomial::from(ft).add_sig(&Signomial::from(m));
        assert_eq!(s.len(), 1);
        assert_relative_eq!(s.evaluate(&Values::new()).unwrap(), 1.3048, max_relative = 1e-12);
        assert!(s.checked_add(&Signomial::from(&l)).is_ok());
    }

    #[test]
    fn test_unit_mismatch() {
        let l = variable("L", "m").unwrap();
        let w = variable("W", "lbf").unwrap();
        let bad = Signomial::from(&l).checked_add(&Signomial::from(&w));
        assert!(matches!(bad, Err(GpError::UnitMismatch { .. })));
        assert!((&l + &w).unit().is_err());
    }

    #[test]
    fn test_powi_expansion() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let s = (&x + &y).powi(2);
        assert_eq!(s.len(), 3);
        let p = point(&[(&x, 2.0), (&y, 3.0)]);
        assert_relative_eq!(s.evaluate(&p).unwrap(), 25.0, max_relative = 1e-12);
    }

    #[test]
    fn test_powf_expansion_limit() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let s = &x + &y;
        assert_eq!(s.powf(MAX_EXPANSION_POWER as f64).unwrap().len(), 65);
        assert!(matches!(s.powf(1e9), Err(GpError::InvalidProblem(_))));
        // single terms are not expanded
        assert_eq!(Signomial::from(&x).powf(1e9).unwrap().len(), 1);
    }

    #[test]
    fn test_powf_multiterm_rejected() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        assert!((&x + &y).powf(0.5).is_err());
        assert!((&x + &y).powf(3.0).is_ok());
        assert!(Signomial::from(&x).powf(0.5).is_ok());
    }

    #[test]
    fn test_mono_approx_tangent() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        let s = &x + &y;
        let p0 = point(&[(&x, 1.0), (&y, 3.0)]);
        let m = s.mono_approx(&p0).unwrap();
        assert_relative_eq!(m.evaluate(&p0).unwrap(), 4.0, max_relative = 1e-12);
        assert_relative_eq!(m.exponent(&x), 0.25, max_relative = 1e-12);
        assert_relative_eq!(m.exponent(&y), 0.75, max_relative = 1e-12);

        let p1 = point(&[(&x, 5.0), (&y, 0.5)]);
        assert!(m.evaluate(&p1).unwrap() <= s.evaluate(&p1).unwrap());
    }

    #[test]
    fn test_split_signs() {
        let a = scalar_var("a");
        let b = scalar_var("b");
        let (pos, neg) = (&a - &b - 1.0).split_signs();
        assert_eq!(pos.len(), 1);
        assert_eq!(neg.len(), 2);
        assert!(neg.is_posynomial());
    }

    #[test]
    fn test_posynomial_wrapper() {
        let x = scalar_var("x");
        assert!(Posynomial::new(&x + 1.0).is_ok());
        assert!(Posynomial::new(&x - 1.0).is_err());
        assert!(Posynomial::new(Signomial::zero()).is_err());
    }
}
