//! Affine expressions in log space.
//!
//! After the change of variables `y_i = ln x_i`, the logarithm of a positive monomial
//! is affine in `y`: `ln(c * prod x_i^a_i) = sum_i a_i y_i + ln c`.

use std::collections::BTreeMap;

use crate::error::{GpError, Result};
use crate::expr::{Monomial, VarId};

/// A scalar affine expression `sum_i coeffs[i] * col_i + constant`.
///
/// `params` records `d constant / d ln v` for every fixed variable `v` whose value was
/// folded into `constant`, so parameter sensitivities can be recovered from duals.
#[derive(Debug, Clone, Default)]
pub struct LogAffine {
    /// Coefficients per solver column.
    pub coeffs: BTreeMap<VarId, f64>,
    /// Constant offset.
    pub constant: f64,
    /// Derivatives of `constant` with respect to log parameter values.
    pub params: BTreeMap<VarId, f64>,
}

impl LogAffine {
    /// A constant.
    pub fn constant(c: f64) -> Self {
        LogAffine {
            constant: c,
            ..Default::default()
        }
    }

    /// A single column with unit coefficient.
    pub fn column(id: VarId) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(id, 1.0);
        LogAffine {
            coeffs,
            ..Default::default()
        }
    }

    /// Logarithm of a positive monomial, using its SI coefficient.
    pub fn from_monomial(m: &Monomial) -> Result<Self> {
        let c = m.si_coeff();
        if !(c.is_finite() && c > 0.0) {
            return Err(GpError::NumericalError(format!(
                "cannot take the log of monomial '{}' with coefficient {}",
                m, c
            )));
        }
        Ok(LogAffine {
            coeffs: m.exps.iter().map(|(v, a)| (v.id(), *a)).collect(),
            constant: c.ln(),
            params: m.folded().iter().map(|(v, a)| (v.id(), *a)).collect(),
        })
    }

    /// Sum of two expressions.
    pub fn add(&self, other: &LogAffine) -> LogAffine {
        let mut out = self.clone();
        for (id, c) in &other.coeffs {
            *out.coeffs.entry(*id).or_insert(0.0) += c;
        }
        for (id, c) in &other.params {
            *out.params.entry(*id).or_insert(0.0) += c;
        }
        out.constant += other.constant;
        out
    }

    /// Negation.
    pub fn neg(&self) -> LogAffine {
        self.scale(-1.0)
    }

    /// Multiply every coefficient by a scalar.
    pub fn scale(&self, s: f64) -> LogAffine {
        LogAffine {
            coeffs: self.coeffs.iter().map(|(id, c)| (*id, c * s)).collect(),
            constant: self.constant * s,
            params: self.params.iter().map(|(id, c)| (*id, c * s)).collect(),
        }
    }

    /// Add `c` times a column.
    pub fn plus_column(mut self, id: VarId, c: f64) -> LogAffine {
        *self.coeffs.entry(id).or_insert(0.0) += c;
        self
    }

    /// Evaluate at column values.
    pub fn evaluate(&self, cols: &BTreeMap<VarId, f64>) -> f64 {
        self.constant
            + self
                .coeffs
                .iter()
                .map(|(id, c)| c * cols.get(id).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parameter, scalar_var, Values};
    use approx::assert_relative_eq;

    #[test]
    fn test_from_monomial() {
        let x = scalar_var("x");
        let m = 2.0 * &x * &x;
        let la = LogAffine::from_monomial(&m).unwrap();
        assert_relative_eq!(la.constant, 2.0f64.ln());
        assert_relative_eq!(la.coeffs[&x.id()], 2.0);
    }

    #[test]
    fn test_negative_coefficient_rejected() {
        let x = scalar_var("x");
        assert!(LogAffine::from_monomial(&(-1.0 * &x)).is_err());
    }

    #[test]
    fn test_params_follow_linear_ops() {
        let x = scalar_var("x");
        let k = parameter("k", 2.0, "-").unwrap();
        let mut subs = Values::new();
        subs.insert(k.clone(), 2.0);
        let m = (&x * &k).substitute(&subs);
        let la = LogAffine::from_monomial(&m).unwrap();
        assert_relative_eq!(la.params[&k.id()], 1.0);

        let sum = la.neg().add(&LogAffine::column(x.id()));
        assert_relative_eq!(sum.params[&k.id()], -1.0);
        assert_eq!(sum.coeffs[&x.id()], 0.0);
    }
}
