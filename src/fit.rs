//! Precomputed curve fits turned into GP constraints.
//!
//! A fit relates a positive output `w` to positive inputs `u` through terms
//! `exp(b_k) * prod_i u_i^a_ki`:
//! - `MaxAffine`: `w = max_k term_k`, encoded as one constraint `w >= term_k` per term
//! - `SoftmaxAffine { alpha }`: `w^alpha = sum_k term_k^alpha`
//! - `ImplicitSoftmaxAffine { alphas }`: `1 = sum_k (term_k / w)^alpha_k`
//!
//! Tables are plain JSON. Each declares the RMS error of the fit in log space, which
//! `validate` checks against the stored samples and which the local-solve driver
//! compares against the log error of the output at the optimum.

use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::constraints::Constraint;
use crate::error::{GpError, Result};
use crate::expr::{Monomial, Signomial};
use crate::units::Unit;

/// Slack allowed between the measured and declared RMS error.
const RMS_RTOL: f64 = 0.01;
const RMS_ATOL: f64 = 1e-9;

/// Functional form of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FitKind {
    /// Pointwise maximum of monomials.
    MaxAffine,
    /// Smooth maximum with a shared softness parameter.
    SoftmaxAffine { alpha: f64 },
    /// Smooth maximum with one softness parameter per term.
    ImplicitSoftmaxAffine { alphas: Vec<f64> },
}

/// One monomial term `exp(log_coeff) * prod_i u_i^exponents[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitTerm {
    pub log_coeff: f64,
    pub exponents: Vec<f64>,
}

/// A data point the fit was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSample {
    pub inputs: Vec<f64>,
    pub output: f64,
}

/// A fit coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitTable {
    pub kind: FitKind,
    pub terms: Vec<FitTerm>,
    /// Declared RMS error of `ln w` over the samples.
    pub rms_error: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<FitSample>,
}

impl FitTable {
    /// Parse and validate a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: FitTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Read, parse and validate a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of inputs.
    pub fn n_inputs(&self) -> usize {
        self.terms.first().map_or(0, |t| t.exponents.len())
    }

    /// Check structure and, when samples are present, the declared RMS error.
    pub fn validate(&self) -> Result<()> {
        if self.terms.is_empty() {
            return Err(GpError::FitError("fit has no terms".into()));
        }
        let n = self.n_inputs();
        if self.terms.iter().any(|t| t.exponents.len() != n) {
            return Err(GpError::FitError(
                "fit terms have different numbers of exponents".into(),
            ));
        }
        if !(self.rms_error.is_finite() && self.rms_error >= 0.0) {
            return Err(GpError::FitError(format!(
                "declared RMS error must be non-negative, got {}",
                self.rms_error
            )));
        }
        match &self.kind {
            FitKind::MaxAffine => {}
            FitKind::SoftmaxAffine { alpha } => {
                if alpha.is_nan() || *alpha <= 0.0 {
                    return Err(GpError::FitError(format!("alpha must be positive, got {}", alpha)));
                }
            }
            FitKind::ImplicitSoftmaxAffine { alphas } => {
                if alphas.len() != self.terms.len() {
                    return Err(GpError::FitError(format!(
                        "{} alphas for {} terms",
                        alphas.len(),
                        self.terms.len()
                    )));
                }
                if alphas.iter().any(|a| a.is_nan() || *a <= 0.0) {
                    return Err(GpError::FitError("alphas must be positive".into()));
                }
            }
        }

        if !self.samples.is_empty() {
            let rms = self.sample_rms()?;
            if rms > self.rms_error * (1.0 + RMS_RTOL) + RMS_ATOL {
                return Err(GpError::FitError(format!(
                    "RMS error on samples is {:.4e}, table declares {:.4e}",
                    rms, self.rms_error
                )));
            }
        }
        Ok(())
    }

    /// Log-space RMS error of the table on its samples.
    pub fn sample_rms(&self) -> Result<f64> {
        if self.samples.is_empty() {
            return Err(GpError::FitError("fit has no samples".into()));
        }
        let mut sum = 0.0;
        for s in &self.samples {
            if s.output.is_nan() || s.output <= 0.0 {
                return Err(GpError::FitError(format!(
                    "sample output must be positive, got {}",
                    s.output
                )));
            }
            let err = self.evaluate(&s.inputs)?.ln() - s.output.ln();
            sum += err * err;
        }
        Ok((sum / self.samples.len() as f64).sqrt())
    }

    fn log_terms(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        if inputs.len() != self.n_inputs() {
            return Err(GpError::FitError(format!(
                "fit takes {} inputs, got {}",
                self.n_inputs(),
                inputs.len()
            )));
        }
        if inputs.iter().any(|u| u.is_nan() || *u <= 0.0) {
            return Err(GpError::FitError("fit inputs must be positive".into()));
        }
        Ok(self
            .terms
            .iter()
            .map(|t| {
                t.log_coeff
                    + t.exponents
                        .iter()
                        .zip(inputs)
                        .map(|(a, u)| a * u.ln())
                        .sum::<f64>()
            })
            .collect())
    }

    /// Evaluate the fitted output at positive inputs.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<f64> {
        let z = self.log_terms(inputs)?;
        let ln_w = match &self.kind {
            FitKind::MaxAffine => z.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            FitKind::SoftmaxAffine { alpha } => log_sum_exp(z.iter().map(|zk| alpha * zk)) / alpha,
            FitKind::ImplicitSoftmaxAffine { alphas } => implicit_log_output(&z, alphas),
        };
        Ok(ln_w.exp())
    }

    /// GP constraints encoding `output = fit(inputs)` (as the GP-compatible
    /// inequality `output >= fit(inputs)`), labelled and tagged with the RMS error.
    ///
    /// Inputs and output must be dimensionless.
    pub fn constraints(
        &self,
        label: &str,
        output: impl Into<Monomial>,
        inputs: &[Monomial],
    ) -> Result<Vec<Constraint>> {
        if inputs.len() != self.n_inputs() {
            return Err(GpError::FitError(format!(
                "fit '{}' takes {} inputs, got {}",
                label,
                self.n_inputs(),
                inputs.len()
            )));
        }
        let w = output.into();
        let dimensionless = Unit::dimensionless();
        for m in inputs.iter().chain(std::iter::once(&w)) {
            dimensionless.check_compatible(&m.unit)?;
        }

        let term = |t: &FitTerm, scale: f64| -> Monomial {
            t.exponents
                .iter()
                .zip(inputs)
                .fold(Monomial::constant((scale * t.log_coeff).exp()), |acc, (a, u)| {
                    acc.mul_mono(&u.powf(scale * a))
                })
        };

        let tag = |c: Constraint, exponent: f64| {
            c.named(label).with_fit_rms(self.rms_error, exponent)
        };
        let out = match &self.kind {
            FitKind::MaxAffine => self
                .terms
                .iter()
                .map(|t| Constraint::geq(w.clone(), term(t, 1.0)).map(|c| tag(c, 1.0)))
                .collect::<Result<Vec<_>>>()?,
            FitKind::SoftmaxAffine { alpha } => {
                let rhs: Signomial = self
                    .terms
                    .iter()
                    .map(|t| Signomial::from(term(t, *alpha)))
                    .sum();
                vec![tag(Constraint::geq(w.powf(*alpha), rhs)?, *alpha)]
            }
            FitKind::ImplicitSoftmaxAffine { alphas } => {
                let rhs: Signomial = self
                    .terms
                    .iter()
                    .zip(alphas)
                    .map(|(t, a)| Signomial::from(term(t, *a).div_mono(&w.powf(*a))))
                    .sum();
                // the output enters with every alpha; the largest bounds its sensitivity
                let exponent = alphas.iter().copied().fold(0.0, f64::max);
                vec![tag(Constraint::geq(1.0, rhs)?, exponent)]
            }
        };
        Ok(out)
    }

    /// Least-squares monomial fit `w = exp(b) * prod_i u_i^a_i` in log space.
    ///
    /// The result is a single-term `MaxAffine` table carrying its samples and
    /// measured RMS error.
    pub fn monomial_fit(inputs: &[Vec<f64>], outputs: &[f64]) -> Result<FitTable> {
        let m = outputs.len();
        if m == 0 || inputs.len() != m {
            return Err(GpError::FitError(format!(
                "{} input rows for {} outputs",
                inputs.len(),
                m
            )));
        }
        let d = inputs[0].len();
        if inputs.iter().any(|r| r.len() != d) {
            return Err(GpError::FitError("input rows have different lengths".into()));
        }
        if m < d + 1 {
            return Err(GpError::FitError(format!(
                "{} samples cannot determine {} coefficients",
                m,
                d + 1
            )));
        }
        let positive = inputs.iter().flatten().chain(outputs).all(|v| *v > 0.0);
        if !positive {
            return Err(GpError::FitError("fit data must be positive".into()));
        }

        let x = DMatrix::from_fn(m, d + 1, |i, j| if j == 0 { 1.0 } else { inputs[i][j - 1].ln() });
        let y = DVector::from_iterator(m, outputs.iter().map(|w| w.ln()));
        let coef = x
            .svd(true, true)
            .solve(&y, 1e-12)
            .map_err(|e| GpError::FitError(e.to_string()))?;

        let mut table = FitTable {
            kind: FitKind::MaxAffine,
            terms: vec![FitTerm {
                log_coeff: coef[0],
                exponents: coef.iter().skip(1).copied().collect(),
            }],
            rms_error: 0.0,
            samples: inputs
                .iter()
                .zip(outputs)
                .map(|(u, w)| FitSample {
                    inputs: u.clone(),
                    output: *w,
                })
                .collect(),
        };
        table.rms_error = table.sample_rms()?;
        Ok(table)
    }
}

fn log_sum_exp(values: impl Iterator<Item = f64>) -> f64 {
    let v: Vec<f64> = values.collect();
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + v.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Solve `sum_k exp(alpha_k (z_k - s)) = 1` for `s = ln w` by bisection.
fn implicit_log_output(z: &[f64], alphas: &[f64]) -> f64 {
    let g = |s: f64| z.iter().zip(alphas).map(|(zk, a)| (a * (zk - s)).exp()).sum::<f64>() - 1.0;
    // g is decreasing in s; the largest z_k is a lower bound on the root.
    let mut lo = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut hi = lo + 1.0;
    while g(hi) > 0.0 {
        hi += 2.0 * (hi - lo);
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if g(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-14 {
            break;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::classify;
    use crate::expr::{scalar_var, Values};
    use approx::assert_relative_eq;

    fn softmax_table() -> FitTable {
        FitTable {
            kind: FitKind::SoftmaxAffine { alpha: 2.0 },
            terms: vec![
                FitTerm {
                    log_coeff: 0.0,
                    exponents: vec![1.0],
                },
                FitTerm {
                    log_coeff: 1.0,
                    exponents: vec![0.5],
                },
            ],
            rms_error: 0.01,
            samples: Vec::new(),
        }
    }

    #[test]
    fn test_json_roundtrip_and_tag() {
        let json = r#"{
            "kind": {"type": "SoftmaxAffine", "alpha": 2.0},
            "terms": [
                {"log_coeff": 0.0, "exponents": [1.0]},
                {"log_coeff": 1.0, "exponents": [0.5]}
            ],
            "rms_error": 0.01
        }"#;
        let table = FitTable::from_json(json).unwrap();
        assert_eq!(table, softmax_table());
    }

    #[test]
    fn test_softmax_evaluate() {
        let table = softmax_table();
        let u: f64 = 4.0;
        let expected = (u.powi(2) + (2.0 * 1.0f64).exp() * u).sqrt();
        assert_relative_eq!(table.evaluate(&[u]).unwrap(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_implicit_matches_softmax_with_equal_alphas() {
        let mut implicit = softmax_table();
        implicit.kind = FitKind::ImplicitSoftmaxAffine {
            alphas: vec![2.0, 2.0],
        };
        let a = softmax_table().evaluate(&[3.0]).unwrap();
        let b = implicit.evaluate(&[3.0]).unwrap();
        assert_relative_eq!(a, b, max_relative = 1e-10);
    }

    #[test]
    fn test_validate_rejects_understated_rms() {
        let mut table = FitTable::monomial_fit(
            &[vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            &[1.1, 1.9, 3.2, 3.9],
        )
        .unwrap();
        assert!(table.validate().is_ok());
        table.rms_error *= 0.5;
        assert!(matches!(table.validate(), Err(GpError::FitError(_))));
    }

    #[test]
    fn test_monomial_fit_exact() {
        let inputs: Vec<Vec<f64>> = (1..6).map(|i| vec![i as f64, 1.0 + i as f64 * 0.3]).collect();
        let outputs: Vec<f64> = inputs.iter().map(|u| 3.0 * u[0].powf(1.5) / u[1]).collect();
        let table = FitTable::monomial_fit(&inputs, &outputs).unwrap();
        assert_relative_eq!(table.terms[0].log_coeff, 3.0f64.ln(), epsilon = 1e-9);
        assert_relative_eq!(table.terms[0].exponents[0], 1.5, epsilon = 1e-9);
        assert_relative_eq!(table.terms[0].exponents[1], -1.0, epsilon = 1e-9);
        assert!(table.rms_error < 1e-9);
    }

    #[test]
    fn test_constraints_are_gp() {
        let w = scalar_var("w");
        let u = scalar_var("u");
        let cs = softmax_table()
            .constraints("lift", &w, &[Monomial::from(&u)])
            .unwrap();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].fit_rms(), Some(0.01));
        let cl = classify(&cs).unwrap();
        assert!(cl.is_gp());

        // the constraint is tight exactly on the fitted curve
        let mut values = Values::new();
        values.insert(u.clone(), 4.0);
        values.insert(w.clone(), softmax_table().evaluate(&[4.0]).unwrap());
        assert!(cs[0].residual(&values).unwrap().abs() < 1e-12);

        // 1% above the curve reads as 1% in the output, not 2% from w^alpha
        let on_curve = values[&w];
        values.insert(w.clone(), on_curve * 1.01);
        assert_relative_eq!(cs[0].fit_log_error(&values).unwrap(), 1.01f64.ln(), max_relative = 1e-9);
    }

    #[test]
    fn test_dimensioned_input_rejected() {
        let w = scalar_var("w");
        let l = crate::expr::variable("l", "m").unwrap();
        let err = softmax_table()
            .constraints("bad", &w, &[Monomial::from(&l)])
            .unwrap_err();
        assert!(matches!(err, GpError::UnitMismatch { .. }));
    }
}
