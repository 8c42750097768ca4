//! Expression helpers.

use super::monomial::Monomial;
use super::signomial::Signomial;

/// Taylor expansion of `e^p - 1` to `nterm` terms: `p + p^2/2! + ... + p^n/n!`.
///
/// The expansion of a positive monomial is a posynomial, so it may appear on the
/// small side of a GP constraint. It under-estimates `e^p - 1` for positive `p`.
pub fn te_exp_minus1(p: impl Into<Monomial>, nterm: usize) -> Signomial {
    let p = p.into();
    let mut terms = Vec::with_capacity(nterm);
    let mut factorial = 1.0;
    for i in 1..=nterm {
        factorial *= i as f64;
        terms.push(p.powf(i as f64).scale(1.0 / factorial));
    }
    Signomial { terms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{scalar_var, Values};
    use approx::assert_relative_eq;

    #[test]
    fn test_te_exp_minus1() {
        let x = scalar_var("x");
        let s = te_exp_minus1(&x, 3);
        assert_eq!(s.len(), 3);
        assert!(s.is_posynomial());

        let mut values = Values::new();
        values.insert(x.clone(), 0.5);
        let expected = 0.5 + 0.25 / 2.0 + 0.125 / 6.0;
        assert_relative_eq!(s.evaluate(&values).unwrap(), expected, max_relative = 1e-12);
        assert!(s.evaluate(&values).unwrap() < 0.5f64.exp_m1());
    }

    #[test]
    fn test_te_exp_minus1_zero_terms() {
        let x = scalar_var("x");
        assert!(te_exp_minus1(&x, 0).is_empty());
    }
}
