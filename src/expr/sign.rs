//! Sign tracking for monomials and signomials.
//!
//! Every variable is positive, so the sign of a monomial is the sign of its
//! coefficient and the sign of a signomial follows from the signs of its terms.
//! A signomial with `Positive` sign is a posynomial.

use super::monomial::Monomial;
use super::signomial::Signomial;

/// Sign of an expression over positive variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Every term is positive.
    Positive,
    /// Every term is negative.
    Negative,
    /// No terms (the expression is identically zero).
    Zero,
    /// Terms of both signs.
    Mixed,
}

impl Sign {
    /// Check if the sign is strictly positive (a posynomial).
    pub fn is_positive(self) -> bool {
        matches!(self, Sign::Positive)
    }
}

/// Combine signs for addition: a + b.
fn add_sign(a: Sign, b: Sign) -> Sign {
    use Sign::*;
    match (a, b) {
        (Zero, x) | (x, Zero) => x,
        (Positive, Positive) => Positive,
        (Negative, Negative) => Negative,
        (Positive, Negative) | (Negative, Positive) => Mixed,
        (Mixed, _) | (_, Mixed) => Mixed,
    }
}

impl Monomial {
    /// Sign of the term.
    pub fn sign(&self) -> Sign {
        if self.coeff > 0.0 {
            Sign::Positive
        } else if self.coeff < 0.0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }
}

impl Signomial {
    /// Sign of the expression, folded over its terms.
    pub fn sign(&self) -> Sign {
        self.terms
            .iter()
            .map(Monomial::sign)
            .fold(Sign::Zero, add_sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::scalar_var;

    #[test]
    fn test_add_sign() {
        assert_eq!(add_sign(Sign::Positive, Sign::Positive), Sign::Positive);
        assert_eq!(add_sign(Sign::Positive, Sign::Negative), Sign::Mixed);
        assert_eq!(add_sign(Sign::Zero, Sign::Negative), Sign::Negative);
    }

    #[test]
    fn test_signomial_sign() {
        let x = scalar_var("x");
        let y = scalar_var("y");
        assert_eq!((&x + &y).sign(), Sign::Positive);
        assert_eq!((&x - &y).sign(), Sign::Mixed);
        assert_eq!((-(&x + &y)).sign(), Sign::Negative);
        assert_eq!(Signomial::zero().sign(), Sign::Zero);
    }
}
