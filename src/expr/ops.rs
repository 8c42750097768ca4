//! Operator overloading for variables, monomials and signomials.
//!
//! Products and quotients of monomial-like operands stay monomials. Sums,
//! differences and anything involving a signomial produce a signomial.
//! Operators do not check units; constraint construction does.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::monomial::Monomial;
use super::signomial::Signomial;
use super::variable::Variable;

// ============================================================================
// Monomial products and quotients
// ============================================================================

macro_rules! mono_binops {
    (@row $lhs:ty, [$($rhs:ty),*]) => {
        $(
            impl Mul<$rhs> for $lhs {
                type Output = Monomial;

                fn mul(self, rhs: $rhs) -> Monomial {
                    Monomial::from(self).mul_mono(&Monomial::from(rhs))
                }
            }

            impl Div<$rhs> for $lhs {
                type Output = Monomial;

                fn div(self, rhs: $rhs) -> Monomial {
                    Monomial::from(self).div_mono(&Monomial::from(rhs))
                }
            }
        )*
    };
    ($($lhs:ty),* => $rhs:tt) => {
        $( mono_binops!(@row $lhs, $rhs); )*
    };
}

mono_binops!(Variable, &Variable, Monomial, &Monomial
    => [Variable, &Variable, Monomial, &Monomial, f64]);
mono_binops!(f64 => [Variable, &Variable, Monomial, &Monomial]);

// ============================================================================
// Sums and differences
// ============================================================================

macro_rules! sum_binops {
    (@row $lhs:ty, [$($rhs:ty),*]) => {
        $(
            impl Add<$rhs> for $lhs {
                type Output = Signomial;

                fn add(self, rhs: $rhs) -> Signomial {
                    Signomial::from(self).add_sig(&Signomial::from(rhs))
                }
            }

            impl Sub<$rhs> for $lhs {
                type Output = Signomial;

                fn sub(self, rhs: $rhs) -> Signomial {
                    Signomial::from(self).add_sig(&Signomial::from(rhs).neg_sig())
                }
            }
        )*
    };
    ($($lhs:ty),* => $rhs:tt) => {
        $( sum_binops!(@row $lhs, $rhs); )*
    };
}

sum_binops!(Variable, &Variable, Monomial, &Monomial, Signomial, &Signomial
    => [Variable, &Variable, Monomial, &Monomial, Signomial, &Signomial, f64]);
sum_binops!(f64 => [Variable, &Variable, Monomial, &Monomial, Signomial, &Signomial]);

// ============================================================================
// Signomial products and quotients
// ============================================================================

macro_rules! sig_mul {
    (@row $lhs:ty, [$($rhs:ty),*]) => {
        $(
            impl Mul<$rhs> for $lhs {
                type Output = Signomial;

                fn mul(self, rhs: $rhs) -> Signomial {
                    Signomial::from(self).mul_sig(&Signomial::from(rhs))
                }
            }
        )*
    };
    ($($lhs:ty),* => $rhs:tt) => {
        $( sig_mul!(@row $lhs, $rhs); )*
    };
}

sig_mul!(Signomial, &Signomial
    => [Variable, &Variable, Monomial, &Monomial, Signomial, &Signomial, f64]);
sig_mul!(Variable, &Variable, Monomial, &Monomial, f64 => [Signomial, &Signomial]);

macro_rules! sig_div {
    ($lhs:ty => [$($rhs:ty),*]) => {
        $(
            impl Div<$rhs> for $lhs {
                type Output = Signomial;

                fn div(self, rhs: $rhs) -> Signomial {
                    Signomial::from(self).div_mono(&Monomial::from(rhs))
                }
            }
        )*
    };
}

sig_div!(Signomial => [Variable, &Variable, Monomial, &Monomial, f64]);
sig_div!(&Signomial => [Variable, &Variable, Monomial, &Monomial, f64]);

// ============================================================================
// Negation
// ============================================================================

impl Neg for Variable {
    type Output = Monomial;

    fn neg(self) -> Monomial {
        Monomial::from(self).scale(-1.0)
    }
}

impl Neg for &Variable {
    type Output = Monomial;

    fn neg(self) -> Monomial {
        Monomial::from(self).scale(-1.0)
    }
}

impl Neg for Monomial {
    type Output = Monomial;

    fn neg(self) -> Monomial {
        self.scale(-1.0)
    }
}

impl Neg for &Monomial {
    type Output = Monomial;

    fn neg(self) -> Monomial {
        self.scale(-1.0)
    }
}

impl Neg for Signomial {
    type Output = Signomial;

    fn neg(self) -> Signomial {
        self.neg_sig()
    }
}

impl Neg for &Signomial {
    type Output = Signomial;

    fn neg(self) -> Signomial {
        self.neg_sig()
    }
}
