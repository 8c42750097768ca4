//! Routing of constraints to the GP or signomial path.
//!
//! Each constraint is rewritten as `P <= N` (or `P = N`) where `P` and `N` are
//! posynomials made of the positive and negated negative terms of `lhs - rhs`.

use log::debug;

use super::constraint::{Constraint, ConstraintKind};
use crate::error::{GpError, Result};
use crate::expr::{Monomial, Posynomial, Sign, Signomial};

/// A constraint the GP solver accepts directly.
#[derive(Debug, Clone)]
pub enum GpConstraint {
    /// posy <= 1.
    Posynomial {
        /// Left side, in SI.
        posy: Posynomial,
        /// Index of the originating constraint.
        source: usize,
    },
    /// mono == 1.
    MonomialEq {
        /// Left side, in SI.
        mono: Monomial,
        /// Index of the originating constraint.
        source: usize,
    },
}

impl GpConstraint {
    /// Index of the originating constraint.
    pub fn source(&self) -> usize {
        match self {
            GpConstraint::Posynomial { source, .. } | GpConstraint::MonomialEq { source, .. } => {
                *source
            }
        }
    }
}

/// A constraint that needs local approximation: `pos <= neg` or `pos == neg`.
#[derive(Debug, Clone)]
pub struct SpConstraint {
    /// Positive side.
    pub pos: Posynomial,
    /// Subtracted side.
    pub neg: Posynomial,
    /// Whether the relation is an equality.
    pub equality: bool,
    /// Index of the originating constraint.
    pub source: usize,
}

/// Constraints split by solver path.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// GP-compatible constraints.
    pub gp: Vec<GpConstraint>,
    /// Signomial constraints.
    pub sp: Vec<SpConstraint>,
}

impl Classified {
    /// Check if every constraint is GP-compatible.
    pub fn is_gp(&self) -> bool {
        self.sp.is_empty()
    }
}

/// Classify substituted constraints.
///
/// Fails with `Infeasible` for an inequality that no positive assignment satisfies
/// (only positive terms on the small side) and with `InvalidProblem` for
/// non-finite coefficients.
pub fn classify(constraints: &[Constraint]) -> Result<Classified> {
    let mut out = Classified::default();
    for (idx, c) in constraints.iter().enumerate() {
        classify_one(c, idx, &mut out)?;
    }
    Ok(out)
}

fn classify_one(c: &Constraint, source: usize, out: &mut Classified) -> Result<()> {
    let diff = c.difference();
    if let Some(t) = diff.terms.iter().find(|t| !t.coeff.is_finite()) {
        return Err(GpError::InvalidProblem(format!(
            "constraint '{}' has non-finite coefficient {}",
            c.describe(),
            t.coeff
        )));
    }
    let sign = diff.sign();

    match c.kind() {
        ConstraintKind::Leq => match sign {
            Sign::Zero | Sign::Negative => {
                debug!("dropping trivially satisfied constraint '{}'", c.describe());
            }
            Sign::Positive => {
                return Err(GpError::Infeasible(format!(
                    "constraint '{}' requires a sum of positive terms to be non-positive",
                    c.describe()
                )));
            }
            Sign::Mixed => {
                let (pos, neg) = diff.split_signs();
                match neg.as_monomial() {
                    Some(m) => {
                        let posy = Posynomial::new(pos.div_mono(m))?;
                        out.gp.push(GpConstraint::Posynomial { posy, source });
                    }
                    None => {
                        debug!("constraint '{}' is signomial", c.describe());
                        out.sp.push(SpConstraint {
                            pos: Posynomial::new(pos)?,
                            neg: Posynomial::new(neg)?,
                            equality: false,
                            source,
                        });
                    }
                }
            }
        },
        ConstraintKind::Eq => match sign {
            Sign::Zero => {
                debug!("dropping identity '{}'", c.describe());
            }
            Sign::Positive | Sign::Negative => {
                return Err(GpError::Infeasible(format!(
                    "equality '{}' requires a sum of same-signed terms to vanish",
                    c.describe()
                )));
            }
            Sign::Mixed => {
                let (pos, neg) = diff.split_signs();
                match (pos.as_monomial(), neg.as_monomial()) {
                    (Some(p), Some(n)) => {
                        out.gp.push(GpConstraint::MonomialEq {
                            mono: p.div_mono(n),
                            source,
                        });
                    }
                    _ => {
                        debug!("equality '{}' is signomial", c.describe());
                        out.sp.push(SpConstraint {
                            pos: Posynomial::new(pos)?,
                            neg: Posynomial::new(neg)?,
                            equality: true,
                            source,
                        });
                    }
                }
            }
        },
    }
    Ok(())
}

/// Check whether a signomial objective is a posynomial and return it.
pub(crate) fn objective_posynomial(obj: &Signomial) -> Result<Posynomial> {
    Posynomial::new(obj.to_si()).map_err(|_| {
        GpError::InvalidProblem(format!(
            "objective '{}' must be a posynomial (all coefficients positive)",
            obj
        ))
    })
}
