//! Local monomial approximation of signomial constraints.
//!
//! `P <= N` with a multi-term `N` becomes `P / m <= 1`, where `m` is the monomial
//! that matches `N` in value and log-space gradient at the operating point. Since
//! `ln N` is convex in log space and `ln m` is its tangent, `m <= N` everywhere: the
//! linearized constraint is tight at the operating point and every point it admits
//! satisfies the original constraint.
//!
//! A signomial equality `P = N` becomes the monomial equality `mono(P) = mono(N)`.
//! The pair of inequalities `P <= mono(N)`, `N <= mono(P)` would only admit the
//! operating point itself.

use crate::constraints::{GpConstraint, SpConstraint};
use crate::error::Result;
use crate::expr::{Posynomial, Values};

/// Linearize one signomial constraint at `point`.
///
/// `point` must hold a value for every free variable of the constraint.
pub fn linearize(c: &SpConstraint, point: &Values) -> Result<GpConstraint> {
    let neg_mono = c.neg.as_signomial().mono_approx(point)?;
    if c.equality {
        let pos_mono = c.pos.as_signomial().mono_approx(point)?;
        return Ok(GpConstraint::MonomialEq {
            mono: pos_mono.div_mono(&neg_mono),
            source: c.source,
        });
    }
    Ok(GpConstraint::Posynomial {
        posy: Posynomial::new(c.pos.as_signomial().div_mono(&neg_mono))?,
        source: c.source,
    })
}

/// Linearize every signomial constraint at `point`.
pub fn linearize_all(constraints: &[SpConstraint], point: &Values) -> Result<Vec<GpConstraint>> {
    constraints.iter().map(|c| linearize(c, point)).collect()
}
