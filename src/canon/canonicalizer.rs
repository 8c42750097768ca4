//! Log-space canonicalization of geometric programs.
//!
//! Canonicalization transforms a GP into conic standard form over `y = ln x`:
//! - The objective becomes an epigraph column `t >= ln f(x)`
//! - Single-term posynomial constraints become linear inequalities
//! - Multi-term posynomials introduce one auxiliary column `u_k` per term, with
//!   `exp(ln term_k) <= u_k` as an exponential cone and `sum_k u_k <= 1`
//! - Monomial equalities become linear equalities

use super::log_expr::LogAffine;
use crate::constraints::GpConstraint;
use crate::error::Result;
use crate::expr::{Posynomial, VarId};

/// A cone constraint in standard form.
#[derive(Debug, Clone)]
pub enum ConeConstraint {
    /// Zero cone: a = 0.
    Zero { a: LogAffine },
    /// Nonnegative cone: a >= 0.
    NonNeg { a: LogAffine },
    /// Exponential cone: {(x, y, z) | y > 0, y*exp(x/y) <= z}.
    /// Variable order is (x, y, z).
    ExpCone {
        /// The x expression.
        x: LogAffine,
        /// The y expression.
        y: LogAffine,
        /// The z expression.
        z: LogAffine,
    },
}

/// Provenance of a cone constraint, used to report constraint sensitivities.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowTag {
    /// Index of the originating user constraint (`None` for the objective).
    pub source: Option<usize>,
    /// Derivative of the row constant (the `x` row for exponential cones) when the
    /// originating constraint `posy <= 1` is relaxed to `posy <= e^s`.
    pub ds: f64,
}

/// A cone constraint with its provenance.
#[derive(Debug, Clone)]
pub struct TaggedCone {
    /// The cone constraint.
    pub cone: ConeConstraint,
    /// Where it came from.
    pub tag: RowTag,
}

/// Result of canonicalizing a GP.
#[derive(Debug)]
pub struct CanonResult {
    /// Epigraph column of the log objective; minimizing it solves the GP.
    pub objective: VarId,
    /// Cone constraints.
    pub constraints: Vec<TaggedCone>,
    /// Auxiliary columns introduced during canonicalization.
    pub aux_vars: Vec<VarId>,
}

struct Canonicalizer {
    constraints: Vec<TaggedCone>,
    aux_vars: Vec<VarId>,
}

impl Canonicalizer {
    fn push(&mut self, cone: ConeConstraint, source: Option<usize>, ds: f64) {
        self.constraints.push(TaggedCone {
            cone,
            tag: RowTag { source, ds },
        });
    }

    fn new_aux(&mut self) -> VarId {
        let id = VarId::new();
        self.aux_vars.push(id);
        id
    }

    /// Add `posy * exp(-shift) <= 1`, where `shift` is an optional epigraph column.
    fn posynomial_leq_one(
        &mut self,
        posy: &Posynomial,
        shift: Option<VarId>,
        source: Option<usize>,
    ) -> Result<()> {
        let with_shift = |la: LogAffine| match shift {
            Some(t) => la.plus_column(t, -1.0),
            None => la,
        };

        if let [term] = posy.terms() {
            // ln term - shift <= 0
            let a = with_shift(LogAffine::from_monomial(term)?).neg();
            self.push(ConeConstraint::NonNeg { a }, source, 1.0);
            return Ok(());
        }

        let mut budget = LogAffine::constant(1.0);
        for term in posy.terms() {
            let u = self.new_aux();
            let x = with_shift(LogAffine::from_monomial(term)?);
            self.push(
                ConeConstraint::ExpCone {
                    x,
                    y: LogAffine::constant(1.0),
                    z: LogAffine::column(u),
                },
                source,
                -1.0,
            );
            budget = budget.plus_column(u, -1.0);
        }
        self.push(ConeConstraint::NonNeg { a: budget }, source, 0.0);
        Ok(())
    }
}

/// Canonicalize `minimize objective` subject to GP constraints.
///
/// Coefficients are taken in SI; every variable appearing in the problem must be
/// free (fixed values already substituted).
pub fn canonicalize(objective: &Posynomial, constraints: &[GpConstraint]) -> Result<CanonResult> {
    let mut canon = Canonicalizer {
        constraints: Vec::new(),
        aux_vars: Vec::new(),
    };

    let t = VarId::new();
    canon.posynomial_leq_one(objective, Some(t), None)?;

    for c in constraints {
        match c {
            GpConstraint::Posynomial { posy, source } => {
                canon.posynomial_leq_one(posy, None, Some(*source))?;
            }
            GpConstraint::MonomialEq { mono, source } => {
                let a = LogAffine::from_monomial(mono)?;
                canon.push(ConeConstraint::Zero { a }, Some(*source), -1.0);
            }
        }
    }

    Ok(CanonResult {
        objective: t,
        constraints: canon.constraints,
        aux_vars: canon.aux_vars,
    })
}
