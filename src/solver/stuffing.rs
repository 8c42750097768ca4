//! Matrix stuffing: converts canonicalized GPs to solver format.
//!
//! This module builds the matrices (P, q, A, b) and cone specifications
//! required by Clarabel from the canonicalized problem. Every row is stored as
//! `s = b - A x` with `s` in its cone, so for a row `a(x) = coeffs . x + constant`
//! the stuffed entries are `A = -coeffs` and `b = constant`.

use std::collections::{BTreeMap, HashMap};

use nalgebra_sparse::CscMatrix;

use crate::canon::{CanonResult, ConeConstraint, LogAffine, RowTag};
use crate::expr::VarId;
use crate::sparse::TripletMatrix;

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
    /// Number of exponential cones (each is 3D).
    pub exp: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg + self.exp * 3
    }
}

/// Mapping from column IDs to indices in the optimization variable.
#[derive(Debug, Clone)]
pub struct VariableMap {
    /// Map from column ID to index.
    pub id_to_col: HashMap<VarId, usize>,
    /// Total number of optimization variables.
    pub total_vars: usize,
}

impl VariableMap {
    /// Create from an ordered list of column IDs.
    pub fn from_ids(ids: &[VarId]) -> Self {
        let id_to_col: HashMap<VarId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        VariableMap {
            total_vars: id_to_col.len(),
            id_to_col,
        }
    }

    /// Get the column index for an ID.
    pub fn get(&self, id: VarId) -> Option<usize> {
        self.id_to_col.get(&id).copied()
    }
}

/// What a stuffed row depends on, for sensitivity recovery.
#[derive(Debug, Clone, Default)]
pub struct RowInfo {
    /// `d b_row / d ln v` for fixed variables.
    pub params: BTreeMap<VarId, f64>,
    /// Provenance and relaxation derivative of the row.
    pub tag: RowTag,
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (always zero for a GP).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q.
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
    /// Column mapping for solution recovery.
    pub var_map: VariableMap,
    /// Column holding the log objective.
    pub objective_col: usize,
    /// Per-row sensitivity data, in stuffed row order.
    pub rows: Vec<RowInfo>,
}

struct Rows<'a> {
    a: TripletMatrix,
    b: Vec<f64>,
    info: Vec<RowInfo>,
    var_map: &'a VariableMap,
}

impl Rows<'_> {
    fn push(&mut self, expr: &LogAffine, tag: RowTag) {
        let var_map = self.var_map;
        self.a.push_row(
            expr.coeffs
                .iter()
                .filter_map(|(id, coeff)| var_map.get(*id).map(|col| (col, -coeff))),
        );
        self.b.push(expr.constant);
        self.info.push(RowInfo {
            params: expr.params.clone(),
            tag,
        });
    }
}

/// Build the stuffed problem from a canonicalized GP.
///
/// `free` lists the decision-variable columns; the epigraph and auxiliary columns of
/// `canon` are appended after them.
pub fn stuff_problem(canon: &CanonResult, free: &[VarId]) -> StuffedProblem {
    let mut ids: Vec<VarId> = free.to_vec();
    ids.push(canon.objective);
    ids.extend(canon.aux_vars.iter().copied());
    let var_map = VariableMap::from_ids(&ids);
    let n = var_map.total_vars;

    let objective_col = free.len();
    let mut q = vec![0.0; n];
    q[objective_col] = 1.0;

    let mut zeros = Vec::new();
    let mut nonnegs = Vec::new();
    let mut exps = Vec::new();
    for c in &canon.constraints {
        match &c.cone {
            ConeConstraint::Zero { a } => zeros.push((a, c.tag)),
            ConeConstraint::NonNeg { a } => nonnegs.push((a, c.tag)),
            ConeConstraint::ExpCone { x, y, z } => exps.push((x, y, z, c.tag)),
        }
    }

    let cone_dims = ConeDims {
        zero: zeros.len(),
        nonneg: nonnegs.len(),
        exp: exps.len(),
    };

    let mut rows = Rows {
        a: TripletMatrix::new(n),
        b: Vec::with_capacity(cone_dims.total()),
        info: Vec::with_capacity(cone_dims.total()),
        var_map: &var_map,
    };
    for (a, tag) in zeros.into_iter().chain(nonnegs) {
        rows.push(a, tag);
    }
    for (x, y, z, tag) in exps {
        // Only the x row carries the term's constant.
        let passive = RowTag {
            source: tag.source,
            ds: 0.0,
        };
        rows.push(x, tag);
        rows.push(y, passive);
        rows.push(z, passive);
    }
    let Rows { a, b, info, .. } = rows;

    StuffedProblem {
        p: CscMatrix::zeros(n, n),
        q,
        a: a.to_csc(),
        b,
        cone_dims,
        var_map,
        objective_col,
        rows: info,
    }
}
