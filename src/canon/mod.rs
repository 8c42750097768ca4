//! Canonicalization transforms geometric programs into conic standard form.
//!
//! This module converts posynomial constraints into:
//! - Log-space affine expressions (LogAffine)
//! - Cone constraints (ConeConstraint) over zero, nonnegative and exponential cones

pub mod canonicalizer;
pub mod log_expr;

pub use canonicalizer::{canonicalize, CanonResult, ConeConstraint, RowTag, TaggedCone};
pub use log_expr::LogAffine;
