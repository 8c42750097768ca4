//! Constraints and their classification.
//!
//! - `Constraint` - a `<=` or `==` relation between two signomials
//! - `ConstraintExt` - `x.leq(..)`, `x.geq(..)`, `x.equals(..)` on any expression
//! - `classify` - routing to the GP or signomial path

pub mod classify;
pub mod constraint;

pub use classify::{classify, Classified, GpConstraint, SpConstraint};
pub use constraint::{Constraint, ConstraintExt, ConstraintKind};
