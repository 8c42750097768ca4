//! Expression types and creation utilities.
//!
//! This module provides the algebra used to state geometric and signomial programs:
//! - `Variable` - a positive scalar with a unit, optionally fixed to a value
//! - `Monomial` - a coefficient times a product of variable powers
//! - `Signomial` / `Posynomial` - sums of monomials
//! - Operator overloading (`+`, `-`, `*`, `/`, unary `-`) between all of them

pub mod monomial;
mod ops;
pub mod sign;
pub mod signomial;
pub mod tools;
pub mod variable;

pub use monomial::Monomial;
pub use sign::Sign;
pub use signomial::{Posynomial, Signomial};
pub use tools::te_exp_minus1;
pub use variable::{
    parameter, scalar_var, variable, VarId, Values, Variable, VariableBuilder, VariableData,
};
