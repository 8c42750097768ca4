//! Variables and their builder.
//!
//! A `Variable` is a cheap, clonable handle. Identity is a process-wide unique
//! `VarId`, so two variables with the same name in different sub-models never alias.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{GpError, Result};
use crate::units::Unit;

/// Unique identifier for variables (including auxiliary solver columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    /// Generate a new unique ID.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        VarId(NEXT_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for VarId {
    fn default() -> Self {
        Self::new()
    }
}

/// Data behind a variable handle.
#[derive(Debug)]
pub struct VariableData {
    /// Unique identifier.
    pub id: VarId,
    /// Display name.
    pub name: String,
    /// Physical unit.
    pub unit: Unit,
    /// Unit as written by the model author, for display.
    pub unit_label: String,
    /// Fixed value in `unit`, if this variable is a parameter.
    pub value: Option<f64>,
    /// Free-form description.
    pub description: Option<String>,
    /// Name of the sub-model that declared the variable.
    pub model: Option<String>,
}

/// A positive scalar decision variable or fixed parameter.
#[derive(Clone)]
pub struct Variable(Arc<VariableData>);

/// Numeric values keyed by variable, in each variable's own unit.
pub type Values = HashMap<Variable, f64>;

impl Variable {
    /// Unique identifier.
    pub fn id(&self) -> VarId {
        self.0.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Physical unit.
    pub fn unit(&self) -> Unit {
        self.0.unit
    }

    /// Unit string as declared.
    pub fn unit_label(&self) -> &str {
        &self.0.unit_label
    }

    /// Fixed value, if the variable was declared with one.
    pub fn value(&self) -> Option<f64> {
        self.0.value
    }

    /// Check if the variable carries a fixed value.
    pub fn is_fixed(&self) -> bool {
        self.0.value.is_some()
    }

    /// Description, if any.
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Owning sub-model name, if any.
    pub fn model(&self) -> Option<&str> {
        self.0.model.as_deref()
    }

    /// Fully qualified name, `Model.name` when the owner is known.
    pub fn qualified_name(&self) -> String {
        match self.model() {
            Some(m) => format!("{}.{}", m, self.name()),
            None => self.name().to_string(),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.qualified_name(), self.0.id.raw())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Builder for creating variables with various attributes.
#[derive(Debug, Default)]
pub struct VariableBuilder {
    name: String,
    unit: Option<String>,
    value: Option<f64>,
    description: Option<String>,
    model: Option<String>,
}

impl VariableBuilder {
    /// Create a new variable builder with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the unit string, e.g. `"lbf"` or `"m/s**2"`.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Fix the variable to a value (expressed in its unit).
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set a description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Record the owning sub-model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build the variable.
    pub fn build(self) -> Result<Variable> {
        let unit_label = self.unit.unwrap_or_else(|| "-".to_string());
        let unit = Unit::parse(&unit_label)?;
        if let Some(v) = self.value {
            if !(v.is_finite() && v > 0.0) {
                return Err(GpError::InvalidProblem(format!(
                    "variable '{}' must have a positive finite value, got {}",
                    self.name, v
                )));
            }
        }
        Ok(Variable(Arc::new(VariableData {
            id: VarId::new(),
            name: self.name,
            unit,
            unit_label,
            value: self.value,
            description: self.description,
            model: self.model,
        })))
    }
}

/// Create a free variable with the given unit.
///
/// # Examples
///
/// ```
/// use gpsca::expr::variable;
///
/// let w = variable("W", "lbf").unwrap();
/// assert!(!w.is_fixed());
/// ```
pub fn variable(name: &str, unit: &str) -> Result<Variable> {
    VariableBuilder::new(name).unit(unit).build()
}

/// Create a fixed parameter with the given value and unit.
pub fn parameter(name: &str, value: f64, unit: &str) -> Result<Variable> {
    VariableBuilder::new(name).value(value).unit(unit).build()
}

/// Create a dimensionless free variable.
pub fn scalar_var(name: &str) -> Variable {
    Variable(Arc::new(VariableData {
        id: VarId::new(),
        name: name.to_string(),
        unit: Unit::dimensionless(),
        unit_label: "-".to_string(),
        value: None,
        description: None,
        model: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_id() {
        let id1 = VarId::new();
        let id2 = VarId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_variable_builder() {
        let w = VariableBuilder::new("W_pay")
            .unit("lbf")
            .value(800.0)
            .description("payload weight")
            .model("Aircraft")
            .build()
            .unwrap();

        assert_eq!(w.name(), "W_pay");
        assert_eq!(w.value(), Some(800.0));
        assert_eq!(w.qualified_name(), "Aircraft.W_pay");
        assert_eq!(w.unit_label(), "lbf");
        assert!(w.is_fixed());
    }

    #[test]
    fn test_identity_is_not_name() {
        let a = scalar_var("x");
        let b = scalar_var("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_nonpositive_value_rejected() {
        assert!(parameter("mu", 0.0, "-").is_err());
        assert!(parameter("mu", -1.0, "-").is_err());
    }

    #[test]
    fn test_bad_unit_rejected() {
        assert!(matches!(
            variable("x", "parsecs"),
            Err(GpError::UnitParse(_))
        ));
    }
}
