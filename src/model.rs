//! Hierarchical models.
//!
//! A model is a tree of [`Submodel`]s. Each node owns some constraints and may hold
//! children; parents refer to child variables through the child's own typed fields
//! rather than by name. [`flatten`] collects the whole tree into one constraint list.
//!
//! # Example
//!
//! ```
//! use gpsca::prelude::*;
//! use gpsca::model::{flatten, Submodel, VarFactory};
//!
//! struct Wing {
//!     area: Variable,
//!     weight: Variable,
//! }
//!
//! impl Wing {
//!     fn new() -> Result<Self> {
//!         let f = VarFactory::new("Wing");
//!         Ok(Wing {
//!             area: f.var("S", "m**2", "wing area")?,
//!             weight: f.var("W", "N", "wing weight")?,
//!         })
//!     }
//! }
//!
//! impl Submodel for Wing {
//!     fn name(&self) -> &str {
//!         "Wing"
//!     }
//!
//!     fn constraints(&self) -> Result<Vec<Constraint>> {
//!         Ok(vec![self.weight.geq(40.0 * Monomial::with_unit(1.0, Unit::parse("N/m**2")?) * &self.area)?])
//!     }
//! }
//!
//! let wing = Wing::new().unwrap();
//! let cs = flatten(&wing).unwrap();
//! assert_eq!(cs.len(), 1);
//! assert_eq!(cs[0].label(), Some("Wing"));
//! ```

use log::debug;

use crate::constraints::Constraint;
use crate::error::Result;
use crate::expr::{Variable, VariableBuilder};

/// A node of a model tree.
pub trait Submodel {
    /// Name used to qualify constraint labels.
    fn name(&self) -> &str;

    /// Constraints owned by this node, excluding its children.
    fn constraints(&self) -> Result<Vec<Constraint>>;

    /// Child models.
    fn children(&self) -> Vec<&dyn Submodel> {
        Vec::new()
    }
}

/// Collect the constraints of a model tree, depth-first, parents before children.
///
/// Labels are qualified with the path of the owning node (`Aircraft/Wing/label`);
/// unlabelled constraints are labelled with the path alone.
pub fn flatten(model: &dyn Submodel) -> Result<Vec<Constraint>> {
    let mut out = Vec::new();
    collect(model, "", &mut out)?;
    Ok(out)
}

fn collect(model: &dyn Submodel, prefix: &str, out: &mut Vec<Constraint>) -> Result<()> {
    let path = if prefix.is_empty() {
        model.name().to_string()
    } else {
        format!("{}/{}", prefix, model.name())
    };

    let own = model.constraints()?;
    debug!("model {}: {} constraints", path, own.len());
    for c in own {
        let label = match c.label() {
            Some(l) => format!("{}/{}", path, l),
            None => path.clone(),
        };
        out.push(c.named(label));
    }
    for child in model.children() {
        collect(child, &path, out)?;
    }
    Ok(())
}

/// Creates variables owned by one model.
#[derive(Debug, Clone)]
pub struct VarFactory {
    model: String,
}

impl VarFactory {
    pub fn new(model: impl Into<String>) -> Self {
        VarFactory {
            model: model.into(),
        }
    }

    /// Owning model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// A free variable.
    pub fn var(&self, name: &str, unit: &str, description: &str) -> Result<Variable> {
        VariableBuilder::new(name)
            .unit(unit)
            .description(description)
            .model(self.model.as_str())
            .build()
    }

    /// A fixed parameter.
    pub fn param(&self, name: &str, value: f64, unit: &str, description: &str) -> Result<Variable> {
        VariableBuilder::new(name)
            .value(value)
            .unit(unit)
            .description(description)
            .model(self.model.as_str())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintExt;
    use crate::problem::Problem;
    use approx::assert_relative_eq;

    struct Tank {
        volume: Variable,
        mass: Variable,
    }

    impl Tank {
        fn new() -> Result<Self> {
            let f = VarFactory::new("Tank");
            Ok(Tank {
                volume: f.var("V", "-", "tank volume")?,
                mass: f.var("m", "-", "tank mass")?,
            })
        }
    }

    impl Submodel for Tank {
        fn name(&self) -> &str {
            "Tank"
        }

        fn constraints(&self) -> Result<Vec<Constraint>> {
            Ok(vec![self.mass.geq(0.5 * &self.volume)?.named("wall")])
        }
    }

    struct Vehicle {
        tank: Tank,
        mass: Variable,
        fuel: Variable,
    }

    impl Submodel for Vehicle {
        fn name(&self) -> &str {
            "Vehicle"
        }

        fn constraints(&self) -> Result<Vec<Constraint>> {
            Ok(vec![
                self.mass.geq(&self.tank.mass + 1.0)?,
                self.tank.volume.geq(&self.fuel)?,
            ])
        }

        fn children(&self) -> Vec<&dyn Submodel> {
            vec![&self.tank]
        }
    }

    fn vehicle() -> Vehicle {
        let f = VarFactory::new("Vehicle");
        Vehicle {
            tank: Tank::new().unwrap(),
            mass: f.var("m", "-", "total mass").unwrap(),
            fuel: f.param("fuel", 2.0, "-", "fuel volume").unwrap(),
        }
    }

    #[test]
    fn test_flatten_order_and_labels() {
        let v = vehicle();
        let cs = flatten(&v).unwrap();
        assert_eq!(cs.len(), 3);
        assert_eq!(cs[0].label(), Some("Vehicle"));
        assert_eq!(cs[2].label(), Some("Vehicle/Tank/wall"));
    }

    #[test]
    fn test_factory_sets_owner() {
        let v = vehicle();
        assert_eq!(v.tank.mass.model(), Some("Tank"));
        assert_eq!(v.tank.mass.qualified_name(), "Tank.m");
        assert!(v.fuel.is_fixed());
    }

    #[test]
    fn test_solve_flattened_model() {
        let v = vehicle();
        let sol = Problem::minimize(&v.mass)
            .subject_to(flatten(&v).unwrap())
            .solve()
            .unwrap();
        // V >= 2, m_tank >= 1, m >= 2
        assert_relative_eq!(sol[&v.mass], 2.0, max_relative = 1e-5);
    }
}
