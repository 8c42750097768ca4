//! Basic Geometric Program Example
//!
//! Box design: maximize the volume of a box with limited wall and floor area
//! and bounded aspect ratios.
//!
//! maximize    h w d
//! subject to  2 (h w + h d) <= A_wall
//!             w d <= A_floor
//!             1/2 <= h/w <= 2
//!             1/2 <= d/w <= 2

use gpsca::prelude::*;

fn main() -> gpsca::Result<()> {
    println!("=== Box Design (GP) ===\n");

    let h = variable("h", "m")?;
    let w = variable("w", "m")?;
    let d = variable("d", "m")?;
    let a_wall = parameter("A_wall", 100.0, "m**2")?;
    let a_floor = parameter("A_floor", 10.0, "m**2")?;

    let constraints = vec![
        (2.0 * &h * &w + 2.0 * &h * &d).leq(&a_wall)?,
        (&w * &d).leq(&a_floor)?,
        (&h / &w).geq(0.5)?,
        (&h / &w).leq(2.0)?,
        (&d / &w).geq(0.5)?,
        (&d / &w).leq(2.0)?,
    ];

    println!("Solving...");
    let solution = Problem::maximize(&h * &w * &d)
        .subject_to(constraints)
        .solve()?;

    println!("\nResults:");
    println!("  Status: {:?}", solution.status);
    println!("  Volume: {:.4} m^3", solution.cost);
    println!("  h = {:.4} m", solution[&h]);
    println!("  w = {:.4} m", solution[&w]);
    println!("  d = {:.4} m", solution[&d]);

    println!("\nSensitivities (d ln V / d ln p):");
    for p in [&a_wall, &a_floor] {
        println!("  {:8} {:+.4}", p.name(), solution.sensitivity(p).unwrap_or(0.0));
    }
    Ok(())
}
