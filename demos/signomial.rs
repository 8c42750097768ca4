//! Signomial Program Example
//!
//! maximize    x
//! subject to  x <= y + 1
//!             y <= 2
//!
//! `x <= y + 1` has a two-term right side, so it is not GP-compatible. The local
//! solver replaces `y + 1` by a monomial around the current point and iterates.
//! Run with `RUST_LOG=debug` to see each iteration.

use gpsca::prelude::*;

fn main() -> gpsca::Result<()> {
    pretty_env_logger::init();

    println!("=== Signomial Program ===\n");

    let x = scalar_var("x");
    let y = scalar_var("y");
    let problem = Problem::maximize(&x)
        .subject_to([x.leq(&y + 1.0)?, y.leq(2.0)?])
        .build();

    println!("Capped at 2 iterations:");
    let capped = problem.localsolve_with(ScaConfig::default().max_iterations(2))?;
    println!("  Status: {:?}", capped.status);
    println!("  Last point: x = {:.4}, y = {:.4}", capped[&x], capped[&y]);

    println!("\nTo convergence:");
    let solution = problem.localsolve()?;
    println!("  Status: {:?} after {} iterations", solution.status, solution.iterations);
    for record in &solution.history {
        println!(
            "  iter {:2}: cost {:.6}  max change {:.2e}",
            record.iteration, record.cost, record.max_change
        );
    }
    println!("  x = {:.4}, y = {:.4}", solution[&x], solution[&y]);
    Ok(())
}
