//! STOL Landing Distance Example
//!
//! Minimum landing distance of a small short-takeoff-and-landing aircraft with
//! reverse thrust and braking. The ground-roll relation
//!
//!     S_gr = ln(1 + B V^2 / A) / (2 B)
//!
//! is written with a three-term Taylor series of `e^x - 1`, which makes it a
//! signomial constraint; the model is solved with the local solver.
//!
//! The model tree is `Landing -> FlightState`, with the aircraft passed in by
//! reference. Run with `RUST_LOG=info` (or `debug`) to follow the iterations.

use std::f64::consts::PI;

use gpsca::prelude::*;

/// Free-stream conditions.
struct FlightState {
    rho: Variable,
    v: Variable,
}

impl FlightState {
    fn new() -> gpsca::Result<Self> {
        let f = VarFactory::new("FlightState");
        Ok(FlightState {
            rho: f.param("rho", 1.225, "kg/m**3", "air density")?,
            v: f.var("V", "knots", "speed")?,
        })
    }
}

impl Submodel for FlightState {
    fn name(&self) -> &str {
        "FlightState"
    }

    fn constraints(&self) -> gpsca::Result<Vec<Constraint>> {
        Ok(Vec::new())
    }
}

/// Fixed aircraft parameters.
struct Aircraft {
    w: Variable,
    s: Variable,
    p_shaft_max: Variable,
    ar: Variable,
    e: Variable,
}

impl Aircraft {
    fn test_aircraft() -> gpsca::Result<Self> {
        let f = VarFactory::new("Aircraft");
        Ok(Aircraft {
            w: f.param("W", 2540.0, "lbf", "aircraft weight")?,
            s: f.param("S", 55.17, "ft**2", "wing planform area")?,
            p_shaft_max: f.param("P_shaft_max", 200.0, "hp", "maximum shaft power")?,
            ar: f.param("AR", 10.0, "-", "wing aspect ratio")?,
            e: f.param("e", 0.8, "-", "span efficiency")?,
        })
    }
}

/// Landing ground roll with reverse thrust and braking.
struct Landing<'a> {
    aircraft: &'a Aircraft,
    fs: FlightState,
    a: Variable,
    b: Variable,
    g: Variable,
    mu: Variable,
    mu_b: Variable,
    t_rev: Variable,
    cda: Variable,
    cl_g: Variable,
    cd_g: Variable,
    v_stall: Variable,
    s_gr: Variable,
    s_land: Variable,
    eta_prop: Variable,
    margin: Variable,
    cl_land: Variable,
    cdp: Variable,
}

impl<'a> Landing<'a> {
    fn new(aircraft: &'a Aircraft) -> gpsca::Result<Self> {
        let f = VarFactory::new("Landing");
        Ok(Landing {
            aircraft,
            fs: FlightState::new()?,
            a: f.var("A", "m/s**2", "log fit equation helper 1")?,
            b: f.var("B", "1/m", "log fit equation helper 2")?,
            g: f.param("g", 9.81, "m/s**2", "gravitational constant")?,
            mu: f.param("mu", 0.024, "-", "coefficient of friction")?,
            mu_b: f.param("mu_b", 0.5, "-", "braking coefficient of friction")?,
            t_rev: f.var("T", "lbf", "reverse thrust")?,
            cda: f.param("CDA", 0.024, "-", "parasite drag coefficient")?,
            cl_g: f.var("C_Lg", "-", "ground lift coefficient")?,
            cd_g: f.var("C_Dg", "-", "ground drag coefficient")?,
            v_stall: f.var("V_stall", "knots", "stall velocity")?,
            s_gr: f.var("S_gr", "ft", "landing ground roll")?,
            s_land: f.var("S_land", "ft", "landing distance")?,
            eta_prop: f.param("eta_prop", 0.05, "-", "propeller efficiency in reverse")?,
            margin: f.param("m_fac", 1.2, "-", "landing safety margin")?,
            cl_land: f.param("C_Lland", 3.5, "-", "landing lift coefficient")?,
            cdp: f.param("cdp_stall", 0.025, "-", "profile drag at 1.2 V_stall")?,
        })
    }
}

impl Submodel for Landing<'_> {
    fn name(&self) -> &str {
        "Landing"
    }

    fn constraints(&self) -> gpsca::Result<Vec<Constraint>> {
        let ac = self.aircraft;
        let fs = &self.fs;
        let q_s = 0.5 * &fs.rho * &ac.s;
        let v_stall_sq = 2.0 * &ac.w / &fs.rho / &ac.s / &self.cl_land;
        let induced = Monomial::from(&self.cl_land).powf(2.0) / PI / &ac.ar / &ac.e;

        Ok(vec![
            self.t_rev
                .equals(&ac.p_shaft_max * &self.eta_prop / &fs.v)?
                .named("reverse thrust"),
            self.cl_g.equals(&self.cl_land / 1.2f64.sqrt())?,
            Monomial::from(&self.v_stall)
                .powf(2.0)
                .equals(v_stall_sq)?
                .named("stall speed"),
            fs.v.geq(1.2 * &self.v_stall)?,
            self.s_land.geq(&self.margin * &self.s_gr)?,
            // direction as in the latest landing revision; the takeoff model uses >=
            (&self.b * &ac.w / &self.g + &q_s * &self.mu * &self.cl_land)
                .leq(&q_s * &self.cd_g)?
                .tight()
                .named("deceleration helper"),
            te_exp_minus1(2.0 * &self.s_gr * &self.b, 3)
                .geq(&self.b * Monomial::from(&fs.v).powf(2.0) / &self.a)?
                .tight()
                .named("ground roll"),
            self.cd_g.leq(&self.cda + &self.cdp + induced)?,
            (&self.a / &self.g)
                .leq(&self.t_rev / &ac.w + &self.mu + &self.mu_b)?
                .tight()
                .named("deceleration"),
        ])
    }

    fn children(&self) -> Vec<&dyn Submodel> {
        vec![&self.fs]
    }
}

fn main() -> gpsca::Result<()> {
    pretty_env_logger::init();

    println!("=== STOL Landing Distance (SP) ===\n");

    let aircraft = Aircraft::test_aircraft()?;
    let landing = Landing::new(&aircraft)?;

    let problem = Problem::minimize(&landing.s_land)
        .subject_to(flatten(&landing)?)
        .build();

    // hand estimates; unlisted variables start at 1
    let config = ScaConfig::default()
        .guess(&landing.fs.v, 75.0)
        .guess(&landing.v_stall, 62.5)
        .guess(&landing.s_gr, 400.0)
        .guess(&landing.s_land, 480.0)
        .guess(&landing.a, 5.0)
        .guess(&landing.b, 1.2e-3)
        .guess(&landing.t_rev, 43.0)
        .guess(&landing.cd_g, 0.5);

    println!("Solving...");
    let solution = problem.localsolve_with(config)?;

    println!("\nResults:");
    println!("  Status: {:?} after {} iterations", solution.status, solution.iterations);
    println!("  Landing distance: {:.1} ft", solution.cost());
    for v in [
        &landing.s_gr,
        &landing.fs.v,
        &landing.v_stall,
        &landing.t_rev,
        &landing.cd_g,
        &landing.a,
        &landing.b,
    ] {
        println!("  {:24} {:10.4} [{}]", v.qualified_name(), solution[v], v.unit_label());
    }

    println!("\nLargest sensitivities:");
    let mut sens: Vec<_> = solution.solution.sensitivities.iter().collect();
    sens.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    for (v, s) in sens.into_iter().take(5) {
        println!("  {:24} {:+.4}", v.qualified_name(), s);
    }

    for warning in &solution.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}
