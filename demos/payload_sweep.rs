//! Payload Sweep Example
//!
//! Sizes a battery-electric aircraft for a 200 nmi cruise and sweeps the payload
//! weight. Every sweep point is an independent solve; the points run in parallel.
//!
//! The aircraft (weights, wing, motor) and its cruise segment (lift, drag, power,
//! range) are separate sub-models; the mission ties them together.

use std::f64::consts::PI;

use gpsca::prelude::*;

/// The aircraft being sized.
struct Aircraft {
    w: Variable,
    w_pay: Variable,
    h_batt: Variable,
    eta_e: Variable,
    w_batt: Variable,
    ar: Variable,
    s: Variable,
    ws: Variable,
    w_wing: Variable,
    p_shaft_max: Variable,
    sp_motor: Variable,
    w_motor: Variable,
    f_struct: Variable,
    w_struct: Variable,
    b: Variable,
}

impl Aircraft {
    fn new() -> gpsca::Result<Self> {
        let f = VarFactory::new("Aircraft");
        Ok(Aircraft {
            w: f.var("W", "lbf", "aircraft weight")?,
            w_pay: f.param("W_pay", 800.0, "lbf", "payload weight")?,
            h_batt: f.param("h_batt", 210.0, "W*hr/kg", "battery specific energy")?,
            eta_e: f.param("eta_e", 0.9, "-", "total electrical efficiency")?,
            w_batt: f.var("W_batt", "lbf", "battery weight")?,
            ar: f.param("AR", 10.0, "-", "wing aspect ratio")?,
            s: f.var("S", "ft**2", "wing planform area")?,
            ws: f.param("W/S", 2.5, "lbf/ft**2", "wing weight scaling factor")?,
            w_wing: f.var("W_wing", "lbf", "wing weight")?,
            p_shaft_max: f.var("P_shaft_max", "W", "max shaft power")?,
            sp_motor: f.param("sp_motor", 7.0 / 9.81, "kW/N", "motor specific power")?,
            w_motor: f.var("W_motor", "lbf", "motor weight")?,
            f_struct: f.param("f_struct", 0.2, "-", "structural weight fraction")?,
            w_struct: f.var("W_struct", "lbf", "structural weight")?,
            b: f.var("b", "ft", "wing span")?,
        })
    }
}

impl Submodel for Aircraft {
    fn name(&self) -> &str {
        "Aircraft"
    }

    fn constraints(&self) -> gpsca::Result<Vec<Constraint>> {
        Ok(vec![
            self.w.geq(
                &self.w_batt + &self.w_pay + &self.w_wing + &self.w_motor + &self.w_struct,
            )?,
            self.w_struct.geq(&self.f_struct * &self.w)?,
            self.w_wing.geq(&self.ws * &self.s)?,
            self.w_motor.geq(&self.p_shaft_max / &self.sp_motor)?,
            self.ar.equals(Monomial::from(&self.b).powf(2.0) / &self.s)?,
        ])
    }
}

/// Steady cruise over the design range.
struct Cruise<'a> {
    aircraft: &'a Aircraft,
    rho: Variable,
    v: Variable,
    cl: Variable,
    cd: Variable,
    cda: Variable,
    e: Variable,
    range: Variable,
    g: Variable,
    thrust: Variable,
    p_shaft: Variable,
    eta_prop: Variable,
}

impl<'a> Cruise<'a> {
    fn new(aircraft: &'a Aircraft) -> gpsca::Result<Self> {
        let f = VarFactory::new("Cruise");
        Ok(Cruise {
            aircraft,
            rho: f.param("rho", 1.225, "kg/m**3", "air density")?,
            v: f.var("V", "knots", "speed")?,
            cl: f.var("C_L", "-", "lift coefficient")?,
            cd: f.var("C_D", "-", "drag coefficient")?,
            cda: f.param("CDA", 0.024, "-", "non-lifting drag coefficient")?,
            e: f.param("e", 0.8, "-", "span efficiency")?,
            range: f.param("R", 200.0, "nmi", "aircraft range")?,
            g: f.param("g", 9.81, "m/s**2", "gravitational constant")?,
            thrust: f.var("T", "lbf", "thrust")?,
            p_shaft: f.var("P_shaft", "W", "shaft power")?,
            eta_prop: f.param("eta_prop", 0.8, "-", "propeller efficiency")?,
        })
    }
}

impl Submodel for Cruise<'_> {
    fn name(&self) -> &str {
        "Cruise"
    }

    fn constraints(&self) -> gpsca::Result<Vec<Constraint>> {
        let ac = self.aircraft;
        let q_s = 0.5 * &self.rho * &ac.s * Monomial::from(&self.v).powf(2.0);
        Ok(vec![
            self.cd
                .geq(&self.cda + Monomial::from(&self.cl).powf(2.0) / PI / &self.e / &ac.ar)?,
            ac.w.equals(&q_s * &self.cl)?.named("lift"),
            self.thrust.geq(&q_s * &self.cd)?.named("drag"),
            self.p_shaft.geq(&self.thrust * &self.v / &self.eta_prop)?,
            self.range
                .leq(&ac.h_batt * &ac.w_batt / &self.g * &ac.eta_e * &self.v / &self.p_shaft)?
                .named("range"),
        ])
    }
}

/// Aircraft plus its cruise segment.
struct Mission<'a> {
    aircraft: &'a Aircraft,
    cruise: Cruise<'a>,
}

impl Submodel for Mission<'_> {
    fn name(&self) -> &str {
        "Mission"
    }

    fn constraints(&self) -> gpsca::Result<Vec<Constraint>> {
        Ok(vec![self.aircraft.p_shaft_max.geq(&self.cruise.p_shaft)?])
    }

    fn children(&self) -> Vec<&dyn Submodel> {
        vec![self.aircraft, &self.cruise]
    }
}

fn main() -> gpsca::Result<()> {
    pretty_env_logger::init();

    println!("=== Payload Sweep ===\n");

    let aircraft = Aircraft::new()?;
    let mission = Mission {
        aircraft: &aircraft,
        cruise: Cruise::new(&aircraft)?,
    };

    let problem = Problem::minimize(&aircraft.w)
        .subject_to(flatten(&mission)?)
        .build();

    let payloads: Vec<f64> = (2..=12).map(|i| 100.0 * i as f64).collect();
    let points = sweep(&problem, &aircraft.w_pay, &payloads, &ScaConfig::default())?;

    println!(
        "{:>10} {:>10} {:>10} {:>10} {:>12}",
        "W_pay", "W", "W_batt", "S", "dlnW/dlnR"
    );
    for p in &points {
        match &p.result {
            Ok(sol) => println!(
                "{:>10.0} {:>10.1} {:>10.1} {:>10.2} {:>12.4}",
                p.value,
                sol.cost(),
                sol[&aircraft.w_batt],
                sol[&aircraft.s],
                sol.solution.sensitivity(&mission.cruise.range).unwrap_or(0.0),
            ),
            Err(e) => println!("{:>10.0} {}", p.value, e),
        }
    }
    Ok(())
}
