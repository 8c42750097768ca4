//! Runtime physical units.
//!
//! A `Unit` is a vector of SI base-dimension exponents plus a scale factor to SI.
//! Units are parsed from strings such as `"m/s**2"`, `"lbf"`, `"W*hr/kg"`,
//! `"1/(kW*hr)"` or `"-"` (dimensionless).
//!
//! Terms may only be added when their dimensions agree. Different scales of the same
//! dimension (feet and meters) are compatible: coefficients are normalized to SI when
//! a problem is canonicalized.

use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

use crate::error::{GpError, Result};

/// Number of tracked base dimensions: length, mass, time, current, temperature.
const NDIM: usize = 5;

const BASE_SYMBOLS: [&str; NDIM] = ["m", "kg", "s", "A", "K"];

/// Tolerance on dimension exponents (exponents may be fractional after `powf`).
const DIM_TOL: f64 = 1e-9;

/// A physical unit: SI dimension exponents and a multiplicative scale to SI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    dims: [f64; NDIM],
    scale: f64,
}

impl Default for Unit {
    fn default() -> Self {
        Unit::dimensionless()
    }
}

impl Unit {
    /// The dimensionless unit with scale 1.
    pub const fn dimensionless() -> Self {
        Unit {
            dims: [0.0; NDIM],
            scale: 1.0,
        }
    }

    fn base(index: usize, scale: f64) -> Self {
        let mut dims = [0.0; NDIM];
        dims[index] = 1.0;
        Unit { dims, scale }
    }

    fn from_parts(dims: [f64; NDIM], scale: f64) -> Self {
        Unit { dims, scale }
    }

    /// Parse a unit string.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "-" {
            return Ok(Unit::dimensionless());
        }
        let tokens = tokenize(trimmed)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source: trimmed,
        };
        let unit = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(GpError::UnitParse(trimmed.to_string()));
        }
        Ok(unit)
    }

    /// Multiplicative factor converting a value in this unit to SI base units.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Base-dimension exponents (m, kg, s, A, K).
    pub fn dims(&self) -> &[f64] {
        &self.dims
    }

    /// Check if the unit has no dimension (its scale may still differ from 1).
    pub fn is_dimensionless(&self) -> bool {
        self.dims.iter().all(|d| d.abs() < DIM_TOL)
    }

    /// Check if both units measure the same physical dimension.
    pub fn same_dimension(&self, other: &Unit) -> bool {
        self.dims
            .iter()
            .zip(other.dims.iter())
            .all(|(a, b)| (a - b).abs() < DIM_TOL)
    }

    /// Fail with `UnitMismatch` unless both units share a dimension.
    pub fn check_compatible(&self, other: &Unit) -> Result<()> {
        if self.same_dimension(other) {
            Ok(())
        } else {
            Err(GpError::UnitMismatch {
                expected: self.to_string(),
                got: other.to_string(),
            })
        }
    }

    /// Raise the unit to a real power.
    pub fn powf(&self, p: f64) -> Unit {
        let mut dims = self.dims;
        for d in dims.iter_mut() {
            *d *= p;
        }
        Unit {
            dims,
            scale: self.scale.powf(p),
        }
    }

    /// The same dimension expressed in SI base units (scale 1).
    pub fn to_si(&self) -> Unit {
        Unit {
            dims: self.dims,
            scale: 1.0,
        }
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims.iter()) {
            *d += r;
        }
        Unit {
            dims,
            scale: self.scale * rhs.scale,
        }
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        self * rhs.powf(-1.0)
    }
}

impl FromStr for Unit {
    type Err = GpError;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (sym, &d) in BASE_SYMBOLS.iter().zip(self.dims.iter()) {
            if d.abs() < DIM_TOL {
                continue;
            }
            if (d - 1.0).abs() < DIM_TOL {
                parts.push(sym.to_string());
            } else {
                parts.push(format!("{}**{}", sym, d));
            }
        }
        let body = if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join("*")
        };
        if (self.scale - 1.0).abs() > 1e-12 {
            write!(f, "{}*{}", self.scale, body)
        } else {
            write!(f, "{}", body)
        }
    }
}

/// Look up a named unit.
fn named_unit(name: &str) -> Option<Unit> {
    const M: usize = 0;
    const KG: usize = 1;
    const S: usize = 2;
    const A: usize = 3;
    const K: usize = 4;

    // Derived dimensions
    const FORCE: [f64; NDIM] = [1.0, 1.0, -2.0, 0.0, 0.0];
    const ENERGY: [f64; NDIM] = [2.0, 1.0, -2.0, 0.0, 0.0];
    const POWER: [f64; NDIM] = [2.0, 1.0, -3.0, 0.0, 0.0];
    const PRESSURE: [f64; NDIM] = [-1.0, 1.0, -2.0, 0.0, 0.0];
    const SPEED: [f64; NDIM] = [1.0, 0.0, -1.0, 0.0, 0.0];
    const VOLTAGE: [f64; NDIM] = [2.0, 1.0, -3.0, -1.0, 0.0];

    let unit = match name {
        // Length
        "m" | "meter" | "meters" => Unit::base(M, 1.0),
        "km" => Unit::base(M, 1000.0),
        "cm" => Unit::base(M, 0.01),
        "mm" => Unit::base(M, 0.001),
        "ft" | "foot" | "feet" => Unit::base(M, 0.3048),
        "inch" | "inches" => Unit::base(M, 0.0254),
        "mi" | "mile" | "miles" => Unit::base(M, 1609.344),
        "nmi" | "nautical_mile" => Unit::base(M, 1852.0),
        // Mass
        "kg" => Unit::base(KG, 1.0),
        "g" | "gram" => Unit::base(KG, 0.001),
        "lb" | "lbm" => Unit::base(KG, 0.453_592_37),
        // Time
        "s" | "sec" | "second" | "seconds" => Unit::base(S, 1.0),
        "min" | "minute" | "minutes" => Unit::base(S, 60.0),
        "hr" | "h" | "hour" | "hours" => Unit::base(S, 3600.0),
        // Current, temperature
        "A" | "amp" => Unit::base(A, 1.0),
        "K" | "kelvin" => Unit::base(K, 1.0),
        // Force
        "N" | "newton" => Unit::from_parts(FORCE, 1.0),
        "kN" => Unit::from_parts(FORCE, 1000.0),
        "lbf" => Unit::from_parts(FORCE, 4.448_221_615_260_5),
        // Energy and power
        "J" | "joule" => Unit::from_parts(ENERGY, 1.0),
        "kJ" => Unit::from_parts(ENERGY, 1000.0),
        "MJ" => Unit::from_parts(ENERGY, 1.0e6),
        "W" | "watt" => Unit::from_parts(POWER, 1.0),
        "kW" => Unit::from_parts(POWER, 1000.0),
        "MW" => Unit::from_parts(POWER, 1.0e6),
        "hp" | "horsepower" => Unit::from_parts(POWER, 745.699_871_582_270_2),
        // Pressure
        "Pa" | "pascal" => Unit::from_parts(PRESSURE, 1.0),
        "kPa" => Unit::from_parts(PRESSURE, 1000.0),
        "psi" => Unit::from_parts(PRESSURE, 6894.757_293_168),
        // Speed
        "knot" | "knots" | "kt" | "kts" => Unit::from_parts(SPEED, 1852.0 / 3600.0),
        "mph" => Unit::from_parts(SPEED, 1609.344 / 3600.0),
        // Electrical
        "V" | "volt" => Unit::from_parts(VOLTAGE, 1.0),
        // Dimensionless
        "percent" => Unit::from_parts([0.0; NDIM], 0.01),
        "count" | "rad" | "radian" => Unit::dimensionless(),
        "deg" | "degree" => Unit::from_parts([0.0; NDIM], std::f64::consts::PI / 180.0),
        _ => return None,
    };
    Some(unit)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

fn tokenize(s: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '*' => {
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ if c.is_ascii_digit() || c == '.' || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| GpError::UnitParse(s.to_string()))?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return Err(GpError::UnitParse(s.to_string())),
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser over unit tokens.
///
/// ```text
/// expr   := factor (('*' | '/') factor)*
/// factor := atom ('**' number)?
/// atom   := ident | number | '(' expr ')'
/// ```
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self) -> GpError {
        GpError::UnitParse(self.source.to_string())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expr(&mut self) -> Result<Unit> {
        let mut unit = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    unit = unit * self.factor()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    unit = unit / self.factor()?;
                }
                _ => return Ok(unit),
            }
        }
    }

    fn factor(&mut self) -> Result<Unit> {
        let base = self.atom()?;
        if let Some(Token::Pow) = self.peek() {
            self.pos += 1;
            match self.next() {
                Some(Token::Number(p)) => Ok(base.powf(p)),
                _ => Err(self.error()),
            }
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> Result<Unit> {
        match self.next() {
            Some(Token::Ident(name)) => named_unit(&name).ok_or_else(|| self.error()),
            Some(Token::Number(v)) if v > 0.0 => Ok(Unit::from_parts([0.0; NDIM], v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error()),
                }
            }
            _ => Err(self.error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_dimensionless() {
        assert!(Unit::parse("-").unwrap().is_dimensionless());
        assert!(Unit::parse("").unwrap().is_dimensionless());
        assert!(Unit::parse("ft/m").unwrap().is_dimensionless());
    }

    #[test]
    fn test_parse_acceleration() {
        let g = Unit::parse("m/s**2").unwrap();
        assert_eq!(g.dims(), &[1.0, 0.0, -2.0, 0.0, 0.0]);
        assert_relative_eq!(g.scale(), 1.0);
    }

    #[test]
    fn test_parse_parentheses() {
        let u = Unit::parse("1/(kW*hr)").unwrap();
        assert_eq!(u.dims(), &[-2.0, -1.0, 2.0, 0.0, 0.0]);
        assert_relative_eq!(u.scale(), 1.0 / 3.6e6, max_relative = 1e-12);
    }

    #[test]
    fn test_specific_energy_scale() {
        let u = Unit::parse("W*hr/kg").unwrap();
        assert_relative_eq!(u.scale(), 3600.0);
        assert!(u.same_dimension(&Unit::parse("J/kg").unwrap()));
    }

    #[test]
    fn test_force_compatibility() {
        let lbf = Unit::parse("lbf").unwrap();
        let n = Unit::parse("kg*m/s**2").unwrap();
        assert!(lbf.check_compatible(&n).is_ok());
        let ft = Unit::parse("ft").unwrap();
        assert!(matches!(
            lbf.check_compatible(&ft),
            Err(GpError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_unit() {
        assert!(matches!(Unit::parse("furlong"), Err(GpError::UnitParse(_))));
        assert!(Unit::parse("m/(s").is_err());
    }

    #[test]
    fn test_powf_roundtrip() {
        let area = Unit::parse("ft**2").unwrap();
        let len = area.powf(0.5);
        assert!(len.same_dimension(&Unit::parse("m").unwrap()));
        assert_relative_eq!(len.scale(), 0.3048, max_relative = 1e-12);
    }
}
