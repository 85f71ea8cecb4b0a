//! Sequential "Blues" color scale (ColorBrewer, 9 classes).

pub const BLUES: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

/// Fill for values the scale cannot place (NaN, ±inf).
pub const NON_FINITE_FILL: &str = "#bdbdbd";

/// Linear map from a value range onto the Blues ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// Range over the finite values only; None when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<ColorScale>, v| match acc {
                None => Some(ColorScale { min: v, max: v }),
                Some(s) => Some(ColorScale {
                    min: s.min.min(v),
                    max: s.max.max(v),
                }),
            })
    }

    /// Position of `value` in [0, 1]. A flat range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> String {
        if !value.is_finite() {
            return NON_FINITE_FILL.to_string();
        }
        interpolate(self.normalize(value))
    }
}

/// Color at position `t` in [0, 1] along the ramp.
pub fn interpolate(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let pos = t * (BLUES.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(BLUES.len() - 1);
    let frac = pos - lo as f64;

    let a = rgb(BLUES[lo]);
    let b = rgb(BLUES[hi]);
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn rgb(hex: &str) -> (u8, u8, u8) {
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    (channel(1), channel(3), channel(5))
}
