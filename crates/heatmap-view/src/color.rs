//! Diverging red-white-green color scale centered at 0 %

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Relative luminance below the midpoint, so labels should be light
    pub fn is_dark(&self) -> bool {
        let luma = 0.2126 * self.0 as f64 + 0.7152 * self.1 as f64 + 0.0722 * self.2 as f64;
        luma < 140.0
    }

    fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

/// Deep red, light red, white, light green, deep green
pub const STOPS: [Rgb; 5] = [
    Rgb(165, 15, 21),
    Rgb(251, 106, 74),
    Rgb(255, 255, 255),
    Rgb(116, 196, 118),
    Rgb(0, 109, 44),
];

/// Maps a percent change onto [`STOPS`] over the symmetric domain `[-max_abs, max_abs]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivergingScale {
    max_abs: f64,
}

impl DivergingScale {
    pub fn new(max_abs: f64) -> Self {
        let max_abs = if max_abs.is_finite() { max_abs.abs() } else { 0.0 };
        Self { max_abs }
    }

    /// Scale wide enough for every value in `changes`
    pub fn for_changes(changes: impl IntoIterator<Item = f64>) -> Self {
        let max_abs = changes
            .into_iter()
            .filter(|c| c.is_finite())
            .fold(0.0_f64, |acc, c| acc.max(c.abs()));
        Self::new(max_abs)
    }

    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    /// Position on the scale in `[0, 1]`; 0 % is always 0.5.
    pub fn position(&self, change: f64) -> f64 {
        if self.max_abs == 0.0 || !change.is_finite() {
            return 0.5;
        }
        (0.5 + change / (2.0 * self.max_abs)).clamp(0.0, 1.0)
    }

    pub fn color(&self, change: f64) -> Rgb {
        let scaled = self.position(change) * (STOPS.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(STOPS.len() - 2);
        Rgb::lerp(STOPS[lower], STOPS[lower + 1], scaled - lower as f64)
    }

    /// `(offset, color)` pairs for drawing a legend gradient
    pub fn legend(&self) -> Vec<(f64, Rgb)> {
        STOPS
            .iter()
            .enumerate()
            .map(|(i, c)| (i as f64 / (STOPS.len() - 1) as f64, *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_white() {
        let scale = DivergingScale::for_changes([-3.0, 8.0]);
        assert_eq!(scale.color(0.0), Rgb(255, 255, 255));
        assert_eq!(scale.position(0.0), 0.5);
    }

    #[test]
    fn test_extremes_hit_the_end_stops() {
        let scale = DivergingScale::for_changes([-3.0, 8.0]);
        assert_eq!(scale.max_abs(), 8.0);
        assert_eq!(scale.color(8.0), STOPS[4]);
        assert_eq!(scale.color(-8.0), STOPS[0]);
        // Clamped beyond the domain
        assert_eq!(scale.color(50.0), STOPS[4]);
    }

    #[test]
    fn test_sign_picks_the_side() {
        let scale = DivergingScale::new(4.0);
        let up = scale.color(2.0);
        let down = scale.color(-2.0);
        assert!(up.1 > up.0, "gains lean green: {:?}", up);
        assert!(down.0 > down.1, "losses lean red: {:?}", down);
        assert_eq!(up, STOPS[3]);
    }

    #[test]
    fn test_flat_domain_is_all_white() {
        let scale = DivergingScale::for_changes([0.0, 0.0]);
        assert_eq!(scale.color(0.0), Rgb(255, 255, 255));
        assert_eq!(DivergingScale::for_changes(Vec::new()).color(1.0), Rgb(255, 255, 255));
    }

    #[test]
    fn test_hex_and_contrast() {
        assert_eq!(Rgb(0, 109, 44).to_hex(), "#006d2c");
        assert!(STOPS[0].is_dark());
        assert!(!STOPS[2].is_dark());
    }
}
