//! Colors for points along the curve.
//!
//! A coloring is a pure function of how far along the curve a point
//! is (`progress`) and how long the curve is (`total`).  Workers call
//! it from many threads at once, so it must be `Sync`; any plain
//! function or closure of the right shape will do.

use crate::raster::Rgb;
use num::clamp;
use std::fmt;
use std::str::FromStr;

/// Chooses a color for a point `progress` characters into a curve
/// `total` characters long.
pub trait Coloring: Sync {
    /// The color for one point.
    fn color(&self, progress: u64, total: u64) -> Rgb;
}

impl<F> Coloring for F
where
    F: Fn(u64, u64) -> Rgb + Sync,
{
    fn color(&self, progress: u64, total: u64) -> Rgb {
        self(progress, total)
    }
}

fn channel(fraction: f64) -> u8 {
    clamp(fraction * 255.0, 0.0, 255.0) as u8
}

/// One sweep around the color wheel from red, through green and
/// blue, back to red.
pub fn hsv(progress: u64, total: u64) -> Rgb {
    let hue = progress as f64 / total.max(1) as f64 * 360.0;
    let ramp = channel(1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    if hue < 60.0 {
        Rgb(255, ramp, 0)
    } else if hue < 120.0 {
        Rgb(ramp, 255, 0)
    } else if hue < 160.0 {
        Rgb(0, 255, ramp)
    } else if hue < 240.0 {
        Rgb(0, ramp, 255)
    } else if hue < 300.0 {
        Rgb(ramp, 0, 255)
    } else if hue <= 360.0 {
        Rgb(255, 0, ramp)
    } else {
        Rgb::BLACK
    }
}

/// Fades between white and red, three times over the length of the
/// curve.
pub fn christmas(progress: u64, total: u64) -> Rgb {
    let period = total.max(1) as f64;
    let value = (progress as f64 % (period / 3.0)) * 3.0 / period;
    let fade = if value <= 0.5 {
        channel(1.0 - 2.0 * value)
    } else {
        channel(2.0 * value - 1.0)
    };
    Rgb(255, fade, fade)
}

/// The built-in colorings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Palette {
    /// See [`hsv`](fn.hsv.html).
    Hsv,
    /// See [`christmas`](fn.christmas.html).
    Christmas,
}

impl Coloring for Palette {
    fn color(&self, progress: u64, total: u64) -> Rgb {
        match self {
            Palette::Hsv => hsv(progress, total),
            Palette::Christmas => christmas(progress, total),
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Palette::Hsv => "hsv",
            Palette::Christmas => "christmas",
        })
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "hsv" => Ok(Palette::Hsv),
            "1" | "christmas" => Ok(Palette::Christmas),
            _ => Err(format!("unknown coloring '{}': expected hsv (0) or christmas (1)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_starts_red_and_passes_through_green_and_blue() {
        assert_eq!(hsv(0, 360), Rgb(255, 0, 0));
        assert_eq!(hsv(120, 360), Rgb(0, 255, 0));
        assert_eq!(hsv(240, 360), Rgb(0, 0, 255));
        assert_eq!(hsv(30, 360), Rgb(255, 127, 0));
    }

    #[test]
    fn hsv_breaks_at_160_degrees() {
        let Rgb(r, g, b) = hsv(150, 360);
        assert_eq!((r, g), (0, 255));
        assert!(b > 0);
        let Rgb(r, _, b) = hsv(170, 360);
        assert_eq!((r, b), (0, 255));
    }

    #[test]
    fn hsv_tolerates_an_empty_curve() {
        assert_eq!(hsv(0, 0), Rgb(255, 0, 0));
    }

    #[test]
    fn christmas_repeats_three_times() {
        assert_eq!(christmas(0, 300), Rgb::WHITE);
        assert_eq!(christmas(50, 300), Rgb(255, 0, 0));
        assert_eq!(christmas(100, 300), Rgb::WHITE);
        assert_eq!(christmas(150, 300), Rgb(255, 0, 0));
    }

    #[test]
    fn palettes_parse_by_name_or_number() {
        assert_eq!("hsv".parse::<Palette>(), Ok(Palette::Hsv));
        assert_eq!("0".parse::<Palette>(), Ok(Palette::Hsv));
        assert_eq!("Christmas".parse::<Palette>(), Ok(Palette::Christmas));
        assert_eq!("1".parse::<Palette>(), Ok(Palette::Christmas));
        assert!("plaid".parse::<Palette>().is_err());
    }

    #[test]
    fn closures_are_colorings() {
        let solid = |_: u64, _: u64| Rgb(1, 2, 3);
        assert_eq!(solid.color(9, 10), Rgb(1, 2, 3));
        assert_eq!(Palette::Hsv.color(0, 1), hsv(0, 1));
    }
}
