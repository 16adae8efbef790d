//! Contains the PlaneMapper struct, which describes a relationship
//! between the real plane the turtle walks on and a rectangle on the
//! integral plane with an origin at 0,0: the pixels of the image.
//!
//! The mapper is built from the bounding box the table computes for
//! the whole curve.  The box is padded by a margin on every side and
//! scaled, so that one unit of turtle movement spans `scale` pixels.
use crate::error::{RenderError, Result};
use crate::geometry::{BoundingBox, Pose};

/// Turtle units of empty space left around the curve on every side.
pub const MARGIN: f64 = 5.0;

// Extents that come out a hair under a whole number of pixels, through
// rounding in the table, still get that whole number.
const SNAP: f64 = 1e-7;

// Points are moved to the nearest millionth of a pixel before rounding,
// so the same point reached by different sums of steps gets one pixel.
const GRID: f64 = 1e6;

fn snap(v: f64) -> f64 {
    (v * GRID).round() / GRID
}

/// Describes the width and height of an integral plane that is assumed
/// to start at 0,0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the column, row of a point in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pixel(pub usize, pub usize);

/// Maps the turtle's real plane onto the integral plane.
#[derive(Clone, Debug)]
pub struct PlaneMapper {
    /// The size of the image.
    pub integral_plane: IntegralPlane,
    /// The region of the real plane the image has to cover.
    pub bounds: BoundingBox,
    scale: f64,
}

impl PlaneMapper {
    /// Constructor.  Takes the box the curve is known to stay inside,
    /// and the number of pixels per unit of turtle movement.
    pub fn new(bounds: BoundingBox, scale: u32) -> Result<PlaneMapper> {
        if scale == 0 {
            return Err(RenderError::InvalidParameter {
                name: "scale",
                reason: "must be at least one pixel per unit".to_string(),
            });
        }
        let finite = [bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || bounds.width() < 0.0 || bounds.height() < 0.0 {
            return Err(RenderError::InvalidParameter {
                name: "bounds",
                reason: format!("{:?} is not a usable region", bounds),
            });
        }

        let scale = f64::from(scale);
        let width = ((bounds.width() + 2.0 * MARGIN) * scale + SNAP) as usize;
        let height = ((bounds.height() + 2.0 * MARGIN) * scale + SNAP) as usize;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidParameter {
                name: "image size",
                reason: format!("{}x{} has no pixels", width, height),
            });
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            bounds,
            scale,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// Move a pose from turtle units into canvas units, where the
    /// image's corner is at 0,0 and one unit is one pixel.  Headings
    /// are unchanged.
    pub fn to_canvas(&self, pose: &Pose) -> Pose {
        Pose {
            x: (pose.x - self.bounds.min_x + MARGIN) * self.scale,
            y: (pose.y - self.bounds.min_y + MARGIN) * self.scale,
            heading: pose.heading,
        }
    }

    /// Given a point in canvas units, find the nearest pixel.  Halves
    /// round up, after snapping away float noise in the last few bits.
    /// Points that land outside the image have no pixel.
    pub fn point_to_pixel(&self, x: f64, y: f64) -> Option<Pixel> {
        let column = (snap(x) + 0.5).floor();
        let row = (snap(y) + 0.5).floor();
        let inside = column >= 0.0
            && column < self.integral_plane.0 as f64
            && row >= 0.0
            && row < self.integral_plane.1 as f64;
        if inside {
            Some(Pixel(column as usize, row as usize))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox {
            min_x: 0.0,
            max_x: 10.0,
            min_y: -2.0,
            max_y: 2.0,
        }
    }

    #[test]
    fn planemapper_fails_on_zero_scale() {
        assert!(PlaneMapper::new(unit_box(), 0).is_err());
    }

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let inverted = BoundingBox {
            min_x: 1.0,
            max_x: -1.0,
            min_y: 0.0,
            max_y: 0.0,
        };
        assert!(PlaneMapper::new(inverted, 1).is_err());
        let infinite = BoundingBox {
            max_x: std::f64::INFINITY,
            ..unit_box()
        };
        assert!(PlaneMapper::new(infinite, 1).is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(unit_box(), 1).unwrap();
        assert_eq!(pm.integral_plane, IntegralPlane(20, 14));
        assert_eq!((pm.width(), pm.height()), (20, 14));
    }

    #[test]
    fn the_margin_scales_with_the_image() {
        let pm = PlaneMapper::new(unit_box(), 3).unwrap();
        assert_eq!(pm.integral_plane, IntegralPlane(60, 42));
    }

    #[test]
    fn a_single_point_still_gets_a_canvas() {
        let pm = PlaneMapper::new(BoundingBox::ORIGIN, 1).unwrap();
        assert_eq!(pm.integral_plane, IntegralPlane(10, 10));
        let origin = pm.to_canvas(&Pose::ORIGIN);
        assert_eq!(pm.point_to_pixel(origin.x, origin.y), Some(Pixel(5, 5)));
    }

    #[test]
    fn to_canvas_shifts_and_scales() {
        let pm = PlaneMapper::new(unit_box(), 2).unwrap();
        let p = pm.to_canvas(&Pose::new(1.0, -2.0, 0.75));
        assert_eq!(p, Pose::new(12.0, 10.0, 0.75));
    }

    #[test]
    fn point_to_pixel_rounds_to_nearest() {
        let pm = PlaneMapper::new(unit_box(), 1).unwrap();
        assert_eq!(pm.point_to_pixel(2.2, 3.7), Some(Pixel(2, 4)));
        assert_eq!(pm.point_to_pixel(0.0, 0.0), Some(Pixel(0, 0)));
        assert_eq!(pm.point_to_pixel(19.4, 13.4), Some(Pixel(19, 13)));
    }

    #[test]
    fn point_to_pixel_rounds_halves_up() {
        let pm = PlaneMapper::new(unit_box(), 1).unwrap();
        assert_eq!(pm.point_to_pixel(2.5, 3.5), Some(Pixel(3, 4)));
    }

    #[test]
    fn point_to_pixel_rejects_points_off_the_image() {
        let pm = PlaneMapper::new(unit_box(), 1).unwrap();
        assert_eq!(pm.point_to_pixel(-0.6, 1.0), None);
        assert_eq!(pm.point_to_pixel(19.5, 1.0), None);
        assert_eq!(pm.point_to_pixel(1.0, 13.5), None);
        assert_eq!(pm.point_to_pixel(std::f64::NAN, 1.0), None);
    }

    #[test]
    fn float_noise_does_not_move_a_half() {
        let pm = PlaneMapper::new(unit_box(), 1).unwrap();
        let cos36 = (std::f64::consts::PI / 5.0).cos();
        let cos72 = (2.0 * std::f64::consts::PI / 5.0).cos();
        let by_steps = 2.0 + cos36 - cos72;
        let by_summary = 2.0 - cos72 + cos36;
        assert_eq!(pm.point_to_pixel(by_steps, 0.0), Some(Pixel(3, 0)));
        assert_eq!(pm.point_to_pixel(by_summary, 0.0), Some(Pixel(3, 0)));
        assert_eq!(pm.point_to_pixel(2.5 - 1e-12, 0.0), Some(Pixel(3, 0)));
        assert_eq!(pm.point_to_pixel(2.5 + 1e-12, 0.0), Some(Pixel(3, 0)));
        assert_eq!(pm.point_to_pixel(2.4999, 0.0), Some(Pixel(2, 0)));
    }
}
