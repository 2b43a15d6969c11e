//! # Geometry
//!
//! Two coordinate spaces meet in this crate:
//!
//! ```text
//!  page space (PDF)            screen space (editing)
//!  y ↑                         (0,0) ──────→ x
//!    │   ┌───┐                   │   ┌───┐
//!    │   └───┘ ← (x, y)          │   └───┘
//!  (0,0) ──────→ x               y ↓   ↑ (x, y) is the top-left corner
//! ```
//!
//! Both spaces share x. A box of height `h` whose bottom edge sits at `y` in
//! page space has its top edge at `extent - y - h` in screen space, and the
//! same formula maps back. All conversions go through [`flip_y`].

use serde::{Deserialize, Serialize};

/// Map a box's y coordinate between bottom-left and top-left origin spaces.
///
/// The mapping is its own inverse: `flip_y(e, flip_y(e, y, h), h) == y`.
pub fn flip_y(extent: f64, y: f64, height: f64) -> f64 {
    extent - y - height
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the rectangle by `pad` on every side.
    pub fn expand(&self, pad: f64) -> Self {
        Self {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + pad * 2.0,
            height: self.height + pad * 2.0,
        }
    }

    /// The same rectangle expressed in the other coordinate space.
    pub fn flipped(&self, extent: f64) -> Self {
        Self {
            y: flip_y(extent, self.y, self.height),
            ..*self
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Round to one decimal place, used to keep threshold comparisons free of
/// floating-point noise.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_y_baseline_to_screen() {
        // 792pt page, run baseline at 700 with 12pt height
        assert!((flip_y(792.0, 700.0, 12.0) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_flip_y_is_involution() {
        for &(y, h) in &[(0.0, 10.0), (123.4, 14.4), (780.0, 12.0)] {
            let back = flip_y(792.0, flip_y(792.0, y, h), h);
            assert!((back - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bounds_flipped_keeps_x_and_size() {
        let b = Bounds::new(10.0, 20.0, 50.0, 12.0).flipped(100.0);
        assert_eq!(b, Bounds::new(10.0, 68.0, 50.0, 12.0));
    }

    #[test]
    fn test_expand() {
        let b = Bounds::new(10.0, 10.0, 50.0, 12.0).expand(2.0);
        assert_eq!(b, Bounds::new(8.0, 8.0, 54.0, 16.0));
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(2.4999999), 2.5);
        assert_eq!(round1(0.30000000000000004), 0.3);
        assert_eq!(round1(-0.04), -0.0);
    }
}
