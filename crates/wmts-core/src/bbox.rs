//! Bounding box type and operations.
//!
//! All coordinates are in projected meters (LV95 / EPSG:2056 for the Swiss
//! grid). The textual form used in WMS queries is `x_min,y_min,x_max,y_max`
//! with fixed six-fractional-digit decimals.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// An axis-aligned rectangle in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    /// Create a new bounding box, rejecting inverted corners.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> CoreResult<Self> {
        if x_min > x_max || y_min > y_max {
            return Err(CoreError::InvalidBbox(format!(
                "x_min must not exceed x_max and y_min must not exceed y_max, got [{}, {}, {}, {}]",
                x_min, y_min, x_max, y_max
            )));
        }
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Create a bounding box from a `[x_min, y_min, x_max, y_max]` slice.
    pub fn from_array(arr: &[f64]) -> CoreResult<Self> {
        if arr.len() != 4 {
            return Err(CoreError::InvalidBbox(format!(
                "expected 4 values, got {}",
                arr.len()
            )));
        }
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Area of the bounding box in squared coordinate units.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check if this bbox overlaps another.
    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.x_max < other.x_min
            || self.x_min > other.x_max
            || self.y_max < other.y_min
            || self.y_min > other.y_max)
    }

    /// Check if this bbox completely contains another.
    pub fn contains(&self, other: &BBox) -> bool {
        self.x_min <= other.x_min
            && self.x_max >= other.x_max
            && self.y_min <= other.y_min
            && self.y_max >= other.y_max
    }

    /// Return a copy grown by `amount` units on every side.
    ///
    /// A negative amount shrinks the box; the caller is responsible for not
    /// shrinking it past inversion.
    pub fn expand(&self, amount: f64) -> BBox {
        BBox {
            x_min: self.x_min - amount,
            y_min: self.y_min - amount,
            x_max: self.x_max + amount,
            y_max: self.y_max + amount,
        }
    }

    /// The bbox as a `[x_min, y_min, x_max, y_max]` array.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    /// Canonical WMS textual form: fixed decimal, six fractional digits.
    ///
    /// Upstream WMS caches key on the literal BBOX string, so the formatting
    /// must stay byte-stable across calls.
    pub fn to_wms_string(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wms_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_inversion() {
        assert!(BBox::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(BBox::new(0.0, 10.0, 10.0, 0.0).is_err());
        assert!(BBox::new(0.0, 0.0, 10.0, 10.0).is_ok());
    }

    #[test]
    fn test_from_array() {
        let bbox = BBox::from_array(&[2420000.0, 1030000.0, 2900000.0, 1350000.0]).unwrap();
        assert_eq!(bbox.width(), 480000.0);
        assert_eq!(bbox.height(), 320000.0);
        assert!(BBox::from_array(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BBox::new(5.0, 5.0, 15.0, 15.0).unwrap();
        let c = BBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
        let inner = BBox::new(2.0, 2.0, 8.0, 8.0).unwrap();

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains(&inner));
        assert!(!a.contains(&b));
    }

    #[test]
    fn test_expand() {
        let bbox = BBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
        let grown = bbox.expand(2.5);
        assert_eq!(grown.to_array(), [7.5, 7.5, 22.5, 22.5]);
        // original is untouched
        assert_eq!(bbox.to_array(), [10.0, 10.0, 20.0, 20.0]);
    }

    #[test]
    fn test_wms_string_formatting() {
        let bbox = BBox::new(2417500.0, 1334700.0, 2435300.0, 1352500.0).unwrap();
        assert_eq!(
            bbox.to_wms_string(),
            "2417500.000000,1334700.000000,2435300.000000,1352500.000000"
        );
    }
}
