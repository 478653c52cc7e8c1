//! Map viewport deltas.
//!
//! The map client reports its previous and current viewport as eight
//! comma-separated numbers. Only parcels inside the region where the two
//! rectangles differ are sent back, so panning re-uses what the client
//! already has.

use geo::{Area, BooleanOps, Coord, Distance, Haversine, MultiPolygon, Point, Rect};
use thiserror::Error;

/// Largest viewport diagonal that may be queried, in meters.
pub const MAX_VIEWPORT_DIAGONAL_M: f64 = 10_000.0;

/// Errors returned for unusable viewport parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    /// The parameter string is not eight finite numbers.
    #[error("Invalid bbox parameters: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },

    /// The current viewport is too large to query.
    #[error("Viewport too large: diagonal of {diagonal_m:.0} m exceeds 10 km")]
    TooLarge {
        /// Diagonal of the requested viewport in meters.
        diagonal_m: f64,
    },
}

/// A previous and current map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportDelta {
    /// Viewport the client already has data for.
    pub previous: Rect<f64>,
    /// Viewport the client is showing now.
    pub current: Rect<f64>,
}

impl ViewportDelta {
    /// Parses `prevMinX,prevMinY,prevMaxX,prevMaxY,minX,minY,maxX,maxY`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::Malformed`] unless there are exactly eight
    /// finite numbers.
    pub fn parse(s: &str) -> Result<Self, ViewportError> {
        let values = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ViewportError::Malformed {
                message: e.to_string(),
            })?;

        let &[px0, py0, px1, py1, x0, y0, x1, y1] = values.as_slice() else {
            return Err(ViewportError::Malformed {
                message: format!("expected 8 values, got {}", values.len()),
            });
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ViewportError::Malformed {
                message: "values must be finite".to_string(),
            });
        }

        Ok(Self {
            previous: Rect::new(Coord { x: px0, y: py0 }, Coord { x: px1, y: py1 }),
            current: Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }),
        })
    }

    /// Haversine length of the current viewport's diagonal in meters.
    #[must_use]
    pub fn diagonal_m(&self) -> f64 {
        Haversine.distance(
            Point::from(self.current.min()),
            Point::from(self.current.max()),
        )
    }

    /// Parses and checks a viewport delta in one step.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError`] if the parameters are malformed or the
    /// current viewport diagonal exceeds [`MAX_VIEWPORT_DIAGONAL_M`].
    pub fn parse_checked(s: &str) -> Result<Self, ViewportError> {
        let delta = Self::parse(s)?;
        let diagonal_m = delta.diagonal_m();
        if diagonal_m > MAX_VIEWPORT_DIAGONAL_M {
            return Err(ViewportError::TooLarge { diagonal_m });
        }
        Ok(delta)
    }

    /// Region covered by exactly one of the two viewports, or `None` when
    /// they cover the same area.
    #[must_use]
    pub fn changed_region(&self) -> Option<MultiPolygon<f64>> {
        if self.previous == self.current {
            return None;
        }

        let current = self.current.to_polygon();

        if self.previous.to_polygon().unsigned_area() <= 0.0 {
            return (current.unsigned_area() > 0.0).then(|| MultiPolygon(vec![current]));
        }

        let region = self.previous.to_polygon().xor(&current);
        (region.unsigned_area() > 0.0).then_some(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eight_values() {
        let delta =
            ViewportDelta::parse("14.50,46.05,14.51,46.06, 14.51,46.05,14.50,46.06").unwrap();
        assert!((delta.current.min().x - 14.50).abs() < f64::EPSILON);
        assert!((delta.current.max().x - 14.51).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_wrong_count_and_garbage() {
        assert!(matches!(
            ViewportDelta::parse("1,2,3,4,5,6,7"),
            Err(ViewportError::Malformed { .. })
        ));
        assert!(matches!(
            ViewportDelta::parse("1,2,3,4,5,6,7,8,9"),
            Err(ViewportError::Malformed { .. })
        ));
        assert!(matches!(
            ViewportDelta::parse("1,2,3,4,5,6,7,x"),
            Err(ViewportError::Malformed { .. })
        ));
        assert!(matches!(
            ViewportDelta::parse("1,2,3,4,5,6,7,inf"),
            Err(ViewportError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_large_viewports() {
        let result = ViewportDelta::parse_checked("0,0,0,0,14.0,46.0,14.5,46.5");
        assert!(matches!(result, Err(ViewportError::TooLarge { .. })));
        assert!(ViewportDelta::parse_checked("0,0,0,0,14.50,46.05,14.51,46.06").is_ok());
    }

    #[test]
    fn identical_viewports_have_no_region() {
        let delta = ViewportDelta::parse("14.50,46.05,14.51,46.06,14.50,46.05,14.51,46.06").unwrap();
        assert_eq!(delta.changed_region(), None);
    }

    #[test]
    fn first_load_returns_whole_viewport() {
        let delta = ViewportDelta::parse("0,0,0,0,14.50,46.05,14.51,46.06").unwrap();
        let region = delta.changed_region().unwrap();
        assert!((region.unsigned_area() - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn panning_returns_strips() {
        let delta = ViewportDelta::parse("14.50,46.05,14.51,46.06,14.505,46.05,14.515,46.06").unwrap();
        let region = delta.changed_region().unwrap();
        // Two 0.005 x 0.01 strips.
        assert!((region.unsigned_area() - 0.0001).abs() < 1e-7, "{}", region.unsigned_area());
    }
}
