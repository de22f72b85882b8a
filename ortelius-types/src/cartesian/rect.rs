use nalgebra::Scalar;
use num_traits::{Bounded, FromPrimitive, Num};

use crate::cartesian::CartesianPoint2d;

/// Axis-aligned rectangle, e.g. the extent of a map view in projected
/// coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect<N = f64> {
    x_min: N,
    y_min: N,
    x_max: N,
    y_max: N,
}

impl<N: Num + Copy + PartialOrd + Scalar + Bounded + FromPrimitive> Rect<N> {
    /// Creates a new rectangle.
    pub fn new(x_min: N, y_min: N, x_max: N, y_max: N) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Smallest X coordinate of the rectangle.
    pub fn x_min(&self) -> N {
        self.x_min
    }

    /// Smallest Y coordinate of the rectangle.
    pub fn y_min(&self) -> N {
        self.y_min
    }

    /// Largest X coordinate of the rectangle.
    pub fn x_max(&self) -> N {
        self.x_max
    }

    /// Largest Y coordinate of the rectangle.
    pub fn y_max(&self) -> N {
        self.y_max
    }

    /// Width of the rectangle.
    pub fn width(&self) -> N {
        self.x_max - self.x_min
    }

    /// Height of the rectangle.
    pub fn height(&self) -> N {
        self.y_max - self.y_min
    }

    /// Returns true if the point lies inside or on the edge of the
    /// rectangle.
    pub fn contains(&self, point: &impl CartesianPoint2d<Num = N>) -> bool {
        point.x() >= self.x_min
            && point.x() <= self.x_max
            && point.y() >= self.y_min
            && point.y() <= self.y_max
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn merge(&self, other: Self) -> Self {
        Self {
            x_min: min(self.x_min, other.x_min),
            y_min: min(self.y_min, other.y_min),
            x_max: max(self.x_max, other.x_max),
            y_max: max(self.y_max, other.y_max),
        }
    }

    /// Bounding rectangle of a set of points. Returns `None` for an empty
    /// iterator.
    pub fn from_points<'a, P: CartesianPoint2d<Num = N> + 'a>(
        points: impl IntoIterator<Item = &'a P>,
    ) -> Option<Self> {
        let mut rect: Option<Self> = None;
        for point in points {
            let point_rect = Self::new(point.x(), point.y(), point.x(), point.y());
            rect = Some(match rect {
                Some(prev) => prev.merge(point_rect),
                None => point_rect,
            });
        }

        rect
    }
}

fn min<N: PartialOrd>(a: N, b: N) -> N {
    if a < b {
        a
    } else {
        b
    }
}

fn max<N: PartialOrd>(a: N, b: N) -> N {
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartesian::Point2d;

    #[test]
    fn contains_includes_edges() {
        let rect = Rect::new(0.0, 0.0, 10.0, 5.0);
        assert!(rect.contains(&Point2d::new(0.0, 0.0)));
        assert!(rect.contains(&Point2d::new(10.0, 5.0)));
        assert!(rect.contains(&Point2d::new(5.0, 2.5)));
        assert!(!rect.contains(&Point2d::new(10.1, 2.5)));
    }

    #[test]
    fn from_points_builds_bounding_rect() {
        let points = [
            Point2d::new(1.0, 7.0),
            Point2d::new(-3.0, 2.0),
            Point2d::new(4.0, 0.0),
        ];
        let rect = Rect::from_points(points.iter()).expect("non-empty input");
        assert_eq!(rect, Rect::new(-3.0, 0.0, 4.0, 7.0));

        let empty: [Point2d; 0] = [];
        assert!(Rect::from_points(empty.iter()).is_none());
    }
}
