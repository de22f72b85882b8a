use nalgebra::Scalar;
use num_traits::{Bounded, FromPrimitive, Num};

/// 2d point in plot-projection space.
pub type Point2d = nalgebra::Point2<f64>;

/// Difference between two [`Point2d`]s.
pub type Vector2d = nalgebra::Vector2<f64>;

/// Anything with cartesian `x`/`y` coordinates.
///
/// The core takes datasets as slices of `impl CartesianPoint2d`, so callers
/// can hand over their own point types without converting the whole array
/// first.
pub trait CartesianPoint2d {
    /// Numeric type of the coordinates.
    type Num: Num + Copy + PartialOrd + Bounded + Scalar + FromPrimitive;

    /// X coordinate.
    fn x(&self) -> Self::Num;
    /// Y coordinate.
    fn y(&self) -> Self::Num;

    /// Squared euclidean distance to `other`.
    fn distance_sq(&self, other: &impl CartesianPoint2d<Num = Self::Num>) -> Self::Num {
        let dx = self.x() - other.x();
        let dy = self.y() - other.y();
        dx * dx + dy * dy
    }
}

/// A [`CartesianPoint2d`] that can be constructed from its coordinates.
pub trait NewCartesianPoint2d: CartesianPoint2d {
    /// Creates a point from its coordinates.
    fn new(x: Self::Num, y: Self::Num) -> Self;
}

impl<Num: num_traits::Num + Copy + PartialOrd + Bounded + Scalar + FromPrimitive> CartesianPoint2d
    for nalgebra::Point2<Num>
{
    type Num = Num;

    fn x(&self) -> Num {
        self.x
    }
    fn y(&self) -> Num {
        self.y
    }
}

impl<Num: num_traits::Num + Copy + PartialOrd + Bounded + Scalar + FromPrimitive> NewCartesianPoint2d
    for nalgebra::Point2<Num>
{
    fn new(x: Num, y: Num) -> Self {
        nalgebra::Point2::new(x, y)
    }
}

impl<Num: num_traits::Num + Copy + PartialOrd + Bounded + Scalar + FromPrimitive> CartesianPoint2d
    for (Num, Num)
{
    type Num = Num;

    fn x(&self) -> Num {
        self.0
    }
    fn y(&self) -> Num {
        self.1
    }
}

impl<Num: num_traits::Num + Copy + PartialOrd + Bounded + Scalar + FromPrimitive> NewCartesianPoint2d
    for (Num, Num)
{
    fn new(x: Num, y: Num) -> Self {
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sq_between_tuple_and_nalgebra_points() {
        let a = (0.0, 0.0);
        let b = Point2d::new(3.0, 4.0);
        assert_eq!(a.distance_sq(&b), 25.0);
        assert_eq!(b.distance_sq(&a), 25.0);
    }
}
