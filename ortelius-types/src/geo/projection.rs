use std::marker::PhantomData;

use crate::cartesian::NewCartesianPoint2d;

/// Conversion between two coordinate systems.
///
/// The map core treats projections as opaque functions. Implementations are
/// expected to come from a projection library; the core only calls them when
/// feeding dataset coordinates into the spatial index.
pub trait Projection {
    /// Type of the input points.
    type InPoint;
    /// Type of the output points.
    type OutPoint;

    /// Projects a point. `None` means the point has no image in the target
    /// coordinate system.
    fn project(&self, input: &Self::InPoint) -> Option<Self::OutPoint>;

    /// Reverses [`Projection::project`].
    fn unproject(&self, input: &Self::OutPoint) -> Option<Self::InPoint>;
}

/// Projection that copies coordinates over unchanged. Useful when a dataset
/// is already in plot-projection space.
#[derive(Default)]
pub struct IdentityProjection<In, Out> {
    phantom_in: PhantomData<In>,
    phantom_out: PhantomData<Out>,
}

impl<In, Out> IdentityProjection<In, Out> {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self {
            phantom_in: PhantomData,
            phantom_out: PhantomData,
        }
    }
}

impl<In, Out> Projection for IdentityProjection<In, Out>
where
    In: NewCartesianPoint2d,
    Out: NewCartesianPoint2d<Num = In::Num>,
{
    type InPoint = In;
    type OutPoint = Out;

    fn project(&self, input: &Self::InPoint) -> Option<Self::OutPoint> {
        Some(Out::new(input.x(), input.y()))
    }

    fn unproject(&self, input: &Self::OutPoint) -> Option<Self::InPoint> {
        Some(In::new(input.x(), input.y()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartesian::Point2d;

    #[test]
    fn identity_round_trip() {
        let projection = IdentityProjection::<Point2d, Point2d>::new();
        let point = Point2d::new(3.5, -2.0);
        let projected = projection.project(&point).expect("identity never fails");
        assert_eq!(projected, point);
        let back = projection.unproject(&projected).expect("identity never fails");
        assert_eq!(back, point);
    }
}
