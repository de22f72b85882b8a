//! Geometry primitives shared by the `ortelius` map core.
//!
//! Everything here is deliberately host-agnostic: points are plain
//! `nalgebra` types, and the only contact with a coordinate-system library
//! is the opaque [`Projection`](geo::Projection) trait. The core never does
//! reprojection math itself, it only moves already-projected coordinates
//! around.

pub mod cartesian;
pub mod geo;

pub use cartesian::{CartesianPoint2d, NewCartesianPoint2d, Point2d, Rect, Size, Vector2d};
pub use geo::Projection;
