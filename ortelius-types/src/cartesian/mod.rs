//! Cartesian (already projected) geometry types.

mod point;
mod rect;
mod size;

pub use point::{CartesianPoint2d, NewCartesianPoint2d, Point2d, Vector2d};
pub use rect::Rect;
pub use size::Size;
