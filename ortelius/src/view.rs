//! Current position and scale of the map on the screen.

use ortelius_types::cartesian::{Point2d, Rect, Size};

/// Map view specifies the part of the map that is displayed: the projected
/// coordinates of the center, the resolution (map units per pixel) and the
/// pixel size of the output surface.
///
/// A view is a plain value. Changing the view of a [`Map`](crate::Map)
/// replaces the value, which is also what invalidates cached background
/// snapshots in the redraw coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    center: Point2d,
    resolution: f64,
    size: Size,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: Point2d::new(0.0, 0.0),
            resolution: 1.0,
            size: Size::default(),
        }
    }
}

impl MapView {
    /// Creates a new view centered at `center` with the given resolution.
    pub fn new(center: Point2d, resolution: f64) -> Self {
        Self {
            center,
            resolution,
            ..Default::default()
        }
    }

    /// Center of the view in projected coordinates.
    pub fn center(&self) -> Point2d {
        self.center
    }

    /// Resolution of the view in map units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Size of the output surface in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns a copy of the view with the given center.
    pub fn with_center(&self, center: Point2d) -> Self {
        Self { center, ..*self }
    }

    /// Returns a copy of the view with the given resolution.
    pub fn with_resolution(&self, resolution: f64) -> Self {
        Self {
            resolution,
            ..*self
        }
    }

    /// Returns a copy of the view with the given size.
    pub fn with_size(&self, size: Size) -> Self {
        Self { size, ..*self }
    }

    /// Extent of the view in projected coordinates.
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.center.x - self.size.half_width() * self.resolution,
            self.center.y - self.size.half_height() * self.resolution,
            self.center.x + self.size.half_width() * self.resolution,
            self.center.y + self.size.half_height() * self.resolution,
        )
    }

    /// Converts a screen position (pixels from the top-left corner) into
    /// projected map coordinates.
    pub fn px_to_map(&self, px: Point2d) -> Point2d {
        Point2d::new(
            self.center.x + (px.x - self.size.half_width()) * self.resolution,
            self.center.y - (px.y - self.size.half_height()) * self.resolution,
        )
    }

    /// Converts projected map coordinates into a screen position (pixels
    /// from the top-left corner).
    pub fn map_to_px(&self, map: Point2d) -> Point2d {
        Point2d::new(
            (map.x - self.center.x) / self.resolution + self.size.half_width(),
            (self.center.y - map.y) / self.resolution + self.size.half_height(),
        )
    }
}
