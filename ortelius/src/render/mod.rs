//! The seam to the host rendering toolkit.
//!
//! The core does not rasterize anything itself. It schedules drawing: the
//! host gives it a [`Canvas`] that can draw artists, capture the current
//! raster as an opaque [`Snapshot`] and restore such a snapshot later. The
//! [`BlitManager`] uses those primitives to avoid redrawing unchanged
//! background content on every interactive frame.

use std::any::Any;

use ortelius_types::cartesian::Size;

use crate::error::OrteliusError;
use crate::view::MapView;

mod blit;

pub use blit::{ArtistId, BlitManager};

/// A drawable object owned by the host application.
///
/// Artists are registered with the [`BlitManager`] which only keeps weak
/// references to them; dropping all strong references unregisters an artist
/// implicitly (with a logged warning during the next redraw).
pub trait Artist {
    /// Draws the artist onto the canvas for the given view.
    fn draw(&self, view: &MapView, canvas: &mut dyn Canvas) -> Result<(), OrteliusError>;

    /// The blit manager stores artists as trait objects. This method can be
    /// used by the host to get the concrete type back.
    fn as_any(&self) -> &dyn Any;
}

/// Raster surface provided by the host rendering toolkit.
pub trait Canvas {
    /// Size of the surface in pixels.
    fn size(&self) -> Size;

    /// DPI scale factor of the surface.
    fn dpi_scale(&self) -> f32;

    /// Clears the surface.
    fn clear(&mut self);

    /// Captures the current raster content as an opaque snapshot.
    fn capture(&mut self) -> Snapshot;

    /// Draws a previously captured snapshot over the current content with
    /// the given opacity (`1.0` = fully opaque).
    fn restore(&mut self, snapshot: &Snapshot, opacity: f32);
}

/// Opaque raster snapshot created by [`Canvas::capture`].
///
/// The core never looks inside: it only hands snapshots back to the canvas
/// they came from.
pub struct Snapshot(Box<dyn Any>);

impl Snapshot {
    /// Wraps host snapshot data.
    pub fn new(data: impl Any) -> Self {
        Self(Box::new(data))
    }

    /// The host data this snapshot wraps.
    pub fn as_any(&self) -> &dyn Any {
        &*self.0
    }
}
