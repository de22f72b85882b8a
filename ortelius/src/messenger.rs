//! Notifying the host application that the map wants to be redrawn.

/// Callback interface the host application gives to the map so that the map
/// can request redraws when its state changes outside of a draw cycle.
pub trait Messenger {
    /// Request an asynchronous redraw of the map.
    fn request_redraw(&self);
}

/// Messenger that does nothing. Useful for tests and offscreen rendering.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
