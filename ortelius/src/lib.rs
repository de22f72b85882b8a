//! Ortelius is the interactive core of a layered map visualization stack.
//! It turns a dataset of projected points plus a set of host-drawn artists
//! into an interactive map: clicks find the nearest data points, layers can
//! be shown and composited with transparency, and redraws reuse cached
//! background rasters so that only the dynamic content is redrawn on every
//! event.
//!
//! # Main components
//!
//! Everything revolves around
//!
//! * the [`Map`] struct, which composes the current [`MapView`], the
//!   [`LayerRegistry`](map::LayerRegistry) of named layers, the
//!   [`BlitManager`](render::BlitManager) that coordinates redraws, and the
//!   per-layer datasets used for
//! * [`picking`](pick) - finding the data points nearest to a query
//!   position through a spatial index that is rebuilt whenever the dataset
//!   changes.
//!
//! The map by itself does nothing when the user moves the mouse. You can
//! think of it as a map hanging on a wall: it shows its layers and that is
//! all. Interactivity comes from
//!
//! * the [`EventDispatcher`](control::EventDispatcher), which consumes the
//!   host toolkit's input events and routes them to the callbacks you
//!   attach, respecting buttons, modifier keys, and layer visibility.
//!
//! The host rendering toolkit stays behind the [`Canvas`](render::Canvas)
//! and [`Artist`](render::Artist) traits: the core decides *what* to draw
//! and *when*, the host decides *how*.

pub mod config;
pub mod control;
pub mod error;
pub mod map;
pub mod messenger;
pub mod pick;
pub mod render;
mod view;

#[cfg(test)]
pub(crate) mod tests;

pub use config::CoreConfig;
pub use error::OrteliusError;
pub use map::{LayerRegistry, LayerSpec, Map, ALL_LAYER};
pub use messenger::{DummyMessenger, Messenger};
pub use view::MapView;

// Reexport ortelius_types
pub use ortelius_types;
