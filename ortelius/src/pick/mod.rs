//! Finding the data points nearest to a query location.
//!
//! Picking is split in two:
//! * [`SpatialIndex`] is an immutable kd-tree over a snapshot of projected
//!   dataset coordinates. It is rebuilt, never mutated, when the dataset or
//!   its plot coordinates change.
//! * [`Picker`] owns the index together with an optional value column and
//!   implements the user-facing pick contract: neighbor count, search
//!   radius (explicit or estimated from the dataset spacing) and the
//!   "relative to closest" neighbor selection.

mod picker;
mod spatial_index;

pub use picker::{PickConfig, PickHit, PickResult, Picker};
pub use spatial_index::{Neighbor, SpatialIndex};
