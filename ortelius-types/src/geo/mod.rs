//! The seam to the host projection library.

mod projection;

pub use projection::{IdentityProjection, Projection};
