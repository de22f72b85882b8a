//! Error types used by the crate.

use thiserror::Error;

use crate::control::CallbackId;

/// Ortelius error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrteliusError {
    /// The dataset contains no points the spatial index could be built over.
    ///
    /// Recoverable by setting a non-empty dataset.
    #[error("dataset contains no pickable points")]
    EmptyDataset,
    /// A pick was requested before the spatial index was built.
    ///
    /// This is a programmer error: set the data before picking.
    #[error("spatial index is not built yet")]
    IndexNotReady,
    /// An unknown callback id was passed to a removal method.
    #[error("callback {0} is not registered")]
    CallbackNotFound(CallbackId),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}
