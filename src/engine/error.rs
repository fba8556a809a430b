//! Error type for cart operations.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors returned by [`crate::engine::CartHandle`] operations.
///
/// Remote failures on mutations are reported *after* the optimistic state
/// has been rolled back, so a caller seeing `Remote` knows the cart equals
/// its pre-mutation state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    /// The engine task is no longer accepting requests.
    #[error("cart engine is closed")]
    EngineClosed,

    /// The engine dropped the response channel before answering.
    #[error("cart engine dropped the response channel")]
    EngineDropped,

    /// Quantities below 1 are rejected; remove the line instead.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("no cart line with id {0}")]
    UnknownLine(String),

    /// Another mutation for the same item is still in flight.
    #[error("a mutation for {0} is already in flight")]
    MutationPending(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
