use thiserror::Error;

use crate::types::{Asset, MAX_PRICE, MAX_VOLUME, OrderId, UserId};

/// Represents every failure a core operation can return.
///
/// Errors are returned as values; a failed validation leaves all state
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// No cash record exists for this user.
    #[error("user {0} not found")]
    UserNotFound(UserId),
    /// The user has no asset record on this book.
    #[error("user {0} not registered on the {1} book")]
    NotRegistered(UserId, Asset),
    /// Price or volume falls outside the allowed range.
    #[error("price must be in [1, {MAX_PRICE}] and volume in [1, {MAX_VOLUME}]")]
    OutOfRange,
    /// A buy order costs more than the user's remaining buying power.
    #[error("insufficient buying power for order")]
    InsufficientBuyingPower,
    /// A sell order asks for more than the user's remaining selling power.
    #[error("insufficient {0} for order")]
    InsufficientAsset(Asset),
    /// The order to cancel is not resting on this book.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}
