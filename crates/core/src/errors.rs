use thiserror::Error;

use crate::messages;

/// Failures an intent handler can hit while working a turn.
///
/// Every variant is terminal to the current request only and maps to a
/// user-facing fulfillment string via [`OrderError::fulfillment_text`]; the
/// webhook boundary never surfaces these as HTTP errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("food item and quantity counts do not match ({items} items, {quantities} quantities)")]
    MismatchedQuantities { items: usize, quantities: usize },
    #[error("quantity for `{item}` is not a positive whole number")]
    InvalidQuantity { item: String },
    #[error("no order in progress for session `{session_id}`")]
    SessionNotFound { session_id: String },
    #[error("order store write failed: {0}")]
    StoreWrite(String),
}

impl OrderError {
    pub fn fulfillment_text(&self) -> &'static str {
        match self {
            Self::MismatchedQuantities { .. } | Self::InvalidQuantity { .. } => {
                messages::CLARIFY_ITEMS_AND_QUANTITIES
            }
            Self::SessionNotFound { .. } => messages::ORDER_NOT_FOUND,
            Self::StoreWrite(_) => messages::BACKEND_ERROR,
        }
    }
}
