//! Fulfillment-text catalog.
//!
//! The NLP platform relays these strings verbatim to the user, so handlers
//! build every reply from this module instead of formatting inline.

pub const CLARIFY_ITEMS_AND_QUANTITIES: &str =
    "Sorry I didn't understand. Can you please specify food items and quantities clearly?";

pub const ORDER_NOT_FOUND: &str =
    "I'm having a trouble finding your order. Sorry! Can you place a new order please?";

pub const BACKEND_ERROR: &str =
    "Sorry, I couldn't process your order due to a backend error. Please place a new order again";

pub const FALLBACK_HELP: &str =
    "How can I help you today? You can say 'New Order' or 'Track Order'.";

pub const APOLOGY: &str =
    "Sorry, something went wrong. Please try again. You can say 'New Order' or 'Track Order'.";

pub const CHAT_EMPTY_MESSAGE: &str = "Please type a message.";

pub const CHAT_PLACEHOLDER_REPLY: &str = "Hi! I'm the SpiceBite assistant. You can add items from \
    the menu, or type things like 'I want 2 Pav Bhaji' or 'Remove Pizza'. Connect Dialogflow to \
    this backend for full NLP.";

pub const CHAT_APOLOGY: &str = "Something went wrong. Please try again.";

pub fn order_so_far(order_text: &str) -> String {
    format!("So far you have: {order_text}. Do you need anything else?")
}

pub fn order_placed(order_id: i64, total: impl std::fmt::Display) -> String {
    format!(
        "Awesome! Your order is placed. Here is your order Id # {order_id}. \
         Your order total is {total} which you can pay at the time of delivery."
    )
}

pub fn removed_items(items: &[String]) -> String {
    format!("Removed {} from your order!", items.join(","))
}

pub fn no_such_items(items: &[String]) -> String {
    format!(" Your current order does not have {}", items.join(","))
}

pub const ORDER_EMPTY_SUFFIX: &str = " Your order is empty!";

pub fn order_remaining(order_text: &str) -> String {
    format!(" Here is what is left in your order: {order_text}")
}

pub fn order_status(order_id: i64, status: &str) -> String {
    format!("The order status for order id: {order_id} is: {status}")
}

pub fn order_status_not_found(order_id: i64) -> String {
    format!("No order found with order id: {order_id}")
}
