pub mod config;
pub mod errors;
pub mod messages;
pub mod order;
pub mod session;

pub use errors::OrderError;
pub use order::{line_items_from_params, OrderAggregate, RemovalOutcome};
pub use session::{extract_session_id, SessionTable};
