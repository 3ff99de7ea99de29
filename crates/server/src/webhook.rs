//! The Dialogflow-style webhook endpoint.
//!
//! `POST /` receives the platform's webhook envelope, resolves the session
//! id, dispatches on the intent name, and always answers HTTP 200 with a
//! `{"fulfillmentText": ...}` body. Any internal failure is converted into a
//! generic apology at this boundary rather than surfaced as an HTTP error.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spicebite_core::{
    extract_session_id, line_items_from_params, messages, OrderAggregate, OrderError,
    SessionTable,
};
use spicebite_db::{OrderStore, StoreError};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct WebhookState {
    pub sessions: Arc<SessionTable>,
    pub store: Arc<dyn OrderStore>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(rename = "queryResult")]
    query_result: Option<QueryResult>,
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    intent: Option<IntentRef>,
    #[serde(default)]
    parameters: Value,
    #[serde(rename = "outputContexts", default)]
    output_contexts: Vec<OutputContext>,
}

#[derive(Debug, Deserialize)]
struct IntentRef {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct OutputContext {
    name: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    #[serde(rename = "fulfillmentText")]
    pub fulfillment_text: String,
}

/// Everything that can go wrong before a handler produces fulfillment text.
/// All of it collapses into the apology reply at the endpoint boundary.
#[derive(Debug, Error)]
enum WebhookError {
    #[error("invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("webhook payload has no queryResult")]
    MissingQueryResult,
    #[error("missing or malformed parameter `{0}`")]
    Parameter(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The four webhook-backed intent kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Intent {
    AddToOrder,
    RemoveFromOrder,
    CompleteOrder,
    TrackOrder,
}

/// Exact-match intent dispatch table. The platform sends `order complete`
/// both with and without the dot, so both spellings map to completion.
const INTENT_TABLE: &[(&str, Intent)] = &[
    ("order.add - context: ongoing-order", Intent::AddToOrder),
    ("order.remove - context: ongoing-order", Intent::RemoveFromOrder),
    ("order.complete - context: ongoing-order", Intent::CompleteOrder),
    ("order complete - context: ongoing-order", Intent::CompleteOrder),
    ("track.order - context: ongoing-tracking", Intent::TrackOrder),
];

fn resolve_intent(display_name: &str) -> Option<Intent> {
    INTENT_TABLE.iter().find(|(name, _)| *name == display_name).map(|(_, intent)| *intent)
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/", post(handle_webhook)).with_state(state)
}

/// Top-level error boundary: the body is parsed inside the handler so that a
/// malformed envelope still yields the well-formed apology response.
async fn handle_webhook(
    State(state): State<WebhookState>,
    body: String,
) -> Json<WebhookResponse> {
    let fulfillment_text = match process_request(&state, &body).await {
        Ok(text) => text,
        Err(error) => {
            error!(
                event_name = "webhook.request.failed",
                error = %error,
                "webhook request failed; returning apology"
            );
            messages::APOLOGY.to_string()
        }
    };

    Json(WebhookResponse { fulfillment_text })
}

async fn process_request(state: &WebhookState, body: &str) -> Result<String, WebhookError> {
    let request: WebhookRequest = serde_json::from_str(body)?;
    let query = request.query_result.ok_or(WebhookError::MissingQueryResult)?;
    let session_id = resolve_session(&query, request.session.as_deref());

    let display_name =
        query.intent.as_ref().map(|intent| intent.display_name.as_str()).unwrap_or_default();

    match resolve_intent(display_name) {
        Some(Intent::AddToOrder) => add_to_order(state, &query.parameters, &session_id).await,
        Some(Intent::RemoveFromOrder) => {
            remove_from_order(state, &query.parameters, &session_id).await
        }
        Some(Intent::CompleteOrder) => complete_order(state, &session_id).await,
        Some(Intent::TrackOrder) => track_order(state, &query.parameters).await,
        None => {
            info!(
                event_name = "webhook.intent.unhandled",
                intent = display_name,
                "intent not handled by webhook; returning help text"
            );
            Ok(messages::FALLBACK_HELP.to_string())
        }
    }
}

/// The session id comes from the first output context when any are present,
/// otherwise from the top-level session path. The empty string is a valid
/// (degenerate) session key, not an error.
fn resolve_session(query: &QueryResult, session: Option<&str>) -> String {
    match query.output_contexts.first() {
        Some(context) => extract_session_id(&context.name),
        None => extract_session_id(session.unwrap_or_default()),
    }
}

async fn add_to_order(
    state: &WebhookState,
    parameters: &Value,
    session_id: &str,
) -> Result<String, WebhookError> {
    let food_items = string_array(parameters, "food-item")?;
    let quantities = number_array(parameters, "number")?;

    let items = match line_items_from_params(&food_items, &quantities) {
        Ok(items) => items,
        Err(error) => {
            warn!(
                event_name = "webhook.order.add_rejected",
                session_id,
                error = %error,
                "add turn failed validation; no mutation"
            );
            return Ok(error.fulfillment_text().to_string());
        }
    };

    let order = state.sessions.merge_items(session_id, items).await;
    info!(
        event_name = "webhook.order.items_added",
        session_id,
        item_count = order.len(),
        "merged turn items into in-progress order"
    );

    Ok(messages::order_so_far(&order.render()))
}

async fn remove_from_order(
    state: &WebhookState,
    parameters: &Value,
    session_id: &str,
) -> Result<String, WebhookError> {
    let food_items = string_array(parameters, "food-item")?;

    let Some((order, outcome)) = state.sessions.remove_items(session_id, &food_items).await else {
        let error = OrderError::SessionNotFound { session_id: session_id.to_string() };
        return Ok(error.fulfillment_text().to_string());
    };

    // An empty removal request falls through both fragments and simply
    // reports the current order contents.
    let mut fulfillment_text = String::new();
    if !outcome.removed.is_empty() {
        fulfillment_text.push_str(&messages::removed_items(&outcome.removed));
    }
    if !outcome.missing.is_empty() {
        fulfillment_text.push_str(&messages::no_such_items(&outcome.missing));
    }

    if order.is_empty() {
        fulfillment_text.push_str(messages::ORDER_EMPTY_SUFFIX);
    } else {
        fulfillment_text.push_str(&messages::order_remaining(&order.render()));
    }

    Ok(fulfillment_text)
}

/// The complete-order transition. Completion is terminal for the session:
/// the entry leaves the table before the store is touched, so a failed commit
/// discards the in-memory order rather than retrying it.
async fn complete_order(state: &WebhookState, session_id: &str) -> Result<String, WebhookError> {
    let Some(order) = state.sessions.take(session_id).await else {
        let error = OrderError::SessionNotFound { session_id: session_id.to_string() };
        return Ok(error.fulfillment_text().to_string());
    };

    match commit_order(state.store.as_ref(), &order).await {
        Ok(order_id) => {
            let total = state.store.total_order_price(order_id).await?;
            info!(
                event_name = "webhook.order.committed",
                session_id,
                order_id,
                total = %total,
                "order committed"
            );
            Ok(messages::order_placed(order_id, total))
        }
        Err(error) => {
            error!(
                event_name = "webhook.order.commit_failed",
                session_id,
                error = %error,
                "order commit aborted; session discarded"
            );
            Ok(OrderError::StoreWrite(error.to_string()).fulfillment_text().to_string())
        }
    }
}

/// Write every line item under a freshly allocated order id, then the
/// tracking record. Any item failure aborts the whole commit before the
/// tracking record is written; already-written items are not rolled back.
async fn commit_order(store: &dyn OrderStore, order: &OrderAggregate) -> Result<i64, StoreError> {
    let order_id = store.next_order_id().await?;

    for (item, quantity) in order.iter() {
        store.insert_order_item(item, quantity, order_id).await?;
    }

    store.insert_order_tracking(order_id, "in progress").await?;
    Ok(order_id)
}

async fn track_order(state: &WebhookState, parameters: &Value) -> Result<String, WebhookError> {
    let order_id = order_id_param(parameters)?;

    match state.store.order_status(order_id).await? {
        Some(status) => Ok(messages::order_status(order_id, &status)),
        None => Ok(messages::order_status_not_found(order_id)),
    }
}

fn string_array(parameters: &Value, key: &'static str) -> Result<Vec<String>, WebhookError> {
    let values =
        parameters.get(key).and_then(Value::as_array).ok_or(WebhookError::Parameter(key))?;

    values
        .iter()
        .map(|value| {
            value.as_str().map(ToString::to_string).ok_or(WebhookError::Parameter(key))
        })
        .collect()
}

fn number_array(parameters: &Value, key: &'static str) -> Result<Vec<f64>, WebhookError> {
    let values =
        parameters.get(key).and_then(Value::as_array).ok_or(WebhookError::Parameter(key))?;

    values.iter().map(|value| value.as_f64().ok_or(WebhookError::Parameter(key))).collect()
}

/// The platform sends the tracked order id as a JSON number (float) or a
/// numeric string depending on the entity configuration.
fn order_id_param(parameters: &Value) -> Result<i64, WebhookError> {
    let value = parameters.get("order_id").ok_or(WebhookError::Parameter("order_id"))?;

    match value {
        Value::Number(_) => {
            value.as_f64().map(|id| id as i64).ok_or(WebhookError::Parameter("order_id"))
        }
        Value::String(raw) => {
            raw.trim().parse::<f64>().map(|id| id as i64).map_err(|_| {
                WebhookError::Parameter("order_id")
            })
        }
        _ => Err(WebhookError::Parameter("order_id")),
    }
}
