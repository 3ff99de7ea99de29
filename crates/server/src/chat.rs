//! Plain-text chat placeholder endpoint.
//!
//! The static frontend posts `{message, session_id}` here and renders the
//! `{reply}` it gets back. Full NLP means wiring a Dialogflow detect-intent
//! call into this handler; until then it answers with a canned reply.

use axum::{routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use spicebite_core::messages;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub fn router() -> Router {
    Router::new().route("/chat", post(chat))
}

async fn chat(body: String) -> Json<ChatResponse> {
    let reply = match serde_json::from_str::<Value>(&body) {
        Ok(payload) => {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            if message.is_empty() {
                messages::CHAT_EMPTY_MESSAGE.to_string()
            } else {
                debug!(
                    event_name = "chat.message.received",
                    session_id =
                        payload.get("session_id").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    "chat message received; returning placeholder reply"
                );
                messages::CHAT_PLACEHOLDER_REPLY.to_string()
            }
        }
        Err(_) => messages::CHAT_APOLOGY.to_string(),
    };

    Json(ChatResponse { reply })
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use spicebite_core::messages;
    use tower::ServiceExt;

    use super::router;

    async fn post_chat(body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body))
            .expect("request builds");

        let response = router().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body collects").to_bytes();
        (status, serde_json::from_slice(&bytes).expect("body is JSON"))
    }

    #[tokio::test]
    async fn empty_or_missing_message_asks_the_user_to_type() {
        let (status, reply) = post_chat(json!({ "message": "  " }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["reply"], messages::CHAT_EMPTY_MESSAGE);

        let (_, reply) = post_chat(json!({ "session_id": "s-1" }).to_string()).await;
        assert_eq!(reply["reply"], messages::CHAT_EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn non_empty_message_gets_the_placeholder_reply() {
        let (_, reply) =
            post_chat(json!({ "message": "I want 2 Pav Bhaji" }).to_string()).await;
        assert_eq!(reply["reply"], messages::CHAT_PLACEHOLDER_REPLY);
    }

    #[tokio::test]
    async fn invalid_json_gets_the_chat_apology() {
        let (status, reply) = post_chat("{{nope".to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["reply"], messages::CHAT_APOLOGY);
    }
}
