use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::RwLock;

use crate::order::{OrderAggregate, RemovalOutcome};

fn context_session_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/sessions/(.*?)/contexts/").expect("context session pattern is valid")
    })
}

fn bare_session_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/sessions/(.+)$").expect("bare session pattern is valid"))
}

/// Pull the session id out of a Dialogflow-style resource path.
///
/// Two ordered attempts: the output-context form
/// `.../sessions/<ID>/contexts/...` first, then the bare session form
/// `.../sessions/<ID>`. The empty string is the "no session" sentinel when
/// neither form matches or the input is empty.
pub fn extract_session_id(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    for pattern in [context_session_pattern(), bare_session_pattern()] {
        if let Some(captures) = pattern.captures(path) {
            if let Some(id) = captures.get(1) {
                return id.as_str().to_string();
            }
        }
    }

    String::new()
}

/// Process-wide map of session id to in-progress order.
///
/// The sole mutable shared state of the service. Injected into the request
/// handlers rather than held as a global so tests can construct isolated
/// instances. Each turn's read-modify-write runs under a single write guard,
/// so concurrent turns against the same session are serialized. Entries live
/// until the session's order completes (successfully or not); nothing here
/// survives a process restart.
#[derive(Debug, Default)]
pub struct SessionTable {
    orders: RwLock<HashMap<String, OrderAggregate>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a validated turn's items into the session's order, creating the
    /// order on first add. Returns a snapshot of the order after the merge.
    pub async fn merge_items(
        &self,
        session_id: &str,
        items: Vec<(String, u32)>,
    ) -> OrderAggregate {
        let mut orders = self.orders.write().await;
        let order = orders.entry(session_id.to_string()).or_default();
        order.merge(items);
        order.clone()
    }

    /// Remove named items from the session's order, if one exists. Returns the
    /// post-removal snapshot and the removed/missing partition; `None` when
    /// the session has no order in progress. The entry stays in the table even
    /// when the order ends up empty.
    pub async fn remove_items(
        &self,
        session_id: &str,
        names: &[String],
    ) -> Option<(OrderAggregate, RemovalOutcome)> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(session_id)?;
        let outcome = order.remove_items(names);
        Some((order.clone(), outcome))
    }

    /// Take the session's order out of the table for completion. Completion is
    /// terminal for the session whether the commit later succeeds or fails, so
    /// the entry is removed here, up front.
    pub async fn take(&self, session_id: &str) -> Option<OrderAggregate> {
        self.orders.write().await.remove(session_id)
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<OrderAggregate> {
        self.orders.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_session_id, SessionTable};

    #[test]
    fn extracts_session_id_from_output_context_path() {
        let path = "projects/food-bot/agent/sessions/abc-123/contexts/ongoing-order";
        assert_eq!(extract_session_id(path), "abc-123");
    }

    #[test]
    fn extracts_session_id_from_bare_session_path() {
        let path = "projects/food-bot/agent/sessions/abc-123";
        assert_eq!(extract_session_id(path), "abc-123");
    }

    #[test]
    fn context_form_wins_over_bare_suffix_match() {
        // The context pattern is non-greedy; only the id segment is captured.
        let path = "projects/p/agent/sessions/s-1/contexts/ongoing-tracking";
        assert_eq!(extract_session_id(path), "s-1");
    }

    #[test]
    fn unmatched_or_empty_input_yields_the_empty_sentinel() {
        assert_eq!(extract_session_id(""), "");
        assert_eq!(extract_session_id("projects/p/agent/queries/q-1"), "");
    }

    #[tokio::test]
    async fn first_add_creates_the_session_entry() {
        let table = SessionTable::new();
        assert!(table.is_empty().await);

        let order = table.merge_items("s-1", vec![("pizza".to_string(), 2)]).await;

        assert_eq!(order.render(), "2 pizza");
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn remove_on_unknown_session_leaves_the_table_unchanged() {
        let table = SessionTable::new();
        assert!(table.remove_items("missing", &["pizza".to_string()]).await.is_none());
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn take_removes_the_entry_exactly_once() {
        let table = SessionTable::new();
        table.merge_items("s-1", vec![("pizza".to_string(), 2)]).await;

        assert!(table.take("s-1").await.is_some());
        assert!(table.take("s-1").await.is_none());
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn removal_only_turns_keep_the_entry_even_when_empty() {
        let table = SessionTable::new();
        table.merge_items("s-1", vec![("pizza".to_string(), 2)]).await;

        let (order, outcome) = table
            .remove_items("s-1", &["pizza".to_string()])
            .await
            .expect("session exists");

        assert!(order.is_empty());
        assert_eq!(outcome.removed, vec!["pizza".to_string()]);
        assert_eq!(table.len().await, 1);
    }
}
