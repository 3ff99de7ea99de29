use crate::errors::OrderError;

/// One in-progress order: food item name mapped to an accumulated count.
///
/// Backed by a vector so that iteration (and therefore [`OrderAggregate::render`])
/// preserves the order in which items were first added across turns. Item names
/// are literal strings as received from the NLP platform; no normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderAggregate {
    items: Vec<(String, u32)>,
}

/// Result of removing a set of named items from an aggregate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub removed: Vec<String>,
    pub missing: Vec<String>,
}

impl OrderAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn quantity_of(&self, item: &str) -> Option<u32> {
        self.items.iter().find(|(name, _)| name == item).map(|(_, quantity)| *quantity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Merge a turn's items into the aggregate. A repeated item name replaces
    /// the stored quantity rather than adding to it; a new name is appended,
    /// keeping first-seen ordering for render.
    pub fn merge(&mut self, new_items: impl IntoIterator<Item = (String, u32)>) {
        for (name, quantity) in new_items {
            match self.items.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, existing_quantity)) => *existing_quantity = quantity,
                None => self.items.push((name, quantity)),
            }
        }
    }

    /// Remove every named item that is present and report the ones that are
    /// not. Partial removal is expected, not an error: every requested name is
    /// processed even when some are missing.
    pub fn remove_items(&mut self, names: &[String]) -> RemovalOutcome {
        let mut outcome = RemovalOutcome::default();
        for name in names {
            match self.items.iter().position(|(existing, _)| existing == name) {
                Some(index) => {
                    self.items.remove(index);
                    outcome.removed.push(name.clone());
                }
                None => outcome.missing.push(name.clone()),
            }
        }
        outcome
    }

    /// Human-readable "`<qty> <item>`" pairs, comma-joined in insertion order.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|(name, quantity)| format!("{quantity} {name}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Pair up the platform's parallel `food-item` / `number` parameter arrays
/// into line items for a single add turn.
///
/// The whole turn is rejected when the arrays differ in length or a quantity
/// is not a positive whole number; validation failures must not mutate any
/// session state, so callers only merge on `Ok`. Quantities arrive as JSON
/// numbers (floats) and are truncated to integer counts.
pub fn line_items_from_params(
    food_items: &[String],
    quantities: &[f64],
) -> Result<Vec<(String, u32)>, OrderError> {
    if food_items.len() != quantities.len() {
        return Err(OrderError::MismatchedQuantities {
            items: food_items.len(),
            quantities: quantities.len(),
        });
    }

    food_items
        .iter()
        .zip(quantities)
        .map(|(name, &quantity)| {
            if !quantity.is_finite() || quantity < 1.0 || quantity > u32::MAX as f64 {
                return Err(OrderError::InvalidQuantity { item: name.clone() });
            }
            Ok((name.clone(), quantity as u32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{line_items_from_params, OrderAggregate};
    use crate::errors::OrderError;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn merge_overwrites_quantity_for_repeated_item() {
        let mut order = OrderAggregate::new();
        order.merge([("pizza".to_string(), 1), ("samosa".to_string(), 4)]);
        order.merge([("pizza".to_string(), 3)]);

        assert_eq!(order.quantity_of("pizza"), Some(3));
        assert_eq!(order.quantity_of("samosa"), Some(4));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn merge_is_idempotent_per_key() {
        let mut once = OrderAggregate::new();
        once.merge([("burger".to_string(), 2)]);

        let mut twice = OrderAggregate::new();
        twice.merge([("burger".to_string(), 2)]);
        twice.merge([("burger".to_string(), 2)]);

        assert_eq!(once, twice);
    }

    #[test]
    fn render_preserves_first_seen_order() {
        let mut order = OrderAggregate::new();
        order.merge([("burger".to_string(), 2), ("pizza".to_string(), 1)]);
        order.merge([("burger".to_string(), 5), ("fries".to_string(), 3)]);

        assert_eq!(order.render(), "5 burger, 1 pizza, 3 fries");
    }

    #[test]
    fn remove_partitions_present_and_missing_items() {
        let mut order = OrderAggregate::new();
        order.merge([("pizza".to_string(), 1), ("lassi".to_string(), 2)]);

        let outcome = order.remove_items(&strings(&["pizza", "dosa"]));

        assert_eq!(outcome.removed, strings(&["pizza"]));
        assert_eq!(outcome.missing, strings(&["dosa"]));
        assert_eq!(order.render(), "2 lassi");
    }

    #[test]
    fn remove_with_empty_request_is_a_no_op() {
        let mut order = OrderAggregate::new();
        order.merge([("pizza".to_string(), 1)]);

        let outcome = order.remove_items(&[]);

        assert!(outcome.removed.is_empty());
        assert!(outcome.missing.is_empty());
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn mismatched_array_lengths_reject_the_turn() {
        let result = line_items_from_params(&strings(&["pizza", "samosa"]), &[2.0]);

        assert!(matches!(
            result,
            Err(OrderError::MismatchedQuantities { items: 2, quantities: 1 })
        ));
    }

    #[test]
    fn quantities_are_truncated_to_integer_counts() {
        let items = line_items_from_params(&strings(&["pizza"]), &[2.0]).expect("valid turn");
        assert_eq!(items, vec![("pizza".to_string(), 2)]);
    }

    #[test]
    fn non_positive_quantity_rejects_the_turn() {
        let result = line_items_from_params(&strings(&["pizza"]), &[0.0]);
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }
}
