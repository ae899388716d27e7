//! Checkout intent.

use serde::{Deserialize, Serialize};

/// What the customer set out to do when the checkout was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutIntent {
    /// Buying something new.
    Purchase,

    /// Changing an existing subscription.
    Upgrade,
}

impl CheckoutIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutIntent::Purchase => "purchase",
            CheckoutIntent::Upgrade => "upgrade",
        }
    }
}

impl std::fmt::Display for CheckoutIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CheckoutIntent::Upgrade).unwrap(),
            "\"upgrade\""
        );
        let intent: CheckoutIntent = serde_json::from_str("\"purchase\"").unwrap();
        assert_eq!(intent, CheckoutIntent::Purchase);
    }
}
