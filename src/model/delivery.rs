//! Delivery and gift selections made during checkout.

use serde::{Deserialize, Serialize};

/// Upper bound on the free-text delivery instructions.
pub const SPECIAL_INSTRUCTIONS_MAX: usize = 500;

/// Upper bound on the gift card message.
pub const GIFT_MESSAGE_MAX: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySpeed {
    #[default]
    Standard,
    Express,
}

/// A gift design chosen for the order, with its flat price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftSelection {
    pub gift_id: String,
    pub gift_name: String,
    pub gift_price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryOptions {
    #[serde(default)]
    pub speed: DeliverySpeed,
    #[serde(default)]
    pub special_instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift: Option<GiftSelection>,
    #[serde(default)]
    pub gift_message: String,
}

impl DeliveryOptions {
    /// Truncates the free-text fields to their bounded lengths, on char
    /// boundaries.
    pub fn sanitized(mut self) -> Self {
        truncate_chars(&mut self.special_instructions, SPECIAL_INSTRUCTIONS_MAX);
        truncate_chars(&mut self.gift_message, GIFT_MESSAGE_MAX);
        self
    }
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_truncates_long_texts() {
        let options = DeliveryOptions {
            special_instructions: "x".repeat(SPECIAL_INSTRUCTIONS_MAX + 40),
            gift_message: "y".repeat(GIFT_MESSAGE_MAX + 1),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(options.special_instructions.chars().count(), SPECIAL_INSTRUCTIONS_MAX);
        assert_eq!(options.gift_message.chars().count(), GIFT_MESSAGE_MAX);
    }

    #[test]
    fn sanitized_keeps_short_texts() {
        let options = DeliveryOptions {
            special_instructions: "leave at the door".to_string(),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(options.special_instructions, "leave at the door");
    }

    #[test]
    fn default_speed_is_standard() {
        assert_eq!(DeliveryOptions::default().speed, DeliverySpeed::Standard);
    }
}
