//! Closed set of conversational events and the replies the flow produces.
//!
//! Platform updates are decoded into `InboundEvent` at the HTTP boundary;
//! nothing downstream ever sees raw update payloads.

use serde::{Deserialize, Serialize};

use crate::models::callback::CallbackAction;
use crate::models::keyboard::ReplyMarkup;
use crate::models::order::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// First contact, or an explicit restart
    Start {
        chat_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_name: Option<String>,
    },
    ContactShared {
        chat_id: i64,
        full_name: String,
        phone_number: String,
    },
    LocationShared {
        chat_id: i64,
        #[serde(flatten)]
        location: GeoPoint,
    },
    /// Free text; meaning depends on what the session is awaiting
    TextEntered { chat_id: i64, text: String },
    AddToCart {
        chat_id: i64,
        product: String,
        quantity: u32,
    },
    AdjustCartLine {
        chat_id: i64,
        product: String,
        adjust: CartAdjust,
    },
    ClearCart { chat_id: i64 },
    Checkout { chat_id: i64 },
    /// Customer asks to leave free-text feedback
    FeedbackRequested { chat_id: i64 },
    /// Inline-keyboard press, already decoded into a typed action
    Callback {
        chat_id: i64,
        action: CallbackAction,
        /// Actor label recorded on operator-driven transitions
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<String>,
    },
}

impl InboundEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            InboundEvent::Start { chat_id, .. }
            | InboundEvent::ContactShared { chat_id, .. }
            | InboundEvent::LocationShared { chat_id, .. }
            | InboundEvent::TextEntered { chat_id, .. }
            | InboundEvent::AddToCart { chat_id, .. }
            | InboundEvent::AdjustCartLine { chat_id, .. }
            | InboundEvent::ClearCart { chat_id }
            | InboundEvent::Checkout { chat_id }
            | InboundEvent::FeedbackRequested { chat_id }
            | InboundEvent::Callback { chat_id, .. } => *chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAdjust {
    Increment,
    Decrement,
}

/// One outgoing chat message produced while handling an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<ReplyMarkup>,
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Reply {
        Reply {
            chat_id,
            text: text.into(),
            markup: None,
        }
    }

    pub fn with_markup(chat_id: i64, text: impl Into<String>, markup: ReplyMarkup) -> Reply {
        Reply {
            chat_id,
            text: text.into(),
            markup: Some(markup),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub replies: Vec<Reply>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_decode_from_tagged_json() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"add_to_cart","chat_id":77,"product":"Lag'mon","quantity":2}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::AddToCart {
                chat_id: 77,
                product: "Lag'mon".to_string(),
                quantity: 2,
            }
        );
    }

    #[test]
    fn callback_events_decode_the_wire_verb() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"callback","chat_id":5,"action":"courier_delivered:42","actor":"courier"}"#,
        )
        .unwrap();
        match event {
            InboundEvent::Callback { action, actor, .. } => {
                assert_eq!(action, CallbackAction::CourierDelivered(42));
                assert_eq!(actor.as_deref(), Some("courier"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_are_rejected() {
        let result: Result<InboundEvent, _> =
            serde_json::from_str(r#"{"type":"broadcast","chat_id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn location_coordinates_flatten_into_the_event() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"location_shared","chat_id":9,"latitude":40.7,"longitude":72.5}"#,
        )
        .unwrap();
        match event {
            InboundEvent::LocationShared { location, .. } => {
                assert_eq!(location.latitude, 40.7);
                assert_eq!(location.longitude, 72.5);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
