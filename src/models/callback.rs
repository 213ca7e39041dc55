//! Typed inline-keyboard callback actions and their compact wire form.
//!
//! Buttons carry a `verb` or `verb:order_id` string (e.g. `chef_confirm:42`).
//! Decoding is strict: unknown verbs and malformed ids are rejected at the
//! boundary instead of leaking raw strings into the flow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CallbackAction {
    ChefConfirm(i32),
    ChefReady(i32),
    ChefCancel(i32),
    CourierOnWay(i32),
    CourierDelivered(i32),
    CourierCancel(i32),
    /// Customer's "back to main menu" button
    MainMenu,
    /// Customer's final order confirmation
    FinalConfirm,
    /// Customer abandons the draft
    CancelOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    #[error("unknown callback verb: {0}")]
    UnknownVerb(String),
    #[error("callback verb {0} requires an order id")]
    MissingId(String),
    #[error("invalid order id in callback: {0}")]
    InvalidId(String),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::ChefConfirm(id) => format!("chef_confirm:{}", id),
            CallbackAction::ChefReady(id) => format!("chef_ready:{}", id),
            CallbackAction::ChefCancel(id) => format!("chef_cancel:{}", id),
            CallbackAction::CourierOnWay(id) => format!("courier_on_way:{}", id),
            CallbackAction::CourierDelivered(id) => format!("courier_delivered:{}", id),
            CallbackAction::CourierCancel(id) => format!("courier_cancel:{}", id),
            CallbackAction::MainMenu => "main_menu".to_string(),
            CallbackAction::FinalConfirm => "final_confirm_order".to_string(),
            CallbackAction::CancelOrder => "cancel_order".to_string(),
        }
    }

    pub fn decode(data: &str) -> Result<CallbackAction, CallbackParseError> {
        let (verb, id) = match data.split_once(':') {
            Some((verb, id)) => (verb, Some(id)),
            None => (data, None),
        };

        let with_id = |make: fn(i32) -> CallbackAction| -> Result<CallbackAction, CallbackParseError> {
            let raw = id.ok_or_else(|| CallbackParseError::MissingId(verb.to_string()))?;
            let parsed = raw
                .parse::<i32>()
                .map_err(|_| CallbackParseError::InvalidId(raw.to_string()))?;
            Ok(make(parsed))
        };

        match verb {
            "chef_confirm" => with_id(CallbackAction::ChefConfirm),
            "chef_ready" => with_id(CallbackAction::ChefReady),
            "chef_cancel" => with_id(CallbackAction::ChefCancel),
            "courier_on_way" => with_id(CallbackAction::CourierOnWay),
            "courier_delivered" => with_id(CallbackAction::CourierDelivered),
            "courier_cancel" => with_id(CallbackAction::CourierCancel),
            "main_menu" => Ok(CallbackAction::MainMenu),
            "final_confirm_order" => Ok(CallbackAction::FinalConfirm),
            "cancel_order" => Ok(CallbackAction::CancelOrder),
            other => Err(CallbackParseError::UnknownVerb(other.to_string())),
        }
    }
}

impl TryFrom<String> for CallbackAction {
    type Error = CallbackParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CallbackAction::decode(&value)
    }
}

impl From<CallbackAction> for String {
    fn from(action: CallbackAction) -> String {
        action.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for action in [
            CallbackAction::ChefConfirm(42),
            CallbackAction::ChefReady(7),
            CallbackAction::ChefCancel(1),
            CallbackAction::CourierOnWay(42),
            CallbackAction::CourierDelivered(999),
            CallbackAction::CourierCancel(3),
            CallbackAction::MainMenu,
            CallbackAction::FinalConfirm,
            CallbackAction::CancelOrder,
        ] {
            assert_eq!(CallbackAction::decode(&action.encode()), Ok(action));
        }
    }

    #[test]
    fn wire_format_matches_the_operator_buttons() {
        assert_eq!(CallbackAction::ChefConfirm(42).encode(), "chef_confirm:42");
        assert_eq!(CallbackAction::CourierOnWay(5).encode(), "courier_on_way:5");
        assert_eq!(CallbackAction::MainMenu.encode(), "main_menu");
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        assert_eq!(
            CallbackAction::decode("promo_not_implemented"),
            Err(CallbackParseError::UnknownVerb(
                "promo_not_implemented".to_string()
            ))
        );
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(
            CallbackAction::decode("chef_confirm"),
            Err(CallbackParseError::MissingId("chef_confirm".to_string()))
        );
        assert_eq!(
            CallbackAction::decode("chef_confirm:abc"),
            Err(CallbackParseError::InvalidId("abc".to_string()))
        );
    }
}
