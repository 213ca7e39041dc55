//! Chat keyboard shapes, serialized in the platform's `reply_markup` format.

use serde::{Deserialize, Serialize};

use crate::models::callback::CallbackAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboard),
    Reply(ReplyKeyboard),
    Remove(RemoveKeyboard),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: CallbackAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyKeyboard {
    pub keyboard: Vec<Vec<ReplyButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_location: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveKeyboard {
    pub remove_keyboard: bool,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, action: CallbackAction) -> InlineButton {
        InlineButton {
            text: text.into(),
            callback_data: action,
        }
    }
}

impl InlineKeyboard {
    pub fn rows(rows: Vec<Vec<InlineButton>>) -> InlineKeyboard {
        InlineKeyboard {
            inline_keyboard: rows,
        }
    }
}

impl ReplyMarkup {
    pub fn inline(rows: Vec<Vec<InlineButton>>) -> ReplyMarkup {
        ReplyMarkup::Inline(InlineKeyboard::rows(rows))
    }

    /// One-button reply keyboard asking the customer to share their contact
    pub fn request_contact(label: impl Into<String>) -> ReplyMarkup {
        ReplyMarkup::Reply(ReplyKeyboard {
            keyboard: vec![vec![ReplyButton {
                text: label.into(),
                request_contact: Some(true),
                request_location: None,
            }]],
            resize_keyboard: true,
            one_time_keyboard: true,
        })
    }

    /// One-button reply keyboard asking the customer to share a location
    pub fn request_location(label: impl Into<String>) -> ReplyMarkup {
        ReplyMarkup::Reply(ReplyKeyboard {
            keyboard: vec![vec![ReplyButton {
                text: label.into(),
                request_contact: None,
                request_location: Some(true),
            }]],
            resize_keyboard: true,
            one_time_keyboard: true,
        })
    }

    pub fn remove() -> ReplyMarkup {
        ReplyMarkup::Remove(RemoveKeyboard {
            remove_keyboard: true,
        })
    }

    /// An inline keyboard with no rows still serializes and, on edits, clears
    /// previously shown buttons. This tells the two cases apart.
    pub fn has_buttons(&self) -> bool {
        match self {
            ReplyMarkup::Inline(keyboard) => {
                keyboard.inline_keyboard.iter().any(|row| !row.is_empty())
            }
            ReplyMarkup::Reply(keyboard) => !keyboard.keyboard.is_empty(),
            ReplyMarkup::Remove(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_markup_serializes_in_platform_shape() {
        let markup = ReplyMarkup::inline(vec![vec![
            InlineButton::new("✅ Tasdiqlash", CallbackAction::ChefConfirm(42)),
            InlineButton::new("❌ Bekor qilish", CallbackAction::ChefCancel(42)),
        ]]);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json["inline_keyboard"][0][0]["callback_data"],
            "chef_confirm:42"
        );
        assert_eq!(json["inline_keyboard"][0][1]["text"], "❌ Bekor qilish");
    }

    #[test]
    fn contact_request_sets_the_request_flag() {
        let markup = ReplyMarkup::request_contact("📱 Kontaktni yuborish");
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["keyboard"][0][0]["request_contact"], true);
        assert!(json["keyboard"][0][0].get("request_location").is_none());
    }
}
