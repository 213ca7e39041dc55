//! Per-chat cart sessions.
//!
//! A session holds everything the conversational flow knows about one chat:
//! the customer identity, the cart, the single input mode the flow is waiting
//! on, and the delivery draft. Draft fields are cleared wholesale when an
//! order is submitted or abandoned; the identity survives across orders.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::models::event::CartAdjust;
use crate::models::order::GeoPoint;
use crate::models::payment::PaymentMethod;

/// What the flow is waiting for from this chat. The modes are mutually
/// exclusive; free text and shared contacts/locations mean nothing outside
/// the matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Awaiting {
    #[default]
    Nothing,
    /// Contact requested on first start
    InitialContact,
    /// Contact requested because checkout needs an identity
    CheckoutContact,
    Location,
    Address,
    Feedback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub full_name: String,
    pub phone_number: String,
}

/// A feasible delivery draft for the shared location
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPlan {
    pub location: GeoPoint,
    pub distance_km: f64,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct CartSession {
    pub contact: Option<ContactInfo>,
    /// product name -> quantity, deterministically ordered for rendering
    pub items: BTreeMap<String, u32>,
    pub awaiting: Awaiting,
    pub delivery: Option<DeliveryPlan>,
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl CartSession {
    pub fn add_item(&mut self, name: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.items.entry(name.to_string()).or_insert(0) += quantity;
    }

    pub fn adjust_item(&mut self, name: &str, adjust: CartAdjust) {
        let Some(quantity) = self.items.get_mut(name) else {
            return;
        };
        match adjust {
            CartAdjust::Increment => *quantity += 1,
            CartAdjust::Decrement => {
                *quantity -= 1;
                if *quantity == 0 {
                    self.items.remove(name);
                }
            }
        }
    }

    pub fn cart_is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop the cart and every delivery field, keep the identity
    pub fn clear_draft(&mut self) {
        self.items.clear();
        self.delivery = None;
        self.address = None;
        self.payment_method = None;
        self.awaiting = Awaiting::Nothing;
    }
}

/// All live sessions, keyed by chat id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, CartSession>>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    /// Run a closure against the chat's session, creating it on first touch
    pub fn with_session<T>(&self, chat_id: i64, f: impl FnOnce(&mut CartSession) -> T) -> T {
        let mut sessions = self.sessions.lock();
        f(sessions.entry(chat_id).or_default())
    }

    pub fn snapshot(&self, chat_id: i64) -> CartSession {
        self.sessions.lock().get(&chat_id).cloned().unwrap_or_default()
    }
}
