//! Order lifecycle statuses and the transition rules between them.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order. Forward chain is
/// `New -> Confirmed -> Ready -> EnRoute -> Delivered`; `Cancelled` is
/// reachable from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Confirmed,
    Ready,
    EnRoute,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stable lowercase form used in the database and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Ready => "ready",
            OrderStatus::EnRoute => "en_route",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "new" => Some(OrderStatus::New),
            "confirmed" => Some(OrderStatus::Confirmed),
            "ready" => Some(OrderStatus::Ready),
            "en_route" => Some(OrderStatus::EnRoute),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Customer-facing label
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::New => "Yangi",
            OrderStatus::Confirmed => "Tasdiqlangan",
            OrderStatus::Ready => "Tayor",
            OrderStatus::EnRoute => "Yo'lda",
            OrderStatus::Delivered => "Yetkazildi",
            OrderStatus::Cancelled => "Bekor qilingan",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::New => "🆕",
            OrderStatus::Confirmed => "✅",
            OrderStatus::Ready => "🍽",
            OrderStatus::EnRoute => "🚚",
            OrderStatus::Delivered => "✅",
            OrderStatus::Cancelled => "❌",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether a transition from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if next == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (OrderStatus::New, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Ready)
                | (OrderStatus::Ready, OrderStatus::EnRoute)
                | (OrderStatus::EnRoute, OrderStatus::Delivered)
        )
    }
}
