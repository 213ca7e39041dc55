use serde::{Deserialize, Serialize};

/// Notification audiences; each maps to one message-handle column on orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Customer,
    Kitchen,
    Courier,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Customer => "customer",
            Channel::Kitchen => "kitchen",
            Channel::Courier => "courier",
        }
    }
}
