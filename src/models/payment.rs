use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<PaymentMethod> {
        match value {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }

    /// Customer-facing label
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Naqd",
            PaymentMethod::Card => "Karta",
            PaymentMethod::Online => "Online to'lov",
        }
    }
}
