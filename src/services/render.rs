//! Order message rendering for the three notification channels.
//!
//! Every body shares the same skeleton: a channel header, the customer
//! identity block, the item list and the grand total. The customer rendering
//! additionally carries the maps link and a status line; operator renderings
//! carry action keyboards keyed off the current status instead.

use rust_decimal::Decimal;

use crate::entities::{customers, order_items, orders};
use crate::models::callback::CallbackAction;
use crate::models::keyboard::{InlineButton, ReplyMarkup};
use crate::models::payment::PaymentMethod;
use crate::models::status::OrderStatus;

/// Whole-sum amount with thousands separators, e.g. `15,000`
pub fn format_amount(amount: Decimal) -> String {
    let whole = amount.trunc().to_string();
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole.as_str()),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

fn identity_block(order: &orders::Model, customer: &customers::Model) -> String {
    let payment = PaymentMethod::parse(&order.payment_method)
        .map(|p| p.label())
        .unwrap_or(order.payment_method.as_str());
    let mut block = format!("👨‍💼 Ism: {}\n", customer.full_name);
    block.push_str(&format!("📱 Telefon: {}\n", customer.phone_number));
    block.push_str(&format!("💳 To'lov usuli: {}\n", payment));
    match &order.delivery_address {
        Some(address) => block.push_str(&format!("🏠 Manzil: {}\n", address)),
        None => block.push_str("📍 Manzil: Faqat lokatsiya\n"),
    }
    block
}

fn items_block(items: &[order_items::Model], total: Decimal) -> String {
    let mut block = String::from("\n🍽 **Mahsulotlar:**\n");
    for item in items {
        block.push_str(&format!(
            "• {} dona {} - {} so'm\n",
            item.quantity,
            item.product_name,
            format_amount(item.line_total())
        ));
    }
    block.push_str(&format!("\n💰 Jami: {} so'm", format_amount(total)));
    block
}

/// Customer rendering. The same body is used at creation and on every status
/// change; only the trailing status line moves.
pub fn customer_body(
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
    status: OrderStatus,
) -> String {
    let mut body = format!(
        "✅ **Buyurtmangiz qabul qilindi!**\n\n📋 Buyurtma ID: **{}**\n",
        order.order_number
    );
    body.push_str(&identity_block(order, customer));
    if let (Some(lat), Some(lon)) = (order.latitude, order.longitude) {
        body.push_str(&format!(
            "📍 Lokatsiya: https://www.google.com/maps?q={},{}\n",
            lat, lon
        ));
    }
    body.push_str(&items_block(items, order.total_price));
    body.push_str(&format!(
        "\n{} Status: **{}**",
        status.emoji(),
        status.label()
    ));
    body
}

fn operator_body(
    header: String,
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
) -> String {
    let mut body = header;
    body.push_str(&identity_block(order, customer));
    body.push_str(&items_block(items, order.total_price));
    body
}

/// First message the kitchen sees for an order
pub fn kitchen_creation_body(
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
) -> String {
    operator_body(
        format!("🍽 **Yangi buyurtma #{}**\n\n", order.order_number),
        order,
        items,
        customer,
    )
}

pub fn kitchen_update_body(
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
    status: OrderStatus,
) -> String {
    operator_body(
        format!(
            "{} **Buyurtma #{} holati o'zgardi: {}**\n\n",
            status.emoji(),
            order.order_number,
            status.label()
        ),
        order,
        items,
        customer,
    )
}

/// First message the courier sees, sent when the order becomes ready
pub fn courier_dispatch_body(
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
) -> String {
    operator_body(
        format!(
            "🚚 **Yetkazib berish uchun yangi buyurtma #{}**\n\n",
            order.order_number
        ),
        order,
        items,
        customer,
    )
}

pub fn courier_update_body(
    order: &orders::Model,
    items: &[order_items::Model],
    customer: &customers::Model,
    status: OrderStatus,
) -> String {
    kitchen_update_body(order, items, customer, status)
}

pub fn customer_keyboard() -> ReplyMarkup {
    ReplyMarkup::inline(vec![vec![InlineButton::new(
        "⬅️ Bosh menu",
        CallbackAction::MainMenu,
    )]])
}

/// Kitchen actions for the given status. Empty past the confirmed stage so
/// that edits clear stale buttons.
pub fn kitchen_keyboard(order_id: i32, status: OrderStatus) -> ReplyMarkup {
    let rows = match status {
        OrderStatus::New => vec![vec![
            InlineButton::new("✅ Tasdiqlash", CallbackAction::ChefConfirm(order_id)),
            InlineButton::new("❌ Bekor qilish", CallbackAction::ChefCancel(order_id)),
        ]],
        OrderStatus::Confirmed => vec![
            vec![InlineButton::new(
                "🍽 Tayor",
                CallbackAction::ChefReady(order_id),
            )],
            vec![InlineButton::new(
                "❌ Bekor qilish",
                CallbackAction::ChefCancel(order_id),
            )],
        ],
        _ => Vec::new(),
    };
    ReplyMarkup::inline(rows)
}

pub fn courier_keyboard(order_id: i32, status: OrderStatus) -> ReplyMarkup {
    let rows = match status {
        OrderStatus::Ready => vec![
            vec![InlineButton::new(
                "🚚 Yo'lda",
                CallbackAction::CourierOnWay(order_id),
            )],
            vec![InlineButton::new(
                "❌ Bekor qilish",
                CallbackAction::CourierCancel(order_id),
            )],
        ],
        OrderStatus::EnRoute => vec![
            vec![InlineButton::new(
                "✅ Yetkazildi",
                CallbackAction::CourierDelivered(order_id),
            )],
            vec![InlineButton::new(
                "❌ Bekor qilish",
                CallbackAction::CourierCancel(order_id),
            )],
        ],
        _ => Vec::new(),
    };
    ReplyMarkup::inline(rows)
}
