//! Conversational flow for the customer bot.
//!
//! Every inbound event is resolved against the chat's [`CartSession`] and
//! turned into a list of outbound replies. The flow never talks to Telegram
//! itself; operator notifications ride on the lifecycle/notifier path and
//! customer replies are returned to the caller for delivery.
//!
//! Admission is checked twice: when the customer presses checkout, and
//! again inside [`CheckoutService`] at the final confirmation. The second
//! check is the binding one.

use std::sync::Arc;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::callback::CallbackAction;
use crate::models::event::{CartAdjust, InboundEvent, Reply};
use crate::models::keyboard::{InlineButton, ReplyButton, ReplyKeyboard, ReplyMarkup};
use crate::models::order::{CreateOrderRequest, DenialReason, GeoPoint, RequestedLine};
use crate::models::payment::PaymentMethod;
use crate::models::status::OrderStatus;
use crate::services::cart::{Awaiting, CartSession, ContactInfo, DeliveryPlan, SessionRegistry};
use crate::services::catalog::CatalogService;
use crate::services::checkout::{CheckoutError, CheckoutService};
use crate::services::lifecycle::{LifecycleError, OrderLifecycle};
use crate::services::pricing::{self, DeliveryQuote, DeliveryTariff};
use crate::services::render::format_amount;
use crate::services::service_window::{ServiceWindow, ServiceWindowError};
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("service window is misconfigured: {0}")]
    Window(#[from] ServiceWindowError),
}

pub struct BotFlow {
    store: Arc<dyn OrderStore>,
    catalog: CatalogService,
    checkout: CheckoutService,
    lifecycle: Arc<OrderLifecycle>,
    sessions: SessionRegistry,
    kitchen_chat_id: i64,
    store_location: GeoPoint,
}

impl BotFlow {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: CatalogService,
        checkout: CheckoutService,
        lifecycle: Arc<OrderLifecycle>,
        kitchen_chat_id: i64,
        store_location: GeoPoint,
    ) -> BotFlow {
        BotFlow {
            store,
            catalog,
            checkout,
            lifecycle,
            sessions: SessionRegistry::new(),
            kitchen_chat_id,
            store_location,
        }
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<Reply>, FlowError> {
        self.handle_at(event, chrono::Local::now().time()).await
    }

    /// Same as [`handle`](Self::handle) with the wall clock pinned.
    pub async fn handle_at(
        &self,
        event: InboundEvent,
        at: NaiveTime,
    ) -> Result<Vec<Reply>, FlowError> {
        match event {
            InboundEvent::Start {
                chat_id,
                first_name,
            } => Ok(self.on_start(chat_id, first_name)),
            InboundEvent::ContactShared {
                chat_id,
                full_name,
                phone_number,
            } => Ok(self.on_contact(chat_id, full_name, phone_number)),
            InboundEvent::LocationShared { chat_id, location } => {
                self.on_location(chat_id, location).await
            }
            InboundEvent::TextEntered { chat_id, text } => Ok(self.on_text(chat_id, text)),
            InboundEvent::AddToCart {
                chat_id,
                product,
                quantity,
            } => self.on_add_to_cart(chat_id, product, quantity, at).await,
            InboundEvent::AdjustCartLine {
                chat_id,
                product,
                adjust,
            } => self.on_adjust(chat_id, product, adjust).await,
            InboundEvent::ClearCart { chat_id } => Ok(self.on_clear_cart(chat_id)),
            InboundEvent::Checkout { chat_id } => self.on_checkout(chat_id, at).await,
            InboundEvent::FeedbackRequested { chat_id } => {
                Ok(self.on_feedback_requested(chat_id))
            }
            InboundEvent::Callback {
                chat_id,
                action,
                actor,
            } => self.on_callback(chat_id, action, actor, at).await,
        }
    }

    fn on_start(&self, chat_id: i64, first_name: Option<String>) -> Vec<Reply> {
        let known = self.sessions.with_session(chat_id, |session| {
            if session.contact.is_some() {
                true
            } else {
                session.awaiting = Awaiting::InitialContact;
                false
            }
        });
        let salutation = match &first_name {
            Some(name) => format!("🎉 Ассалому алайкум, {}!", name),
            None => "🎉 Ассалому алайкум!".to_string(),
        };
        if known {
            vec![Reply::text(
                chat_id,
                format!("{}\n\n🍽 Нима буюртма қилмоқчисиз?", salutation),
            )]
        } else {
            vec![Reply::with_markup(
                chat_id,
                format!(
                    "{}\n\n🍽 Dilkash kafesiga хуш келибсиз!\n📱 Буюртма бериш учун телефон рақамингизни улашинг:",
                    salutation
                ),
                ReplyMarkup::request_contact("📱 Контактни улашиш"),
            )]
        }
    }

    fn on_contact(&self, chat_id: i64, full_name: String, phone_number: String) -> Vec<Reply> {
        let mode = self.sessions.with_session(chat_id, |session| {
            session.contact = Some(ContactInfo {
                full_name: full_name.clone(),
                phone_number: phone_number.clone(),
            });
            let mode = session.awaiting;
            session.awaiting = match mode {
                Awaiting::CheckoutContact => Awaiting::Location,
                _ => Awaiting::Nothing,
            };
            mode
        });

        let mut replies = vec![Reply::with_markup(
            chat_id,
            "✅ Раҳмат!",
            ReplyMarkup::remove(),
        )];
        match mode {
            Awaiting::CheckoutContact => replies.push(Reply::with_markup(
                chat_id,
                "📞 Контакт қабул қилинди! Энди локациянгизни юборинг:",
                ReplyMarkup::request_location("📍 Локацияни улашиш"),
            )),
            Awaiting::InitialContact => replies.push(Reply::text(
                chat_id,
                "🎉 Энди буюртма беришингиз мумкин:",
            )),
            _ => {}
        }
        replies
    }

    async fn on_location(
        &self,
        chat_id: i64,
        point: GeoPoint,
    ) -> Result<Vec<Reply>, FlowError> {
        let awaiting = self.sessions.with_session(chat_id, |session| session.awaiting);
        // Unsolicited pins mean nothing to the flow
        if awaiting != Awaiting::Location {
            return Ok(Vec::new());
        }

        let settings = self.store.load_settings().await?;
        let tariff = DeliveryTariff::from_settings(&settings);
        match pricing::assess(&tariff, self.store_location, point) {
            DeliveryQuote::OutOfRange { max_radius_km, .. } => {
                self.sessions.with_session(chat_id, |session| {
                    session.awaiting = Awaiting::Nothing;
                });
                Ok(vec![
                    Reply::with_markup(
                        chat_id,
                        format!(
                            "😔 Узр, сизнинг манзилингиз бизнинг {} км радиусимиздан ташқарида.\n🚫 Шу сабаб етказиб бериш хизмати мавжуд эмас.\n📋 Аммо менудан маҳсулотларни кўришингиз мумкин.",
                            max_radius_km
                        ),
                        ReplyMarkup::remove(),
                    ),
                    Reply::text(chat_id, "🍽 Меню:"),
                ])
            }
            DeliveryQuote::Feasible { distance_km, cost } => {
                self.sessions.with_session(chat_id, |session| {
                    session.delivery = Some(DeliveryPlan {
                        location: point,
                        distance_km,
                        cost,
                    });
                    session.awaiting = Awaiting::Address;
                });
                Ok(vec![Reply::with_markup(
                    chat_id,
                    format!(
                        "📍 Локация қабул қилинди!\n📏 Масофа: таҳминан {:.1} км\n💰 Етказиб бериш нархи: {} сўм\n\n🏠 Агар қўшимча манзил киритмоқчи бўлсангиз, ёзинг.\n❌ Керак бўлмаса, \"Бекор қилиш\" деб ёзинг.",
                        distance_km,
                        format_amount(cost)
                    ),
                    ReplyMarkup::Reply(ReplyKeyboard {
                        keyboard: vec![vec![ReplyButton {
                            text: "❌ Бекор қилиш".to_string(),
                            request_contact: None,
                            request_location: None,
                        }]],
                        resize_keyboard: true,
                        one_time_keyboard: false,
                    }),
                )])
            }
        }
    }

    fn on_text(&self, chat_id: i64, text: String) -> Vec<Reply> {
        let awaiting = self.sessions.with_session(chat_id, |session| session.awaiting);
        match awaiting {
            Awaiting::Address => self.on_address(chat_id, &text),
            Awaiting::Feedback => self.on_feedback_text(chat_id, &text),
            _ => vec![Reply::text(chat_id, "📨 Хабарингиз қабул қилинди.")],
        }
    }

    fn on_address(&self, chat_id: i64, text: &str) -> Vec<Reply> {
        let trimmed = text.trim();
        let normalized = trimmed.to_lowercase();
        let skipped = trimmed.is_empty()
            || normalized == "бекор қилиш"
            || normalized == "❌ бекор қилиш";
        let address = if skipped {
            None
        } else {
            Some(trimmed.to_string())
        };
        self.sessions.with_session(chat_id, |session| {
            session.address = address.clone();
            if session.payment_method.is_none() {
                session.payment_method = Some(PaymentMethod::Cash);
            }
            session.awaiting = Awaiting::Nothing;
        });
        vec![
            Reply::with_markup(chat_id, "🏠 Манзил қабул қилинди.", ReplyMarkup::remove()),
            Reply::with_markup(
                chat_id,
                "💳 Тўлов усули: Нақд\n🔸 Буюртмани тасдиқлаш учун \"✅ Тасдиқлаш\" босинг:",
                ReplyMarkup::inline(vec![
                    vec![InlineButton::new("✅ Тасдиқлаш", CallbackAction::FinalConfirm)],
                    vec![InlineButton::new("❌ Бекор қилиш", CallbackAction::CancelOrder)],
                ]),
            ),
        ]
    }

    fn on_feedback_text(&self, chat_id: i64, text: &str) -> Vec<Reply> {
        self.sessions
            .with_session(chat_id, |session| session.awaiting = Awaiting::Nothing);
        let trimmed = text.trim();
        if trimmed == "/cancel" {
            return vec![Reply::text(chat_id, "🍽 Нима буюртма қилмоқчисиз?")];
        }
        let contact = self
            .sessions
            .with_session(chat_id, |session| session.contact.clone());
        let (full_name, phone_number) = contact
            .map(|c| (c.full_name, c.phone_number))
            .unwrap_or_else(|| ("Номаълум".to_string(), "Номаълум".to_string()));
        vec![
            Reply::text(
                self.kitchen_chat_id,
                format!(
                    "💬 **Янги фикр келиб тушди!**\n\n👨‍💼 Муаллиф: {}\n📱 Тел: {}\n🆔 User ID: {}\n\n📝 **Фикр матни:**\n{}",
                    full_name, phone_number, chat_id, trimmed
                ),
            ),
            Reply::text(
                chat_id,
                "✅ Фикрингиз учун раҳмат! Тез орада кўриб чиқамиз.",
            ),
        ]
    }

    async fn on_add_to_cart(
        &self,
        chat_id: i64,
        product: String,
        quantity: u32,
        at: NaiveTime,
    ) -> Result<Vec<Reply>, FlowError> {
        let settings = self.store.load_settings().await?;
        let window = ServiceWindow::from_settings(&settings)?;
        if !window.contains(at) {
            return Ok(vec![Reply::text(
                chat_id,
                format!(
                    "❌ Ҳозирда буюртмалар қабул қилинмайди. Илтимос, иш вақтларида ҳаракат қилинг: соат {} дан {} гача.",
                    window.start().format("%H:%M"),
                    window.end().format("%H:%M")
                ),
            )]);
        }
        let Some(found) = self.catalog.find_available(&product).await? else {
            return Ok(vec![Reply::text(chat_id, "❌ Бу маҳсулот топилмади.")]);
        };
        let quantity = quantity.max(1);
        self.sessions
            .with_session(chat_id, |session| session.add_item(&found.name, quantity));
        Ok(vec![Reply::text(
            chat_id,
            format!("✅ **{}** саватга {} дона қўшилди!", found.name, quantity),
        )])
    }

    async fn on_adjust(
        &self,
        chat_id: i64,
        product: String,
        adjust: CartAdjust,
    ) -> Result<Vec<Reply>, FlowError> {
        let session = self.sessions.with_session(chat_id, |session| {
            session.adjust_item(&product, adjust);
            session.clone()
        });
        let summary = self.cart_summary(&session).await?;
        Ok(vec![Reply::text(chat_id, summary)])
    }

    fn on_clear_cart(&self, chat_id: i64) -> Vec<Reply> {
        self.sessions
            .with_session(chat_id, |session| session.items.clear());
        vec![Reply::text(chat_id, "🗑 Савтингиз бўшатилди.")]
    }

    /// First admission gate, run when the customer presses checkout.
    /// Checks run in cart, minimum, window, identity, location order.
    async fn on_checkout(&self, chat_id: i64, at: NaiveTime) -> Result<Vec<Reply>, FlowError> {
        let session = self.sessions.snapshot(chat_id);
        if session.cart_is_empty() {
            return Ok(vec![Reply::text(chat_id, "🛒 Савтингиз бўш!")]);
        }

        let mut subtotal = Decimal::ZERO;
        for (name, quantity) in &session.items {
            if let Some(product) = self.catalog.find_available(name).await? {
                subtotal += product.price * Decimal::from(*quantity);
            }
        }

        let settings = self.store.load_settings().await?;
        if subtotal < settings.min_order_value {
            return Ok(vec![Reply::text(
                chat_id,
                format!(
                    "❌ Минимал буюртма қиймати {} сўм бўлиши керак.\nҲозирги сумма: {} сўм\nҚўшимча: {} сўм керак.",
                    format_amount(settings.min_order_value),
                    format_amount(subtotal),
                    format_amount(settings.min_order_value - subtotal)
                ),
            )]);
        }

        let window = ServiceWindow::from_settings(&settings)?;
        if !window.contains(at) {
            return Ok(vec![window_closed_reply(chat_id, &window)]);
        }

        if session.contact.is_none() {
            self.sessions
                .with_session(chat_id, |session| session.awaiting = Awaiting::CheckoutContact);
            return Ok(vec![contact_request_reply(chat_id)]);
        }

        self.sessions
            .with_session(chat_id, |session| session.awaiting = Awaiting::Location);
        Ok(vec![location_request_reply(chat_id)])
    }

    fn on_feedback_requested(&self, chat_id: i64) -> Vec<Reply> {
        self.sessions
            .with_session(chat_id, |session| session.awaiting = Awaiting::Feedback);
        vec![Reply::text(
            chat_id,
            "✍️ Фикрингизни ёзинг. Бекор қилиш учун /cancel ни ёзинг.",
        )]
    }

    async fn on_callback(
        &self,
        chat_id: i64,
        action: CallbackAction,
        actor: Option<String>,
        at: NaiveTime,
    ) -> Result<Vec<Reply>, FlowError> {
        match action {
            CallbackAction::ChefConfirm(id) => {
                self.operator_transition(chat_id, id, OrderStatus::Confirmed, actor)
                    .await
            }
            CallbackAction::ChefReady(id) => {
                self.operator_transition(chat_id, id, OrderStatus::Ready, actor)
                    .await
            }
            CallbackAction::ChefCancel(id) | CallbackAction::CourierCancel(id) => {
                self.operator_transition(chat_id, id, OrderStatus::Cancelled, actor)
                    .await
            }
            CallbackAction::CourierOnWay(id) => {
                self.operator_transition(chat_id, id, OrderStatus::EnRoute, actor)
                    .await
            }
            CallbackAction::CourierDelivered(id) => {
                self.operator_transition(chat_id, id, OrderStatus::Delivered, actor)
                    .await
            }
            CallbackAction::MainMenu => {
                Ok(vec![Reply::text(chat_id, "🍽 Нима буюртма қилмоқчисиз?")])
            }
            CallbackAction::FinalConfirm => self.on_final_confirm(chat_id, at).await,
            CallbackAction::CancelOrder => Ok(self.on_cancel_draft(chat_id)),
        }
    }

    /// Status buttons in the kitchen and courier channels. A successful
    /// transition replies with nothing: the notifier rewrites the channel
    /// messages and that is the whole feedback loop.
    async fn operator_transition(
        &self,
        chat_id: i64,
        order_id: i32,
        target: OrderStatus,
        actor: Option<String>,
    ) -> Result<Vec<Reply>, FlowError> {
        match self
            .lifecycle
            .apply(
                order_id,
                target,
                actor,
                Some("Telegram bot orqali yangilandi".to_string()),
            )
            .await
        {
            Ok(_) => Ok(Vec::new()),
            Err(LifecycleError::InvalidTransition { from, to }) => Ok(vec![Reply::text(
                chat_id,
                format!(
                    "Ҳолат {} дан {} га ўзгартиришга рухсат берилмаган.",
                    from.as_str(),
                    to.as_str()
                ),
            )]),
            Err(LifecycleError::OrderNotFound(_)) => {
                Ok(vec![Reply::text(chat_id, "❌ Буюртма топилмади.")])
            }
            Err(LifecycleError::Store(StoreError::StatusConflict { current, .. })) => {
                Ok(vec![Reply::text(
                    chat_id,
                    format!("Ҳолат аллақачон ўзгарган: {}.", current.as_str()),
                )])
            }
            Err(LifecycleError::Store(err)) => Err(err.into()),
        }
    }

    async fn on_final_confirm(
        &self,
        chat_id: i64,
        at: NaiveTime,
    ) -> Result<Vec<Reply>, FlowError> {
        let session = self.sessions.snapshot(chat_id);
        let Some(contact) = session.contact.clone() else {
            self.sessions
                .with_session(chat_id, |session| session.awaiting = Awaiting::CheckoutContact);
            return Ok(vec![contact_request_reply(chat_id)]);
        };
        let Some(plan) = session.delivery.clone() else {
            self.sessions
                .with_session(chat_id, |session| session.awaiting = Awaiting::Location);
            return Ok(vec![location_request_reply(chat_id)]);
        };

        let request = CreateOrderRequest {
            chat_id,
            full_name: contact.full_name,
            phone_number: contact.phone_number,
            payment_method: session.payment_method.unwrap_or_default(),
            items: session
                .items
                .iter()
                .map(|(product, quantity)| RequestedLine {
                    product: product.clone(),
                    quantity: *quantity,
                })
                .collect(),
            location: Some(plan.location),
            delivery_address: session.address.clone(),
        };

        let placed = self.checkout.place_order_at(request, Some(plan), at).await;
        // The draft is spent whatever the outcome; identity survives
        self.sessions
            .with_session(chat_id, |session| session.clear_draft());

        match placed {
            Ok(order) => Ok(vec![Reply::text(
                chat_id,
                format!("✅ Буюртмангиз #{} қабул қилинди!", order.order_number),
            )]),
            Err(CheckoutError::Denied(reason)) => {
                Ok(vec![self.denial_reply(chat_id, reason).await?])
            }
            Err(CheckoutError::MissingProduct(name)) => Ok(vec![Reply::text(
                chat_id,
                format!(
                    "❌ Буюртма юборишда хато: '{}' маҳсулоти топилмади.",
                    name
                ),
            )]),
            Err(CheckoutError::Window(err)) => Err(err.into()),
            Err(CheckoutError::Store(err)) => Err(err.into()),
        }
    }

    async fn denial_reply(
        &self,
        chat_id: i64,
        reason: DenialReason,
    ) -> Result<Reply, FlowError> {
        Ok(match reason {
            DenialReason::EmptyCart => Reply::text(chat_id, "🛒 Савтингиз бўш!"),
            DenialReason::BelowMinimum => {
                let settings = self.store.load_settings().await?;
                Reply::text(
                    chat_id,
                    format!(
                        "❌ Минимал буюртма қиймати {} сўм бўлиши керак.",
                        format_amount(settings.min_order_value)
                    ),
                )
            }
            DenialReason::OutsideServiceHours => {
                let settings = self.store.load_settings().await?;
                let window = ServiceWindow::from_settings(&settings)?;
                window_closed_reply(chat_id, &window)
            }
            DenialReason::OutsideDeliveryRadius => {
                let settings = self.store.load_settings().await?;
                Reply::text(
                    chat_id,
                    format!(
                        "😔 Узр, сизнинг ҳудудингизга етказиб бериш хизмати мавжуд эмас (максимал {} км).\n🍽 Меню орқали танишиб кўришингиз мумкин.",
                        settings.max_delivery_radius_km
                    ),
                )
            }
        })
    }

    fn on_cancel_draft(&self, chat_id: i64) -> Vec<Reply> {
        self.sessions
            .with_session(chat_id, |session| session.clear_draft());
        vec![Reply::text(chat_id, "❌ Буюртма бекор қилинди.")]
    }

    async fn cart_summary(&self, session: &CartSession) -> Result<String, StoreError> {
        if session.cart_is_empty() {
            return Ok("🛒 Савтингиз бўш!".to_string());
        }
        let mut text = String::from("🛒 Саватчада:\n");
        let mut total = Decimal::ZERO;
        for (name, quantity) in &session.items {
            let price = self
                .catalog
                .find_available(name)
                .await?
                .map(|product| product.price)
                .unwrap_or(Decimal::ZERO);
            let line_total = price * Decimal::from(*quantity);
            total += line_total;
            text.push_str(&format!(
                "• {} x {} - {} сўм\n",
                quantity,
                name,
                format_amount(line_total)
            ));
        }
        text.push_str(&format!("\n💰 Маҳсулотлар: {} сўм\n", format_amount(total)));
        match &session.delivery {
            Some(plan) => {
                text.push_str(&format!(
                    "🚚 Етказиб бериш: {} сўм\n",
                    format_amount(plan.cost)
                ));
                text.push_str(&format!(
                    "📊 Жами: {} сўм\n",
                    format_amount(total + plan.cost)
                ));
            }
            None => {
                text.push_str("📍 Етказиб бериш: Локация киритилмаган\n");
                text.push_str(&format!(
                    "📊 Жами (ҳозирча): {} сўм\n",
                    format_amount(total)
                ));
            }
        }
        Ok(text)
    }
}

fn contact_request_reply(chat_id: i64) -> Reply {
    Reply::with_markup(
        chat_id,
        "📱 Буюртма бериш учун аввал контактингизни улашинг!",
        ReplyMarkup::request_contact("📱 Контактни улашиш"),
    )
}

fn location_request_reply(chat_id: i64) -> Reply {
    Reply::with_markup(
        chat_id,
        "📍 Локацияни юборинг:",
        ReplyMarkup::request_location("📍 Локацияни улашиш"),
    )
}

fn window_closed_reply(chat_id: i64, window: &ServiceWindow) -> Reply {
    Reply::text(
        chat_id,
        format!(
            "⏰ Узр, ҳозирда буюртмалар қабул қилмаймиз.\nБизнинг иш вақтимиз: {} дан {} гача.",
            window.start().format("%H:%M"),
            window.end().format("%H:%M")
        ),
    )
}
