use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;

use crate::entities::{customers, order_items, order_status_history, orders};
use crate::models::order::{
    CreateOrderRequest, ErrorResponse, HistoryEntryResponse, OrderDetailsResponse,
    OrderItemResponse, OrderListResponse, OrderResponse, UpdateStatusRequest,
};
use crate::models::status::OrderStatus;
use crate::services::checkout::CheckoutError;
use crate::services::lifecycle::LifecycleError;
use crate::store::{self, StoreError};
use crate::AppState;

/// Handler for POST /api/orders
/// Panel-side order creation. Prices, distances and admission are decided
/// server-side; the payload only names products and quantities.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), (StatusCode, Json<ErrorResponse>)> {
    tracing::info!("Creating order for chat {}", payload.chat_id);

    match state.checkout.place_order(payload, None).await {
        Ok(order) => {
            let response = order_with_customer(&state, &order).await?;
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(CheckoutError::Denied(reason)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!("order admission denied: {}", reason),
            }),
        )),
        Err(err @ CheckoutError::MissingProduct(_)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to create order: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create order: {}", e),
                }),
            ))
        }
    }
}

/// Handler for POST /api/orders/{id}/status
/// Applies one lifecycle transition and returns the updated order.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), (StatusCode, Json<ErrorResponse>)> {
    tracing::info!(
        "Transitioning order {} to {}",
        order_id,
        payload.status.as_str()
    );

    match state
        .lifecycle
        .apply(order_id, payload.status, payload.actor, payload.note)
        .await
    {
        Ok(order) => {
            let response = order_with_customer(&state, &order).await?;
            Ok((StatusCode::OK, Json(response)))
        }
        Err(LifecycleError::OrderNotFound(id)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Order {} not found", id),
            }),
        )),
        Err(LifecycleError::InvalidTransition { from, to }) => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!(
                    "transition {} -> {} is not allowed",
                    from.as_str(),
                    to.as_str()
                ),
            }),
        )),
        Err(err @ LifecycleError::Store(StoreError::StatusConflict { .. })) => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to transition order {}: {}", order_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to update order status: {}", e),
                }),
            ))
        }
    }
}

/// Handler for GET /api/orders/{id}
/// Returns the order together with its item lines and audit history.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<(StatusCode, Json<OrderDetailsResponse>), (StatusCode, Json<ErrorResponse>)> {
    let order = match state.store.find_order(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Order {} not found", order_id),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Failed to load order {}: {}", order_id, e);
            return Err(database_error(e));
        }
    };

    let items = state
        .store
        .list_order_items(order_id)
        .await
        .map_err(database_error)?;
    let history = state
        .store
        .order_history(order_id)
        .await
        .map_err(database_error)?;

    let response = OrderDetailsResponse {
        order: order_with_customer(&state, &order).await?,
        items: items.iter().map(item_response).collect(),
        history: history
            .iter()
            .map(history_response)
            .collect::<Result<Vec<_>, _>>()
            .map_err(database_error)?,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Handler for GET /api/customers/{chat_id}/orders
/// The customer's orders, newest first. Unknown chats get an empty list.
pub async fn list_customer_orders(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<(StatusCode, Json<OrderListResponse>), (StatusCode, Json<ErrorResponse>)> {
    let customer = match state.store.find_customer_by_chat(chat_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => return Ok((StatusCode::OK, Json(Vec::new()))),
        Err(e) => {
            tracing::error!("Failed to look up customer for chat {}: {}", chat_id, e);
            return Err(database_error(e));
        }
    };

    let orders = state
        .store
        .list_orders_for_chat(chat_id)
        .await
        .map_err(database_error)?;
    let response = orders
        .iter()
        .map(|order| order_response(order, &customer))
        .collect::<Result<Vec<_>, _>>()
        .map_err(database_error)?;
    Ok((StatusCode::OK, Json(response)))
}

async fn order_with_customer(
    state: &AppState,
    order: &orders::Model,
) -> Result<OrderResponse, (StatusCode, Json<ErrorResponse>)> {
    let customer = match state.store.find_customer(order.customer_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            tracing::error!(
                "Order {} references missing customer {}",
                order.id,
                order.customer_id
            );
            return Err(database_error(StoreError::CustomerNotFound(
                order.customer_id,
            )));
        }
        Err(e) => return Err(database_error(e)),
    };
    order_response(order, &customer).map_err(database_error)
}

fn order_response(
    order: &orders::Model,
    customer: &customers::Model,
) -> Result<OrderResponse, StoreError> {
    let status = store::order_status(order)?;
    let payment_method = store::order_payment(order)?;
    Ok(OrderResponse {
        id: order.id,
        order_number: order.order_number.clone(),
        status,
        status_label: status.label().to_string(),
        payment_method,
        customer_name: customer.full_name.clone(),
        customer_phone: customer.phone_number.clone(),
        delivery_address: order.delivery_address.clone(),
        latitude: order.latitude,
        longitude: order.longitude,
        delivery_distance_km: order.delivery_distance_km,
        delivery_cost: order.delivery_cost,
        items_total: order.items_total,
        total_price: order.total_price,
        created_at: order.created_at,
        confirmed_at: order.confirmed_at,
        ready_at: order.ready_at,
        delivered_at: order.delivered_at,
    })
}

fn item_response(item: &order_items::Model) -> OrderItemResponse {
    OrderItemResponse {
        product_name: item.product_name.clone(),
        unit_price: item.unit_price,
        quantity: item.quantity,
        line_total: item.unit_price * Decimal::from(item.quantity),
    }
}

/// The creation row carries an empty `old_status`, rendered as absent.
fn history_response(
    row: &order_status_history::Model,
) -> Result<HistoryEntryResponse, StoreError> {
    let new_status =
        OrderStatus::parse(&row.new_status).ok_or_else(|| StoreError::CorruptColumn {
            column: "order_status_history.new_status",
            value: row.new_status.clone(),
        })?;
    let old_status = if row.old_status.is_empty() {
        None
    } else {
        Some(
            OrderStatus::parse(&row.old_status).ok_or_else(|| StoreError::CorruptColumn {
                column: "order_status_history.old_status",
                value: row.old_status.clone(),
            })?,
        )
    };
    Ok(HistoryEntryResponse {
        old_status,
        new_status,
        changed_by: row.changed_by.clone(),
        note: row.note.clone(),
        created_at: row.created_at,
    })
}

fn database_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {}", e),
        }),
    )
}
