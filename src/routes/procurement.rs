//! Purchase-order endpoints and the delivery workflow

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::email::EmailSender;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{
    Datastore, DeliveryOutcome, NewOrderLine, NewPurchaseOrder, OrderFilter, OrderStatus,
    PurchaseOrder,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewOrderLine>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub message: String,
    pub order_id: i64,
}

/// POST /procurement/orders
pub async fn create_order<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let po_number = req
        .po_number
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Required fields are missing".to_string()))?;
    let supplier = req
        .supplier
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Required fields are missing".to_string()))?;
    if req.items.is_empty() {
        return Err(AppError::Validation("Required fields are missing".to_string()));
    }

    // Denormalized totals, computed once at creation and never recomputed
    let total_items: i64 = req.items.iter().map(|i| i.quantity).sum();
    let total_value: f64 = req
        .items
        .iter()
        .map(|i| i.quantity as f64 * i.price)
        .sum();

    let order_id = state.store.create_order(NewPurchaseOrder {
        po_number,
        supplier,
        delivery_date: req.delivery_date,
        delivery_address: req.delivery_address.unwrap_or_default(),
        notes: req.notes.unwrap_or_default(),
        total_items,
        total_value,
        items: req.items,
    })?;

    tracing::info!(order_id, "Purchase order created");

    Ok(Json(CreateOrderResponse {
        message: "Purchase order created successfully".to_string(),
        order_id,
    }))
}

/// GET /procurement/orders
pub async fn list_orders<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<PurchaseOrder>>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    Ok(Json(state.store.list_orders(&filter)?))
}

/// GET /procurement/orders/{id}
pub async fn get_order<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let (order, items) = state
        .store
        .get_order(id)?
        .ok_or_else(|| AppError::NotFound("Purchase order not found".to_string()))?;

    // Order fields with the line items inlined, like `{...order, items}`
    let mut body = serde_json::to_value(&order).map_err(|e| AppError::Internal(e.to_string()))?;
    body["items"] = serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// PUT /procurement/orders/{id}
///
/// Any status in the enum may follow any other; the one special case is
/// `delivered`, which reconciles the order's line items into inventory
/// exactly once per order.
pub async fn update_status<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<MessageResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let status = req
        .status
        .as_deref()
        .and_then(OrderStatus::parse)
        .ok_or_else(|| AppError::Validation("Invalid status value".to_string()))?;

    if status == OrderStatus::Delivered {
        match state.store.deliver_order(id)? {
            DeliveryOutcome::NotFound => {
                return Err(AppError::NotFound("Purchase order not found".to_string()))
            }
            DeliveryOutcome::Reconciled => {
                tracing::info!(order_id = id, "Order delivered; inventory reconciled");
            }
            DeliveryOutcome::AlreadyDelivered => {
                tracing::debug!(order_id = id, "Order already delivered; skipping reconciliation");
            }
        }
    } else if !state.store.set_status(id, status)? {
        return Err(AppError::NotFound("Purchase order not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Purchase order status updated successfully".to_string(),
    }))
}

/// DELETE /procurement/orders/{id}
pub async fn delete_order<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    if !state.store.delete_order(id)? {
        return Err(AppError::NotFound("Purchase order not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Purchase order deleted successfully".to_string(),
    }))
}
