//! Inventory item endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::email::EmailSender;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{Datastore, InventoryItem, ItemFilter, NewInventoryItem};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub min_stock_level: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemRequest {
    fn into_new_item(self) -> Result<NewInventoryItem, AppError> {
        let missing = || AppError::Validation("Required fields are missing".to_string());

        Ok(NewInventoryItem {
            name: self.name.filter(|s| !s.trim().is_empty()).ok_or_else(missing)?,
            category: self
                .category
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(missing)?,
            quantity: self.quantity.ok_or_else(missing)?,
            unit: self.unit.filter(|s| !s.trim().is_empty()).ok_or_else(missing)?,
            min_stock_level: self.min_stock_level.unwrap_or(5),
            location: self.location.unwrap_or_else(|| "Main Warehouse".to_string()),
            supplier: self
                .supplier
                .unwrap_or_else(|| "Default Supplier".to_string()),
            cost: self.cost.unwrap_or(0.0),
            description: self.description.unwrap_or_default(),
        })
    }
}

#[derive(Serialize)]
pub struct AddItemResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /inventory/items
pub async fn list_items<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<InventoryItem>>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    Ok(Json(state.store.list_items(&filter)?))
}

/// GET /inventory/items/{id}
pub async fn get_item<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
) -> Result<Json<InventoryItem>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let item = state
        .store
        .get_item(id)?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    Ok(Json(item))
}

/// POST /inventory/items
pub async fn add_item<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<ItemRequest>,
) -> Result<Json<AddItemResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let id = state.store.add_item(req.into_new_item()?)?;

    Ok(Json(AddItemResponse {
        message: "Item added successfully".to_string(),
        id,
    }))
}

/// PUT /inventory/items/{id}
pub async fn update_item<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
    Json(req): Json<ItemRequest>,
) -> Result<Json<MessageResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    if !state.store.update_item(id, req.into_new_item()?)? {
        return Err(AppError::NotFound("Item not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Item updated successfully".to_string(),
    }))
}

/// DELETE /inventory/items/{id}
pub async fn delete_item<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    if !state.store.delete_item(id)? {
        return Err(AppError::NotFound("Item not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Item deleted successfully".to_string(),
    }))
}
