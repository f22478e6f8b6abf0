//! Dashboard aggregate endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::email::EmailSender;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{DashboardOverview, Datastore, LowStockItem};

/// GET /dashboard/overview
pub async fn overview<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
) -> Result<Json<DashboardOverview>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    Ok(Json(state.store.overview()?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockResponse {
    pub items: Vec<LowStockItem>,
    pub total_critical: usize,
    pub total_low: usize,
}

/// GET /dashboard/low-stock
pub async fn low_stock<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
) -> Result<Json<LowStockResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let items = state.store.low_stock()?;
    let total_critical = items.iter().filter(|i| i.status == "critical").count();
    let total_low = items.iter().filter(|i| i.status == "low").count();

    Ok(Json(LowStockResponse {
        items,
        total_critical,
        total_low,
    }))
}
