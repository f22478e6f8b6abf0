//! HTTP routes for the service

mod auth;
mod dashboard;
mod inventory;
mod procurement;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::state::AppState;
use crate::store::Datastore;

/// Create the router with all routes
pub fn create_router<D, E>(state: Arc<AppState<D, E>>) -> Router
where
    D: Datastore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-2fa", post(auth::verify_2fa))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/procurement/orders",
            get(procurement::list_orders).post(procurement::create_order),
        )
        .route(
            "/procurement/orders/:id",
            get(procurement::get_order)
                .put(procurement::update_status)
                .delete(procurement::delete_order),
        )
        .route(
            "/inventory/items",
            get(inventory::list_items).post(inventory::add_item),
        )
        .route(
            "/inventory/items/:id",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route("/dashboard/overview", get(dashboard::overview))
        .route("/dashboard/low-stock", get(dashboard::low_stock))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
