//! Storage abstractions for the service

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AppError>;

/// Category assigned to inventory rows created by delivery reconciliation
pub const RECONCILE_CATEGORY: &str = "New Items";
/// Minimum stock level assigned to reconciled rows
pub const RECONCILE_MIN_STOCK: i64 = 5;
/// Location assigned to reconciled rows
pub const RECONCILE_LOCATION: &str = "Main Warehouse";
/// Supplier fallback when a line item carries none
pub const RECONCILE_SUPPLIER: &str = "Unknown";

/// Outcome of a delivery status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// No order with that id
    NotFound,
    /// Status set to delivered and line items applied to inventory
    Reconciled,
    /// Reconciliation already ran for this order; only the status changed
    AlreadyDelivered,
}

/// Trait for user, OTP and account storage
pub trait UserStore: Send + Sync {
    /// Insert a new user row with `verified = false`
    fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    /// Get a user by email address
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Mark the user with this email as verified
    fn mark_verified(&self, email: &str) -> StoreResult<()>;

    /// Delete any existing OTPs for the email, then store a fresh one.
    /// At most one live OTP per email.
    fn replace_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Delete-if-match for an unexpired (email, code) pair. Returns whether
    /// a matching row existed; the row is gone afterwards (single use).
    fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Trait for session token storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user
    fn create_session(&self, user_id: UserId) -> StoreResult<Session>;

    /// Get a session by token
    fn get_session(&self, token: &str) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, token: &str) -> StoreResult<()>;
}

/// Trait for purchase-order storage
pub trait ProcurementStore: Send + Sync {
    /// Insert the order row and all line items in one transaction.
    /// Status is fixed to `pending`; order date is stamped now.
    fn create_order(&self, order: NewPurchaseOrder) -> StoreResult<i64>;

    /// List orders matching the filter, newest order date first
    fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<PurchaseOrder>>;

    /// Get an order and its line items
    fn get_order(&self, id: i64) -> StoreResult<Option<(PurchaseOrder, Vec<PurchaseOrderItem>)>>;

    /// Set a non-delivered status. Returns false if no order matched.
    fn set_status(&self, id: i64, status: OrderStatus) -> StoreResult<bool>;

    /// Set status to delivered and apply every line item onto inventory
    /// (create-or-increment by exact name), all in one transaction.
    /// Reconciliation runs at most once per order ever: a later call only
    /// updates the status, even if the order was moved back to pending
    /// in between.
    fn deliver_order(&self, id: i64) -> StoreResult<DeliveryOutcome>;

    /// Delete the order and its line items in one transaction.
    /// Returns false if no order matched.
    fn delete_order(&self, id: i64) -> StoreResult<bool>;
}

/// Trait for inventory storage and dashboard aggregates
pub trait InventoryStore: Send + Sync {
    /// List items matching the filter
    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>>;

    /// Get an item by id
    fn get_item(&self, id: i64) -> StoreResult<Option<InventoryItem>>;

    /// Insert a new item, stamping `last_updated`
    fn add_item(&self, item: NewInventoryItem) -> StoreResult<i64>;

    /// Replace an item's fields, stamping `last_updated`.
    /// Returns false if no item matched.
    fn update_item(&self, id: i64, item: NewInventoryItem) -> StoreResult<bool>;

    /// Delete an item. Returns false if no item matched.
    fn delete_item(&self, id: i64) -> StoreResult<bool>;

    /// Aggregate numbers for the dashboard overview
    fn overview(&self) -> StoreResult<DashboardOverview>;

    /// All items at or below their minimum stock level, worst first
    fn low_stock(&self) -> StoreResult<Vec<LowStockItem>>;
}

/// The full storage surface the router needs
pub trait Datastore: UserStore + SessionStore + ProcurementStore + InventoryStore {}

impl<T: UserStore + SessionStore + ProcurementStore + InventoryStore> Datastore for T {}

// Forwarding impls so a shared Arc<Store> can sit in AppState directly.

impl<T: UserStore + ?Sized> UserStore for std::sync::Arc<T> {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        (**self).create_user(user)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        (**self).get_user_by_email(email)
    }

    fn mark_verified(&self, email: &str) -> StoreResult<()> {
        (**self).mark_verified(email)
    }

    fn replace_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        (**self).replace_otp(email, code, expires_at)
    }

    fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        (**self).consume_otp(email, code, now)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for std::sync::Arc<T> {
    fn create_session(&self, user_id: UserId) -> StoreResult<Session> {
        (**self).create_session(user_id)
    }

    fn get_session(&self, token: &str) -> StoreResult<Option<Session>> {
        (**self).get_session(token)
    }

    fn delete_session(&self, token: &str) -> StoreResult<()> {
        (**self).delete_session(token)
    }
}

impl<T: ProcurementStore + ?Sized> ProcurementStore for std::sync::Arc<T> {
    fn create_order(&self, order: NewPurchaseOrder) -> StoreResult<i64> {
        (**self).create_order(order)
    }

    fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<PurchaseOrder>> {
        (**self).list_orders(filter)
    }

    fn get_order(&self, id: i64) -> StoreResult<Option<(PurchaseOrder, Vec<PurchaseOrderItem>)>> {
        (**self).get_order(id)
    }

    fn set_status(&self, id: i64, status: OrderStatus) -> StoreResult<bool> {
        (**self).set_status(id, status)
    }

    fn deliver_order(&self, id: i64) -> StoreResult<DeliveryOutcome> {
        (**self).deliver_order(id)
    }

    fn delete_order(&self, id: i64) -> StoreResult<bool> {
        (**self).delete_order(id)
    }
}

impl<T: InventoryStore + ?Sized> InventoryStore for std::sync::Arc<T> {
    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        (**self).list_items(filter)
    }

    fn get_item(&self, id: i64) -> StoreResult<Option<InventoryItem>> {
        (**self).get_item(id)
    }

    fn add_item(&self, item: NewInventoryItem) -> StoreResult<i64> {
        (**self).add_item(item)
    }

    fn update_item(&self, id: i64, item: NewInventoryItem) -> StoreResult<bool> {
        (**self).update_item(id, item)
    }

    fn delete_item(&self, id: i64) -> StoreResult<bool> {
        (**self).delete_item(id)
    }

    fn overview(&self) -> StoreResult<DashboardOverview> {
        (**self).overview()
    }

    fn low_stock(&self) -> StoreResult<Vec<LowStockItem>> {
        (**self).low_stock()
    }
}
