//! Data models for service storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// A registered user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub company_name: String,
    pub role: String,
    pub verified: bool,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The user record as exposed over HTTP (password hash stripped).
    pub fn sanitized(&self) -> PublicUser {
        PublicUser {
            id: self.id.0,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            company_name: self.company_name.clone(),
            role: self.role.clone(),
            verified: self.verified,
        }
    }
}

/// User record safe to return to clients
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub company_name: String,
    pub role: String,
    pub verified: bool,
}

/// Fields for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub company_name: String,
    pub role: String,
}

/// A one-time passcode tying an email to a 6-digit code
#[derive(Debug, Clone)]
pub struct OneTimePasscode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An opaque session issued after OTP verification
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Purchase-order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "approved" => Some(OrderStatus::Approved),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// A purchase order header row
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrder {
    pub id: i64,
    pub po_number: String,
    pub supplier: String,
    pub order_date: DateTime<Utc>,
    /// Caller-supplied target date, passed through verbatim
    pub delivery_date: Option<String>,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub total_items: i64,
    pub total_value: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped when delivery reconciliation runs; never cleared, so
    /// line items are applied to inventory at most once per order
    pub reconciled_at: Option<DateTime<Utc>>,
}

/// One line of a purchase order (material/quantity/price)
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub price: f64,
}

/// Line item as supplied at order creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub price: f64,
}

/// Fields for a new purchase order plus its line items
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub supplier: String,
    pub delivery_date: Option<String>,
    pub delivery_address: String,
    pub notes: String,
    pub total_items: i64,
    pub total_value: f64,
    pub items: Vec<NewOrderLine>,
}

/// Filters for listing purchase orders ("all" is a skip sentinel)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub supplier: Option<String>,
    pub search: Option<String>,
}

/// Derived stock classification (not stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

/// An inventory item row
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub min_stock_level: i64,
    pub location: String,
    pub supplier: String,
    pub cost: f64,
    pub description: String,
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.min_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Fields for creating or replacing an inventory item
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub min_stock_level: i64,
    pub location: String,
    pub supplier: String,
    pub cost: f64,
    pub description: String,
}

/// Filters for listing inventory items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    /// Derived stock status: "low", "out" or "in"
    pub status: Option<String>,
    pub search: Option<String>,
}

/// A low-stock row as shown on the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub unit: String,
    /// "critical" when the item is out of stock, "low" otherwise
    pub status: String,
}

/// Per-category quantity total
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub value: i64,
}

/// Aggregate numbers for the dashboard overview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_items: i64,
    pub total_categories: i64,
    pub inventory_value: f64,
    pub low_stock_count: i64,
    pub low_stock_items: Vec<LowStockItem>,
    pub categories: Vec<CategoryBreakdown>,
    pub stock_health: i64,
}
