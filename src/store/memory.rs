//! In-memory storage implementation (tests and development)

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{
    DashboardOverview, DeliveryOutcome, InventoryItem, InventoryStore, ItemFilter, LowStockItem,
    NewInventoryItem, NewPurchaseOrder, NewUser, OneTimePasscode, OrderFilter, OrderStatus,
    ProcurementStore, PurchaseOrder, PurchaseOrderItem, Session, SessionStore, StockStatus,
    StoreResult, User, UserId, UserStore, RECONCILE_CATEGORY, RECONCILE_LOCATION,
    RECONCILE_MIN_STOCK, RECONCILE_SUPPLIER,
};
use crate::crypto::generate_session_token;
use crate::error::AppError;

/// In-memory store backing all four storage traits
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    otps: RwLock<HashMap<String, OneTimePasscode>>,
    sessions: RwLock<HashMap<String, Session>>,
    orders: RwLock<HashMap<i64, PurchaseOrder>>,
    order_items: RwLock<HashMap<i64, Vec<PurchaseOrderItem>>>,
    inventory: RwLock<HashMap<i64, InventoryItem>>,
    next_user_id: AtomicI64,
    next_order_id: AtomicI64,
    next_line_id: AtomicI64,
    next_item_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            otps: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            order_items: RwLock::new(HashMap::new()),
            inventory: RwLock::new(HashMap::new()),
            next_user_id: AtomicI64::new(1),
            next_order_id: AtomicI64::new(1),
            next_line_id: AtomicI64::new(1),
            next_item_id: AtomicI64::new(1),
        }
    }

    /// Rewrite the expiry of a stored OTP (for testing purposes)
    pub fn set_otp_expiry(&self, email: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut otps = self.otps.write().unwrap();
        if let Some(otp) = otps.get_mut(&normalized) {
            otp.expires_at = expires_at;
            Ok(())
        } else {
            Err(AppError::NotFound("no OTP for email".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl UserStore for MemoryStore {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let normalized = user.email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if users.contains_key(&normalized) {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        users.insert(
            normalized.clone(),
            User {
                id,
                full_name: user.full_name,
                email: normalized,
                password_hash: user.password_hash,
                company_name: user.company_name,
                role: user.role,
                verified: false,
                two_factor_enabled: false,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        Ok(self.users.read().unwrap().get(&normalized).cloned())
    }

    fn mark_verified(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if let Some(user) = users.get_mut(&normalized) {
            user.verified = true;
            Ok(())
        } else {
            Err(AppError::NotFound("User not found".to_string()))
        }
    }

    fn replace_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut otps = self.otps.write().unwrap();
        // Keyed by email, so inserting replaces any prior live code
        otps.insert(
            normalized.clone(),
            OneTimePasscode {
                email: normalized,
                code: code.to_string(),
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let normalized = email.to_lowercase();
        let mut otps = self.otps.write().unwrap();
        let matches = otps
            .get(&normalized)
            .is_some_and(|otp| otp.code == code && otp.expires_at > now);
        if matches {
            otps.remove(&normalized);
        }
        Ok(matches)
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&self, user_id: UserId) -> StoreResult<Session> {
        let session = Session {
            token: generate_session_token(),
            user_id,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(token).cloned())
    }

    fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(token);
        Ok(())
    }
}

impl ProcurementStore for MemoryStore {
    fn create_order(&self, order: NewPurchaseOrder) -> StoreResult<i64> {
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();

        let lines: Vec<PurchaseOrderItem> = order
            .items
            .iter()
            .map(|line| PurchaseOrderItem {
                id: self.next_line_id.fetch_add(1, Ordering::SeqCst),
                order_id: id,
                item_name: line.name.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                price: line.price,
            })
            .collect();

        self.orders.write().unwrap().insert(
            id,
            PurchaseOrder {
                id,
                po_number: order.po_number,
                supplier: order.supplier,
                order_date: now,
                delivery_date: order.delivery_date,
                delivery_address: order.delivery_address,
                status: OrderStatus::Pending,
                total_items: order.total_items,
                total_value: order.total_value,
                notes: order.notes,
                created_at: now,
                updated_at: now,
                reconciled_at: None,
            },
        );
        self.order_items.write().unwrap().insert(id, lines);

        Ok(id)
    }

    fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<PurchaseOrder>> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<PurchaseOrder> = orders
            .values()
            .filter(|o| match filter.status.as_deref() {
                Some(s) if s != "all" => o.status.as_str() == s,
                _ => true,
            })
            .filter(|o| match filter.supplier.as_deref() {
                Some(s) if s != "all" => o.supplier == s,
                _ => true,
            })
            .filter(|o| match filter.search.as_deref() {
                Some(s) => {
                    contains_ci(&o.po_number, s)
                        || contains_ci(&o.supplier, s)
                        || contains_ci(&o.notes, s)
                }
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    fn get_order(&self, id: i64) -> StoreResult<Option<(PurchaseOrder, Vec<PurchaseOrderItem>)>> {
        let orders = self.orders.read().unwrap();
        let Some(order) = orders.get(&id).cloned() else {
            return Ok(None);
        };
        let items = self
            .order_items
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default();
        Ok(Some((order, items)))
    }

    fn set_status(&self, id: i64, status: OrderStatus) -> StoreResult<bool> {
        let mut orders = self.orders.write().unwrap();
        if let Some(order) = orders.get_mut(&id) {
            order.status = status;
            order.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn deliver_order(&self, id: i64) -> StoreResult<DeliveryOutcome> {
        // Hold both write locks for the duration so the status flip and the
        // inventory upserts land together, mirroring the SQL transaction.
        let mut orders = self.orders.write().unwrap();
        let mut inventory = self.inventory.write().unwrap();

        let Some(order) = orders.get_mut(&id) else {
            return Ok(DeliveryOutcome::NotFound);
        };

        let now = Utc::now();
        order.status = OrderStatus::Delivered;
        order.updated_at = now;

        // Reconciliation is once-ever per order. The marker survives later
        // status changes, so moving a delivered order back to pending and
        // delivering it again cannot re-apply the line items.
        if order.reconciled_at.is_some() {
            return Ok(DeliveryOutcome::AlreadyDelivered);
        }
        order.reconciled_at = Some(now);

        let lines = self
            .order_items
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default();

        for line in &lines {
            // Soft-join on exact item name
            let existing = inventory
                .values_mut()
                .find(|item| item.name == line.item_name);
            match existing {
                Some(item) => {
                    item.quantity += line.quantity;
                    item.last_updated = now;
                }
                None => {
                    let item_id = self.next_item_id.fetch_add(1, Ordering::SeqCst);
                    inventory.insert(
                        item_id,
                        InventoryItem {
                            id: item_id,
                            name: line.item_name.clone(),
                            category: RECONCILE_CATEGORY.to_string(),
                            quantity: line.quantity,
                            unit: line.unit.clone(),
                            min_stock_level: RECONCILE_MIN_STOCK,
                            location: RECONCILE_LOCATION.to_string(),
                            supplier: RECONCILE_SUPPLIER.to_string(),
                            cost: line.price,
                            description: String::new(),
                            last_updated: now,
                        },
                    );
                }
            }
        }

        Ok(DeliveryOutcome::Reconciled)
    }

    fn delete_order(&self, id: i64) -> StoreResult<bool> {
        let mut orders = self.orders.write().unwrap();
        if orders.remove(&id).is_none() {
            return Ok(false);
        }
        self.order_items.write().unwrap().remove(&id);
        Ok(true)
    }
}

impl InventoryStore for MemoryStore {
    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        let inventory = self.inventory.read().unwrap();
        let mut result: Vec<InventoryItem> = inventory
            .values()
            .filter(|i| match filter.category.as_deref() {
                Some(c) if c != "all" => i.category == c,
                _ => true,
            })
            .filter(|i| match filter.location.as_deref() {
                Some(l) if l != "all" => i.location == l,
                _ => true,
            })
            .filter(|i| match filter.status.as_deref() {
                Some("low") => i.stock_status() == StockStatus::LowStock,
                Some("out") => i.stock_status() == StockStatus::OutOfStock,
                Some("in") => i.stock_status() == StockStatus::InStock,
                _ => true,
            })
            .filter(|i| match filter.search.as_deref() {
                Some(s) => contains_ci(&i.name, s) || contains_ci(&i.description, s),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by_key(|i| i.id);
        Ok(result)
    }

    fn get_item(&self, id: i64) -> StoreResult<Option<InventoryItem>> {
        Ok(self.inventory.read().unwrap().get(&id).cloned())
    }

    fn add_item(&self, item: NewInventoryItem) -> StoreResult<i64> {
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst);
        self.inventory.write().unwrap().insert(
            id,
            InventoryItem {
                id,
                name: item.name,
                category: item.category,
                quantity: item.quantity,
                unit: item.unit,
                min_stock_level: item.min_stock_level,
                location: item.location,
                supplier: item.supplier,
                cost: item.cost,
                description: item.description,
                last_updated: Utc::now(),
            },
        );
        Ok(id)
    }

    fn update_item(&self, id: i64, item: NewInventoryItem) -> StoreResult<bool> {
        let mut inventory = self.inventory.write().unwrap();
        if let Some(existing) = inventory.get_mut(&id) {
            existing.name = item.name;
            existing.category = item.category;
            existing.quantity = item.quantity;
            existing.unit = item.unit;
            existing.min_stock_level = item.min_stock_level;
            existing.location = item.location;
            existing.supplier = item.supplier;
            existing.cost = item.cost;
            existing.description = item.description;
            existing.last_updated = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn delete_item(&self, id: i64) -> StoreResult<bool> {
        Ok(self.inventory.write().unwrap().remove(&id).is_some())
    }

    fn overview(&self) -> StoreResult<DashboardOverview> {
        let inventory = self.inventory.read().unwrap();
        let total_items = inventory.len() as i64;

        let mut by_category: HashMap<String, i64> = HashMap::new();
        let mut inventory_value = 0.0;
        let mut healthy = 0i64;
        for item in inventory.values() {
            *by_category.entry(item.category.clone()).or_default() += item.quantity;
            inventory_value += item.quantity as f64 * item.cost;
            if item.quantity > item.min_stock_level {
                healthy += 1;
            }
        }

        let total_categories = by_category.len() as i64;
        let mut categories: Vec<super::CategoryBreakdown> = by_category
            .into_iter()
            .map(|(name, value)| super::CategoryBreakdown { name, value })
            .collect();
        categories.sort_by(|a, b| b.value.cmp(&a.value).then(a.name.cmp(&b.name)));
        categories.truncate(5);

        drop(inventory);

        let low_stock_items = self.low_stock()?;
        let low_stock_count = low_stock_items.len() as i64;
        let stock_health = if total_items > 0 {
            ((healthy as f64 / total_items as f64) * 100.0).round() as i64
        } else {
            100
        };

        Ok(DashboardOverview {
            total_items,
            total_categories,
            inventory_value,
            low_stock_count,
            low_stock_items: low_stock_items.into_iter().take(5).collect(),
            categories,
            stock_health,
        })
    }

    fn low_stock(&self) -> StoreResult<Vec<LowStockItem>> {
        let inventory = self.inventory.read().unwrap();
        let mut items: Vec<LowStockItem> = inventory
            .values()
            .filter(|i| i.stock_status() != StockStatus::InStock)
            .map(|i| LowStockItem {
                id: i.id,
                name: i.name.clone(),
                category: i.category.clone(),
                current_stock: i.quantity,
                minimum_stock: i.min_stock_level,
                unit: i.unit.clone(),
                status: match i.stock_status() {
                    StockStatus::OutOfStock => "critical",
                    _ => "low",
                }
                .to_string(),
            })
            .collect();
        // "critical" sorts before "low", then lowest quantity first
        items.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then(a.current_stock.cmp(&b.current_stock))
        });
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewOrderLine;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            company_name: "Acme Construction".to_string(),
            role: "Admin".to_string(),
        }
    }

    #[test]
    fn test_create_user_and_lookup() {
        let store = MemoryStore::new();

        let id = store.create_user(new_user("test@example.com")).unwrap();
        let user = store.get_user_by_email("Test@Example.COM").unwrap();
        assert!(user.is_some());
        assert_eq!(user.unwrap().id, id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();

        store.create_user(new_user("test@example.com")).unwrap();
        let result = store.create_user(new_user("test@example.com"));
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_otp_replace_invalidates_old_code() {
        let store = MemoryStore::new();
        let expires = Utc::now() + chrono::Duration::minutes(15);

        store
            .replace_otp("test@example.com", "111111", expires)
            .unwrap();
        store
            .replace_otp("test@example.com", "222222", expires)
            .unwrap();

        let now = Utc::now();
        assert!(!store.consume_otp("test@example.com", "111111", now).unwrap());
        assert!(store.consume_otp("test@example.com", "222222", now).unwrap());
    }

    #[test]
    fn test_otp_single_use() {
        let store = MemoryStore::new();
        let expires = Utc::now() + chrono::Duration::minutes(15);

        store
            .replace_otp("test@example.com", "123456", expires)
            .unwrap();

        let now = Utc::now();
        assert!(store.consume_otp("test@example.com", "123456", now).unwrap());
        assert!(!store.consume_otp("test@example.com", "123456", now).unwrap());
    }

    #[test]
    fn test_expired_otp_rejected_but_kept() {
        let store = MemoryStore::new();
        let expires = Utc::now() - chrono::Duration::minutes(1);

        store
            .replace_otp("test@example.com", "123456", expires)
            .unwrap();

        // Expired rows are excluded by predicate, not purged
        assert!(!store
            .consume_otp("test@example.com", "123456", Utc::now())
            .unwrap());
        assert!(store.otps.read().unwrap().contains_key("test@example.com"));
    }

    #[test]
    fn test_deliver_order_creates_and_increments() {
        let store = MemoryStore::new();

        let order_id = store
            .create_order(NewPurchaseOrder {
                po_number: "PO-0001".to_string(),
                supplier: "Acme Supplies".to_string(),
                delivery_date: None,
                delivery_address: "Site B".to_string(),
                notes: String::new(),
                total_items: 50,
                total_value: 625.0,
                items: vec![NewOrderLine {
                    name: "Cement".to_string(),
                    quantity: 50,
                    unit: "Bags".to_string(),
                    price: 12.5,
                }],
            })
            .unwrap();

        assert_eq!(
            store.deliver_order(order_id).unwrap(),
            DeliveryOutcome::Reconciled
        );

        let items = store.list_items(&ItemFilter::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Cement");
        assert_eq!(items[0].quantity, 50);
        assert_eq!(items[0].category, RECONCILE_CATEGORY);
        assert_eq!(items[0].min_stock_level, RECONCILE_MIN_STOCK);
        assert_eq!(items[0].location, RECONCILE_LOCATION);

        // Second delivery must not double-apply
        assert_eq!(
            store.deliver_order(order_id).unwrap(),
            DeliveryOutcome::AlreadyDelivered
        );
        let items = store.list_items(&ItemFilter::default()).unwrap();
        assert_eq!(items[0].quantity, 50);
    }

    #[test]
    fn test_reconcile_once_across_status_changes() {
        let store = MemoryStore::new();

        let order_id = store
            .create_order(NewPurchaseOrder {
                po_number: "PO-0001".to_string(),
                supplier: "Acme Supplies".to_string(),
                delivery_date: None,
                delivery_address: "Site B".to_string(),
                notes: String::new(),
                total_items: 50,
                total_value: 625.0,
                items: vec![NewOrderLine {
                    name: "Cement".to_string(),
                    quantity: 50,
                    unit: "Bags".to_string(),
                    price: 12.5,
                }],
            })
            .unwrap();

        store.deliver_order(order_id).unwrap();
        // Move the order back to pending and deliver a second time
        assert!(store.set_status(order_id, OrderStatus::Pending).unwrap());
        assert_eq!(
            store.deliver_order(order_id).unwrap(),
            DeliveryOutcome::AlreadyDelivered
        );

        let items = store.list_items(&ItemFilter::default()).unwrap();
        assert_eq!(items[0].quantity, 50);
        let (order, _) = store.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_delete_order_removes_lines() {
        let store = MemoryStore::new();

        let order_id = store
            .create_order(NewPurchaseOrder {
                po_number: "PO-0002".to_string(),
                supplier: "Acme Supplies".to_string(),
                delivery_date: None,
                delivery_address: String::new(),
                notes: String::new(),
                total_items: 1,
                total_value: 1.0,
                items: vec![NewOrderLine {
                    name: "Sand".to_string(),
                    quantity: 1,
                    unit: "Tons".to_string(),
                    price: 1.0,
                }],
            })
            .unwrap();

        assert!(store.delete_order(order_id).unwrap());
        assert!(store.get_order(order_id).unwrap().is_none());
        assert!(!store.delete_order(order_id).unwrap());
    }
}
