//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    DashboardOverview, DeliveryOutcome, InventoryItem, InventoryStore, ItemFilter, LowStockItem,
    NewInventoryItem, NewPurchaseOrder, NewUser, OrderFilter, OrderStatus, ProcurementStore,
    PurchaseOrder, PurchaseOrderItem, Session, SessionStore, StoreResult, User, UserId, UserStore,
    RECONCILE_CATEGORY, RECONCILE_LOCATION, RECONCILE_MIN_STOCK, RECONCILE_SUPPLIER,
};
use crate::crypto::generate_session_token;
use crate::error::AppError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

fn internal<E: ToString>(e: E) -> AppError {
    AppError::Internal(e.to_string())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// SQLite-based store implementing all four storage traits
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path).map_err(internal)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AppError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, AppError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AppError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Users
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                company_name TEXT NOT NULL,
                role TEXT NOT NULL,
                verified INTEGER NOT NULL DEFAULT 0,
                two_factor_enabled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- One-time passcodes (at most one live row per email)
            CREATE TABLE IF NOT EXISTS otps (
                email TEXT NOT NULL,
                code TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_otps_email ON otps(email);

            -- Sessions
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );

            -- Inventory
            CREATE TABLE IF NOT EXISTS inventory_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0,
                unit TEXT NOT NULL,
                min_stock_level INTEGER NOT NULL DEFAULT 5,
                location TEXT NOT NULL,
                supplier TEXT NOT NULL,
                cost REAL NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                last_updated TEXT NOT NULL
            );

            -- Purchase orders
            CREATE TABLE IF NOT EXISTS purchase_orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                po_number TEXT NOT NULL,
                supplier TEXT NOT NULL,
                order_date TEXT NOT NULL,
                delivery_date TEXT,
                delivery_address TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                total_items INTEGER NOT NULL,
                total_value REAL NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                reconciled_at TEXT
            );

            CREATE TABLE IF NOT EXISTS purchase_order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES purchase_orders(id) ON DELETE CASCADE,
                item_name TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                unit TEXT NOT NULL,
                price REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_po_items_order ON purchase_order_items(order_id);
            "#,
        )
        .map_err(internal)?;

        Ok(())
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        full_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        company_name: row.get(4)?,
        role: row.get(5)?,
        verified: row.get::<_, i64>(6)? != 0,
        two_factor_enabled: row.get::<_, i64>(7)? != 0,
        created_at: parse_ts(&row.get::<_, String>(8)?),
    })
}

fn map_order(row: &Row<'_>) -> rusqlite::Result<PurchaseOrder> {
    let status: String = row.get(6)?;
    Ok(PurchaseOrder {
        id: row.get(0)?,
        po_number: row.get(1)?,
        supplier: row.get(2)?,
        order_date: parse_ts(&row.get::<_, String>(3)?),
        delivery_date: row.get(4)?,
        delivery_address: row.get(5)?,
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Pending),
        total_items: row.get(7)?,
        total_value: row.get(8)?,
        notes: row.get(9)?,
        created_at: parse_ts(&row.get::<_, String>(10)?),
        updated_at: parse_ts(&row.get::<_, String>(11)?),
        reconciled_at: row.get::<_, Option<String>>(12)?.map(|s| parse_ts(&s)),
    })
}

const ORDER_COLUMNS: &str = "id, po_number, supplier, order_date, delivery_date, delivery_address, \
     status, total_items, total_value, notes, created_at, updated_at, reconciled_at";

fn map_line(row: &Row<'_>) -> rusqlite::Result<PurchaseOrderItem> {
    Ok(PurchaseOrderItem {
        id: row.get(0)?,
        order_id: row.get(1)?,
        item_name: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        price: row.get(5)?,
    })
}

fn map_inventory(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        min_stock_level: row.get(5)?,
        location: row.get(6)?,
        supplier: row.get(7)?,
        cost: row.get(8)?,
        description: row.get(9)?,
        last_updated: parse_ts(&row.get::<_, String>(10)?),
    })
}

const ITEM_COLUMNS: &str = "id, name, category, quantity, unit, min_stock_level, location, \
     supplier, cost, description, last_updated";

impl UserStore for SqliteStore {
    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let normalized = user.email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (full_name, email, password_hash, company_name, role, verified, two_factor_enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
            params![
                user.full_name,
                normalized,
                user.password_hash,
                user.company_name,
                user.role,
                now
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return AppError::Conflict("User with this email already exists".to_string());
                }
            }
            internal(e)
        })?;

        Ok(UserId(conn.last_insert_rowid()))
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, full_name, email, password_hash, company_name, role, verified, two_factor_enabled, created_at
             FROM users WHERE email = ?1",
            params![normalized],
            map_user,
        )
        .optional()
        .map_err(internal)
    }

    fn mark_verified(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE users SET verified = 1 WHERE email = ?1",
                params![normalized],
            )
            .map_err(internal)?;

        if rows_affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    fn replace_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(internal)?;

        // Invalidate any prior unconsumed OTP for this email
        tx.execute("DELETE FROM otps WHERE email = ?1", params![normalized])
            .map_err(internal)?;
        tx.execute(
            "INSERT INTO otps (email, code, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                normalized,
                code,
                expires_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(internal)?;

        tx.commit().map_err(internal)
    }

    fn consume_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        // Delete-if-match makes the code single-use; expired rows stay put
        // and are simply never matched.
        let rows_affected = conn
            .execute(
                "DELETE FROM otps WHERE email = ?1 AND code = ?2 AND expires_at > ?3",
                params![normalized, code, now.to_rfc3339()],
            )
            .map_err(internal)?;

        Ok(rows_affected > 0)
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&self, user_id: UserId) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            token: generate_session_token(),
            user_id,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                session.token,
                session.user_id.0,
                session.created_at.to_rfc3339()
            ],
        )
        .map_err(internal)?;

        Ok(session)
    }

    fn get_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT token, user_id, created_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    created_at: parse_ts(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(internal)
    }

    fn delete_session(&self, token: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(internal)?;

        Ok(())
    }
}

impl ProcurementStore for SqliteStore {
    fn create_order(&self, order: NewPurchaseOrder) -> StoreResult<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(internal)?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO purchase_orders (po_number, supplier, order_date, delivery_date, delivery_address,
                                          status, total_items, total_value, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                order.po_number,
                order.supplier,
                now,
                order.delivery_date,
                order.delivery_address,
                OrderStatus::Pending.as_str(),
                order.total_items,
                order.total_value,
                order.notes,
                now,
                now
            ],
        )
        .map_err(internal)?;

        let order_id = tx.last_insert_rowid();

        for line in &order.items {
            tx.execute(
                "INSERT INTO purchase_order_items (order_id, item_name, quantity, unit, price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![order_id, line.name, line.quantity, line.unit, line.price],
            )
            .map_err(internal)?;
        }

        tx.commit().map_err(internal)?;
        Ok(order_id)
    }

    fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<PurchaseOrder>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status.as_deref().filter(|s| *s != "all") {
            sql.push_str(" AND status = ?");
            args.push(status.to_string());
        }
        if let Some(supplier) = filter.supplier.as_deref().filter(|s| *s != "all") {
            sql.push_str(" AND supplier = ?");
            args.push(supplier.to_string());
        }
        if let Some(search) = filter.search.as_deref() {
            sql.push_str(" AND (po_number LIKE ? OR supplier LIKE ? OR notes LIKE ?)");
            let pattern = format!("%{}%", search);
            args.push(pattern.clone());
            args.push(pattern.clone());
            args.push(pattern);
        }
        sql.push_str(" ORDER BY order_date DESC, id DESC");

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let orders = stmt
            .query_map(params_from_iter(args.iter()), map_order)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(orders)
    }

    fn get_order(&self, id: i64) -> StoreResult<Option<(PurchaseOrder, Vec<PurchaseOrderItem>)>> {
        let conn = self.conn.lock().unwrap();

        let order = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ?1"),
                params![id],
                map_order,
            )
            .optional()
            .map_err(internal)?;

        let Some(order) = order else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT id, order_id, item_name, quantity, unit, price
                 FROM purchase_order_items WHERE order_id = ?1",
            )
            .map_err(internal)?;
        let items = stmt
            .query_map(params![id], map_line)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(Some((order, items)))
    }

    fn set_status(&self, id: i64, status: OrderStatus) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE purchase_orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(internal)?;

        Ok(rows_affected > 0)
    }

    fn deliver_order(&self, id: i64) -> StoreResult<DeliveryOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(internal)?;

        let reconciled: Option<Option<String>> = tx
            .query_row(
                "SELECT reconciled_at FROM purchase_orders WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?;

        let Some(reconciled_at) = reconciled else {
            return Ok(DeliveryOutcome::NotFound);
        };

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE purchase_orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![OrderStatus::Delivered.as_str(), now, id],
        )
        .map_err(internal)?;

        // Reconciliation is once-ever per order. The marker survives later
        // status changes, so moving a delivered order back to pending and
        // delivering it again cannot re-apply the line items.
        if reconciled_at.is_some() {
            tx.commit().map_err(internal)?;
            return Ok(DeliveryOutcome::AlreadyDelivered);
        }

        tx.execute(
            "UPDATE purchase_orders SET reconciled_at = ?1 WHERE id = ?2",
            params![now, id],
        )
        .map_err(internal)?;

        let lines: Vec<PurchaseOrderItem> = {
            let mut stmt = tx
                .prepare(
                    "SELECT id, order_id, item_name, quantity, unit, price
                     FROM purchase_order_items WHERE order_id = ?1",
                )
                .map_err(internal)?;
            let rows = stmt
                .query_map(params![id], map_line)
                .map_err(internal)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(internal)?;
            rows
        };

        for line in &lines {
            // Soft-join on exact item name; duplicate names fork rows
            let existing: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT id, quantity FROM inventory_items WHERE name = ?1 LIMIT 1",
                    params![line.item_name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(internal)?;

            match existing {
                Some((item_id, quantity)) => {
                    tx.execute(
                        "UPDATE inventory_items SET quantity = ?1, last_updated = ?2 WHERE id = ?3",
                        params![quantity + line.quantity, now, item_id],
                    )
                    .map_err(internal)?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO inventory_items (name, category, quantity, unit, min_stock_level,
                                                      location, supplier, cost, description, last_updated)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '', ?9)",
                        params![
                            line.item_name,
                            RECONCILE_CATEGORY,
                            line.quantity,
                            line.unit,
                            RECONCILE_MIN_STOCK,
                            RECONCILE_LOCATION,
                            RECONCILE_SUPPLIER,
                            line.price,
                            now
                        ],
                    )
                    .map_err(internal)?;
                }
            }
        }

        // Rolls back on any earlier failure since the tx is only committed here
        tx.commit().map_err(internal)?;
        Ok(DeliveryOutcome::Reconciled)
    }

    fn delete_order(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(internal)?;

        tx.execute(
            "DELETE FROM purchase_order_items WHERE order_id = ?1",
            params![id],
        )
        .map_err(internal)?;

        let rows_affected = tx
            .execute("DELETE FROM purchase_orders WHERE id = ?1", params![id])
            .map_err(internal)?;

        tx.commit().map_err(internal)?;
        Ok(rows_affected > 0)
    }
}

impl InventoryStore for SqliteStore {
    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(category) = filter.category.as_deref().filter(|s| *s != "all") {
            sql.push_str(" AND category = ?");
            args.push(category.to_string());
        }
        if let Some(location) = filter.location.as_deref().filter(|s| *s != "all") {
            sql.push_str(" AND location = ?");
            args.push(location.to_string());
        }
        match filter.status.as_deref() {
            Some("low") => sql.push_str(" AND quantity <= min_stock_level AND quantity > 0"),
            Some("out") => sql.push_str(" AND quantity = 0"),
            Some("in") => sql.push_str(" AND quantity > min_stock_level"),
            _ => {}
        }
        if let Some(search) = filter.search.as_deref() {
            sql.push_str(" AND (name LIKE ? OR description LIKE ?)");
            let pattern = format!("%{}%", search);
            args.push(pattern.clone());
            args.push(pattern);
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), map_inventory)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(items)
    }

    fn get_item(&self, id: i64) -> StoreResult<Option<InventoryItem>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1"),
            params![id],
            map_inventory,
        )
        .optional()
        .map_err(internal)
    }

    fn add_item(&self, item: NewInventoryItem) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO inventory_items (name, category, quantity, unit, min_stock_level,
                                          location, supplier, cost, description, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.name,
                item.category,
                item.quantity,
                item.unit,
                item.min_stock_level,
                item.location,
                item.supplier,
                item.cost,
                item.description,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(internal)?;

        Ok(conn.last_insert_rowid())
    }

    fn update_item(&self, id: i64, item: NewInventoryItem) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE inventory_items SET
                    name = ?1, category = ?2, quantity = ?3, unit = ?4, min_stock_level = ?5,
                    location = ?6, supplier = ?7, cost = ?8, description = ?9, last_updated = ?10
                 WHERE id = ?11",
                params![
                    item.name,
                    item.category,
                    item.quantity,
                    item.unit,
                    item.min_stock_level,
                    item.location,
                    item.supplier,
                    item.cost,
                    item.description,
                    Utc::now().to_rfc3339(),
                    id
                ],
            )
            .map_err(internal)?;

        Ok(rows_affected > 0)
    }

    fn delete_item(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute("DELETE FROM inventory_items WHERE id = ?1", params![id])
            .map_err(internal)?;

        Ok(rows_affected > 0)
    }

    fn overview(&self) -> StoreResult<DashboardOverview> {
        let conn = self.conn.lock().unwrap();

        let (total_items, healthy): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN quantity > min_stock_level THEN 1 ELSE 0 END), 0)
                 FROM inventory_items",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(internal)?;

        let total_categories: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT category) FROM inventory_items",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        let inventory_value: f64 = conn
            .query_row(
                "SELECT COALESCE(SUM(quantity * cost), 0) FROM inventory_items",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        let low_stock_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM inventory_items WHERE quantity <= min_stock_level",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        let mut stmt = conn
            .prepare(
                "SELECT category, SUM(quantity) AS value FROM inventory_items
                 GROUP BY category ORDER BY value DESC, category ASC LIMIT 5",
            )
            .map_err(internal)?;
        let categories = stmt
            .query_map([], |row| {
                Ok(super::CategoryBreakdown {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        drop(stmt);
        drop(conn);

        let low_stock_items = self.low_stock()?;
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
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, name, category, quantity, min_stock_level, unit,
                        CASE WHEN quantity = 0 THEN 'critical' ELSE 'low' END AS status
                 FROM inventory_items
                 WHERE quantity <= min_stock_level
                 ORDER BY status ASC, quantity ASC",
            )
            .map_err(internal)?;

        let items = stmt
            .query_map([], |row| {
                Ok(LowStockItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    current_stock: row.get(3)?,
                    minimum_stock: row.get(4)?,
                    unit: row.get(5)?,
                    status: row.get(6)?,
                })
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(items)
    }
}
