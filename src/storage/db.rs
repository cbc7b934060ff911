use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::{AppError, AppResult};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Lifecycle of a registration request. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Lifecycle of an order. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Delivered,
    Cancelled,
}

/// An administrator allowed to open the panel via `/admin`.
#[derive(Debug)]
pub struct Admin {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: String,
}

/// A city scoping users, products and orders.
#[derive(Debug, Clone, Serialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub is_active: bool,
    #[serde(skip)]
    pub created_at: String,
}

/// A registered, admin-approved user.
#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub password_hash: String,
    pub city_id: i64,
    pub is_active: bool,
    pub created_at: String,
}

/// A registration request awaiting moderation.
#[derive(Debug)]
pub struct RegistrationRequest {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub password_hash: String,
    pub city_id: i64,
    pub status: RequestStatus,
    pub created_at: String,
}

/// A pending request as shown on the panel, with the city name resolved.
#[derive(Debug, Serialize)]
pub struct PendingRequest {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub city: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub flavor: Option<String>,
    pub purchase_price: f64,
    pub purchase_quantity: i64,
    pub sale_price: f64,
    pub sold_quantity: i64,
    pub avg_sale_price: f64,
    pub stock: i64,
    pub city_id: i64,
    pub created_at: String,
}

/// Fields for creating a product. `stock` is not here: it starts equal to
/// `purchase_quantity` and is adjusted through updates afterwards.
#[derive(Debug)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub flavor: Option<String>,
    pub purchase_price: f64,
    pub purchase_quantity: i64,
    pub sale_price: f64,
    pub sold_quantity: i64,
    pub avg_sale_price: f64,
    pub city_id: i64,
}

/// Partial product update: only supplied fields are written. Deserialized
/// straight from the PUT body; absent fields stay `None`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub flavor: Option<String>,
    pub purchase_price: Option<f64>,
    pub purchase_quantity: Option<i64>,
    pub sale_price: Option<f64>,
    pub sold_quantity: Option<i64>,
    pub avg_sale_price: Option<f64>,
    pub stock: Option<i64>,
    pub city_id: Option<i64>,
}

/// An active user listed as a courier candidate for a city.
#[derive(Debug, Serialize)]
pub struct Courier {
    pub id: i64,
    pub tg_id: i64,
    pub name: String,
}

#[derive(Debug)]
pub struct NewOrder {
    pub city_id: i64,
    pub courier_id: i64,
    pub receiver_id: i64,
    /// RFC 3339 timestamp
    pub delivery_time: String,
    pub address: String,
    /// Serialized product list, opaque to the store
    pub products: String,
}

/// An order row with city/courier/receiver names resolved by explicit joins.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub city: String,
    pub courier: String,
    pub receiver: String,
    pub delivery_time: String,
    pub address: String,
    pub products: serde_json::Value,
    pub status: OrderStatus,
    pub created_at: String,
}

/// Display name for a user: their Telegram username, or a fallback derived
/// from the Telegram id — the same derivation the registration flow uses.
pub fn display_name(tg_id: i64, username: Option<&str>) -> String {
    match username {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("user_{}", tg_id),
    }
}

/// Create a new database connection pool
///
/// Initializes a pool of up to 10 connections, turns on foreign-key
/// enforcement per connection, and runs schema migrations.
pub fn create_pool(database_path: &str) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;"));
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    super::migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped. Acquire one per
/// unit of work (bot update or HTTP request), never hold it across them.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

// ── admins ──────────────────────────────────────────────────────────

/// Look up an active admin by Telegram id.
pub fn get_active_admin(conn: &DbConnection, tg_id: i64) -> Result<Option<Admin>> {
    conn.query_row(
        "SELECT id, tg_id, username, email, password_hash, is_active, created_at
         FROM admins WHERE tg_id = ?1 AND is_active = 1",
        params![tg_id],
        |row| {
            Ok(Admin {
                id: row.get(0)?,
                tg_id: row.get(1)?,
                username: row.get(2)?,
                email: row.get(3)?,
                password_hash: row.get(4)?,
                is_active: row.get(5)?,
                created_at: row.get(6)?,
            })
        },
    )
    .optional()
}

/// Create an admin account. Used by the `create-admin` CLI command.
pub fn create_admin(
    conn: &DbConnection,
    tg_id: i64,
    username: Option<&str>,
    email: Option<&str>,
    password_hash: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO admins (tg_id, username, email, password_hash, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
        params![tg_id, username, email, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── cities ──────────────────────────────────────────────────────────

pub fn create_city(conn: &DbConnection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO cities (name, is_active) VALUES (?1, 1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Look up a city by exact name, active or not. Used by seeding to stay
/// idempotent.
pub fn get_city_by_name(conn: &DbConnection, name: &str) -> Result<Option<City>> {
    conn.query_row(
        "SELECT id, name, is_active, created_at FROM cities WHERE name = ?1",
        params![name],
        map_city,
    )
    .optional()
}

/// Look up an active city by exact name. This is what the registration
/// workflow matches the user's reply against.
pub fn get_active_city_by_name(conn: &DbConnection, name: &str) -> Result<Option<City>> {
    conn.query_row(
        "SELECT id, name, is_active, created_at FROM cities WHERE name = ?1 AND is_active = 1",
        params![name],
        map_city,
    )
    .optional()
}

pub fn get_active_cities(conn: &DbConnection) -> Result<Vec<City>> {
    let mut stmt =
        conn.prepare("SELECT id, name, is_active, created_at FROM cities WHERE is_active = 1 ORDER BY name")?;
    let rows = stmt.query_map([], map_city)?;
    rows.collect()
}

fn map_city(row: &rusqlite::Row<'_>) -> Result<City> {
    Ok(City {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ── users ───────────────────────────────────────────────────────────

/// Look up an active user by Telegram id. The registration entry guard.
pub fn get_active_user_by_tg_id(conn: &DbConnection, tg_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, tg_id, username, password_hash, city_id, is_active, created_at
         FROM users WHERE tg_id = ?1 AND is_active = 1",
        params![tg_id],
        map_user,
    )
    .optional()
}

/// Active users in a city, offered as courier candidates when assigning
/// an order.
pub fn list_city_couriers(conn: &DbConnection, city_id: i64) -> Result<Vec<Courier>> {
    let mut stmt = conn.prepare(
        "SELECT id, tg_id, username FROM users WHERE city_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![city_id], |row| {
        let tg_id: i64 = row.get(1)?;
        let username: Option<String> = row.get(2)?;
        Ok(Courier {
            id: row.get(0)?,
            tg_id,
            name: display_name(tg_id, username.as_deref()),
        })
    })?;
    rows.collect()
}

fn map_user(row: &rusqlite::Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        tg_id: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        city_id: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

// ── registration requests ───────────────────────────────────────────

/// Whether the identity already has a request awaiting moderation.
///
/// Read-then-write: two near-simultaneous registrations can both pass this
/// check and file two pending requests. There is deliberately no partial
/// unique index backing it up — see DESIGN.md.
pub fn has_pending_request(conn: &DbConnection, tg_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM registration_requests WHERE tg_id = ?1 AND status = 'pending'",
        params![tg_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn create_registration_request(
    conn: &DbConnection,
    tg_id: i64,
    username: Option<&str>,
    password_hash: &str,
    city_id: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO registration_requests (tg_id, username, password_hash, city_id, status)
         VALUES (?1, ?2, ?3, ?4, 'pending')",
        params![tg_id, username, password_hash, city_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_registration_request(conn: &DbConnection, id: i64) -> Result<Option<RegistrationRequest>> {
    conn.query_row(
        "SELECT id, tg_id, username, password_hash, city_id, status, created_at
         FROM registration_requests WHERE id = ?1",
        params![id],
        map_request,
    )
    .optional()
}

/// Pending requests, newest first, with the city name resolved.
pub fn list_pending_requests(conn: &DbConnection) -> Result<Vec<PendingRequest>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.tg_id, r.username, c.name, r.created_at
         FROM registration_requests r
         JOIN cities c ON c.id = r.city_id
         WHERE r.status = 'pending'
         ORDER BY r.created_at DESC, r.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PendingRequest {
            id: row.get(0)?,
            tg_id: row.get(1)?,
            username: row.get(2)?,
            city: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    rows.collect()
}

fn map_request(row: &rusqlite::Row<'_>) -> Result<RegistrationRequest> {
    let status: String = row.get(5)?;
    let status = status.parse::<RequestStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RegistrationRequest {
        id: row.get(0)?,
        tg_id: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        city_id: row.get(4)?,
        status,
        created_at: row.get(6)?,
    })
}

/// Approve a pending registration request.
///
/// Creates the User (credentials and city copied from the request) and
/// flips the request to `approved` in a single transaction — a partial
/// outcome is never observable. Returns the new user's id.
pub fn approve_registration_request(conn: &mut DbConnection, request_id: i64) -> AppResult<i64> {
    let tx = conn.transaction()?;

    let request = tx
        .query_row(
            "SELECT id, tg_id, username, password_hash, city_id, status, created_at
             FROM registration_requests WHERE id = ?1",
            params![request_id],
            map_request,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("registration request {}", request_id)))?;

    if request.status != RequestStatus::Pending {
        return Err(AppError::AlreadyProcessed);
    }

    tx.execute(
        "INSERT INTO users (tg_id, username, password_hash, city_id, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
        params![request.tg_id, request.username, request.password_hash, request.city_id],
    )?;
    let user_id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE registration_requests SET status = 'approved' WHERE id = ?1",
        params![request_id],
    )?;

    tx.commit()?;
    Ok(user_id)
}

/// Reject a pending registration request. No User is created.
pub fn reject_registration_request(conn: &mut DbConnection, request_id: i64) -> AppResult<()> {
    let tx = conn.transaction()?;

    let request = tx
        .query_row(
            "SELECT id, tg_id, username, password_hash, city_id, status, created_at
             FROM registration_requests WHERE id = ?1",
            params![request_id],
            map_request,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("registration request {}", request_id)))?;

    if request.status != RequestStatus::Pending {
        return Err(AppError::AlreadyProcessed);
    }

    tx.execute(
        "UPDATE registration_requests SET status = 'rejected' WHERE id = ?1",
        params![request_id],
    )?;

    tx.commit()?;
    Ok(())
}

// ── products ────────────────────────────────────────────────────────

/// Create a product. Initial stock equals the purchase quantity; after
/// that the two fields live independent lives (sales adjust stock through
/// updates, not through any derived rule).
pub fn create_product(conn: &DbConnection, new: &NewProduct) -> Result<i64> {
    conn.execute(
        "INSERT INTO products (code, name, flavor, purchase_price, purchase_quantity,
                               sale_price, sold_quantity, avg_sale_price, stock, city_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?5, ?9)",
        params![
            new.code,
            new.name,
            new.flavor,
            new.purchase_price,
            new.purchase_quantity,
            new.sale_price,
            new.sold_quantity,
            new.avg_sale_price,
            new.city_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_product(conn: &DbConnection, id: i64) -> Result<Option<Product>> {
    conn.query_row(
        "SELECT id, code, name, flavor, purchase_price, purchase_quantity, sale_price,
                sold_quantity, avg_sale_price, stock, city_id, created_at
         FROM products WHERE id = ?1",
        params![id],
        map_product,
    )
    .optional()
}

/// Products in a city, optionally filtered by a case-insensitive substring
/// match against name or code.
pub fn list_city_products(conn: &DbConnection, city_id: i64, search: Option<&str>) -> Result<Vec<Product>> {
    let search = search.unwrap_or("");
    let mut stmt = conn.prepare(
        "SELECT id, code, name, flavor, purchase_price, purchase_quantity, sale_price,
                sold_quantity, avg_sale_price, stock, city_id, created_at
         FROM products
         WHERE city_id = ?1
           AND (?2 = '' OR LOWER(name) LIKE '%' || LOWER(?2) || '%'
                        OR LOWER(code) LIKE '%' || LOWER(?2) || '%')
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![city_id, search], map_product)?;
    rows.collect()
}

/// Apply a partial update to a product: only the supplied fields change.
///
/// Fails with `NotFound` when the id does not resolve. An empty patch on
/// an existing product is a no-op success.
pub fn update_product(conn: &DbConnection, id: i64, patch: &ProductPatch) -> AppResult<()> {
    let exists: bool = conn
        .query_row("SELECT 1 FROM products WHERE id = ?1", params![id], |_| Ok(true))
        .optional()?
        .unwrap_or(false);
    if !exists {
        return Err(AppError::NotFound(format!("product {}", id)));
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

    if let Some(ref v) = patch.code {
        sets.push("code = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.name {
        sets.push("name = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.flavor {
        sets.push("flavor = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.purchase_price {
        sets.push("purchase_price = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.purchase_quantity {
        sets.push("purchase_quantity = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.sale_price {
        sets.push("sale_price = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.sold_quantity {
        sets.push("sold_quantity = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.avg_sale_price {
        sets.push("avg_sale_price = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.stock {
        sets.push("stock = ?");
        values.push(v);
    }
    if let Some(ref v) = patch.city_id {
        sets.push("city_id = ?");
        values.push(v);
    }

    if sets.is_empty() {
        return Ok(());
    }

    values.push(&id);
    let sql = format!("UPDATE products SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, values.as_slice())?;
    Ok(())
}

/// Delete a product. Deleting a missing id is a no-op, not an error.
pub fn delete_product(conn: &DbConnection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    Ok(())
}

fn map_product(row: &rusqlite::Row<'_>) -> Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        flavor: row.get(3)?,
        purchase_price: row.get(4)?,
        purchase_quantity: row.get(5)?,
        sale_price: row.get(6)?,
        sold_quantity: row.get(7)?,
        avg_sale_price: row.get(8)?,
        stock: row.get(9)?,
        city_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}

// ── orders ──────────────────────────────────────────────────────────

pub fn create_order(conn: &DbConnection, new: &NewOrder) -> Result<i64> {
    conn.execute(
        "INSERT INTO orders (city_id, courier_id, receiver_id, delivery_time, address, products, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')",
        params![
            new.city_id,
            new.courier_id,
            new.receiver_id,
            new.delivery_time,
            new.address,
            new.products,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Orders newest first, optionally filtered by city. City, courier and
/// receiver names come from explicit joins; the serialized product list is
/// parsed back into JSON for the response.
pub fn list_orders(conn: &DbConnection, city_id: Option<i64>) -> Result<Vec<OrderSummary>> {
    let sql = "SELECT o.id, c.name, cu.tg_id, cu.username, ru.tg_id, ru.username,
                      o.delivery_time, o.address, o.products, o.status, o.created_at
               FROM orders o
               JOIN cities c ON c.id = o.city_id
               JOIN users cu ON cu.id = o.courier_id
               JOIN users ru ON ru.id = o.receiver_id
               WHERE ?1 IS NULL OR o.city_id = ?1
               ORDER BY o.created_at DESC, o.id DESC";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![city_id], |row| {
        let courier_tg_id: i64 = row.get(2)?;
        let courier_username: Option<String> = row.get(3)?;
        let receiver_tg_id: i64 = row.get(4)?;
        let receiver_username: Option<String> = row.get(5)?;
        let products_json: String = row.get(8)?;
        let status: String = row.get(9)?;
        let status = status.parse::<OrderStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(OrderSummary {
            id: row.get(0)?,
            city: row.get(1)?,
            courier: display_name(courier_tg_id, courier_username.as_deref()),
            receiver: display_name(receiver_tg_id, receiver_username.as_deref()),
            delivery_time: row.get(6)?,
            address: row.get(7)?,
            products: serde_json::from_str(&products_json).unwrap_or_default(),
            status,
            created_at: row.get(10)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_city_name_is_unique() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        create_city(&conn, "Dresden").unwrap();
        assert!(create_city(&conn, "Dresden").is_err());
    }

    #[test]
    fn test_active_city_lookup_is_exact() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        create_city(&conn, "Dresden").unwrap();

        assert!(get_active_city_by_name(&conn, "Dresden").unwrap().is_some());
        assert!(get_active_city_by_name(&conn, "dresden").unwrap().is_none());
        assert!(get_active_city_by_name(&conn, "Dres").unwrap().is_none());
    }

    #[test]
    fn test_inactive_city_not_offered() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let id = create_city(&conn, "Hamburg").unwrap();
        conn.execute("UPDATE cities SET is_active = 0 WHERE id = ?1", params![id])
            .unwrap();

        assert!(get_active_cities(&conn).unwrap().is_empty());
        assert!(get_active_city_by_name(&conn, "Hamburg").unwrap().is_none());
        // but seeding still sees it
        assert!(get_city_by_name(&conn, "Hamburg").unwrap().is_some());
    }

    #[test]
    fn test_pending_request_guard() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let city_id = create_city(&conn, "Berlin").unwrap();

        assert!(!has_pending_request(&conn, 100).unwrap());
        create_registration_request(&conn, 100, Some("alice"), "hash", city_id).unwrap();
        assert!(has_pending_request(&conn, 100).unwrap());
        assert!(!has_pending_request(&conn, 101).unwrap());
    }

    #[test]
    fn test_rejected_request_allows_retry() {
        let (_dir, pool) = test_pool();
        let mut conn = get_connection(&pool).unwrap();
        let city_id = create_city(&conn, "Berlin").unwrap();

        let first = create_registration_request(&conn, 100, Some("alice"), "hash", city_id).unwrap();
        reject_registration_request(&mut conn, first).unwrap();
        assert!(!has_pending_request(&conn, 100).unwrap());

        // same identity can file again
        create_registration_request(&conn, 100, Some("alice"), "hash2", city_id).unwrap();
        assert!(has_pending_request(&conn, 100).unwrap());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let err = create_registration_request(&conn, 100, None, "hash", 9999);
        assert!(err.is_err(), "request with dangling city reference must fail");
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name(7, Some("alice")), "alice");
        assert_eq!(display_name(7, None), "user_7");
        assert_eq!(display_name(7, Some("")), "user_7");
    }

    #[test]
    fn test_product_search_matches_name_and_code() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let city_id = create_city(&conn, "Dresden").unwrap();

        for (code, name) in [("003", "Elfliq"), ("005", "Elfliq"), ("007", "Lost Mary")] {
            create_product(
                &conn,
                &NewProduct {
                    code: code.to_string(),
                    name: name.to_string(),
                    flavor: None,
                    purchase_price: 4.0,
                    purchase_quantity: 10,
                    sale_price: 10.0,
                    sold_quantity: 0,
                    avg_sale_price: 0.0,
                    city_id,
                },
            )
            .unwrap();
        }

        assert_eq!(list_city_products(&conn, city_id, None).unwrap().len(), 3);
        assert_eq!(list_city_products(&conn, city_id, Some("elf")).unwrap().len(), 2);
        assert_eq!(list_city_products(&conn, city_id, Some("MARY")).unwrap().len(), 1);
        assert_eq!(list_city_products(&conn, city_id, Some("007")).unwrap().len(), 1);
        assert_eq!(list_city_products(&conn, city_id, Some("nope")).unwrap().len(), 0);
    }

    #[test]
    fn test_create_product_sets_stock_from_purchase_quantity() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let city_id = create_city(&conn, "Dresden").unwrap();

        let id = create_product(
            &conn,
            &NewProduct {
                code: "003".to_string(),
                name: "Elfliq".to_string(),
                flavor: Some("Grape".to_string()),
                purchase_price: 4.0,
                purchase_quantity: 15,
                sale_price: 10.0,
                sold_quantity: 0,
                avg_sale_price: 0.0,
                city_id,
            },
        )
        .unwrap();

        let product = get_product(&conn, id).unwrap().unwrap();
        assert_eq!(product.stock, 15);
        assert_eq!(product.flavor.as_deref(), Some("Grape"));
    }

    #[test]
    fn test_delete_product_is_idempotent() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        delete_product(&conn, 12345).unwrap();
    }
}
