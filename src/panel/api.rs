//! JSON API endpoints behind the admin-token check

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{AppError, AppResult};
use crate::storage::db::{self, NewOrder, NewProduct, ProductPatch};
use crate::storage::get_connection;

use super::auth::{require_admin, TokenQuery};
use super::server::PanelState;

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub token: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub token: Option<String>,
    pub city_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductPayload {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub flavor: Option<String>,
    pub purchase_price: f64,
    pub purchase_quantity: i64,
    pub sale_price: f64,
    #[serde(default)]
    pub sold_quantity: i64,
    #[serde(default)]
    pub avg_sale_price: f64,
    pub city_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub city_id: i64,
    pub courier_id: i64,
    pub receiver_id: i64,
    /// ISO-8601 date-time text
    pub delivery_time: String,
    pub address: String,
    /// Product list, stored serialized as-is
    pub products: Value,
}

/// POST /api/registration-requests/{id}/approve
pub async fn approve_request(
    State(state): State<PanelState>,
    Path(id): Path<i64>,
    Query(q): Query<TokenQuery>,
) -> AppResult<Json<Value>> {
    let admin = require_admin(&state, q.token.as_deref())?;
    let mut conn = get_connection(&state.db)?;
    let user_id = db::approve_registration_request(&mut conn, id)?;

    log::info!("Admin {} approved registration request {} -> user {}", admin, id, user_id);
    Ok(Json(json!({
        "status": "ok",
        "message": format!("Request {} approved", id),
    })))
}

/// POST /api/registration-requests/{id}/reject
pub async fn reject_request(
    State(state): State<PanelState>,
    Path(id): Path<i64>,
    Query(q): Query<TokenQuery>,
) -> AppResult<Json<Value>> {
    let admin = require_admin(&state, q.token.as_deref())?;
    let mut conn = get_connection(&state.db)?;
    db::reject_registration_request(&mut conn, id)?;

    log::info!("Admin {} rejected registration request {}", admin, id);
    Ok(Json(json!({
        "status": "ok",
        "message": format!("Request {} rejected", id),
    })))
}

/// GET /api/cities — active cities as a {id, name} list
pub async fn list_cities(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let cities = db::get_active_cities(&conn)?;
    Ok(Json(json!(cities)))
}

/// GET /api/cities/{id}/products?search=
pub async fn list_city_products(
    State(state): State<PanelState>,
    Path(city_id): Path<i64>,
    Query(q): Query<ProductsQuery>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let products = db::list_city_products(&conn, city_id, q.search.as_deref())?;
    Ok(Json(json!(products)))
}

/// GET /api/cities/{id}/couriers — active users in the city
pub async fn list_city_couriers(
    State(state): State<PanelState>,
    Path(city_id): Path<i64>,
    Query(q): Query<TokenQuery>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let couriers = db::list_city_couriers(&conn, city_id)?;
    Ok(Json(json!(couriers)))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<PanelState>,
    Query(q): Query<TokenQuery>,
    Json(payload): Json<CreateProductPayload>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let id = db::create_product(
        &conn,
        &NewProduct {
            code: payload.code,
            name: payload.name,
            flavor: payload.flavor,
            purchase_price: payload.purchase_price,
            purchase_quantity: payload.purchase_quantity,
            sale_price: payload.sale_price,
            sold_quantity: payload.sold_quantity,
            avg_sale_price: payload.avg_sale_price,
            city_id: payload.city_id,
        },
    )?;

    Ok(Json(json!({
        "status": "ok",
        "message": "Product created",
        "id": id,
    })))
}

/// PUT /api/products/{id} — applies only the supplied fields
pub async fn update_product(
    State(state): State<PanelState>,
    Path(id): Path<i64>,
    Query(q): Query<TokenQuery>,
    Json(patch): Json<ProductPatch>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    db::update_product(&conn, id, &patch)?;

    Ok(Json(json!({
        "status": "ok",
        "message": format!("Product {} updated", id),
    })))
}

/// DELETE /api/products/{id} — deleting a missing product is a success
pub async fn delete_product(
    State(state): State<PanelState>,
    Path(id): Path<i64>,
    Query(q): Query<TokenQuery>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    db::delete_product(&conn, id)?;

    Ok(Json(json!({
        "status": "ok",
        "message": format!("Product {} deleted", id),
    })))
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<PanelState>,
    Query(q): Query<TokenQuery>,
    Json(payload): Json<CreateOrderPayload>,
) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let delivery_time = parse_delivery_time(&payload.delivery_time)?;

    let conn = get_connection(&state.db)?;
    let id = db::create_order(
        &conn,
        &NewOrder {
            city_id: payload.city_id,
            courier_id: payload.courier_id,
            receiver_id: payload.receiver_id,
            delivery_time,
            address: payload.address,
            products: payload.products.to_string(),
        },
    )?;

    Ok(Json(json!({
        "status": "ok",
        "message": "Order created",
        "id": id,
    })))
}

/// GET /api/orders?city_id= — newest first, optionally filtered by city
pub async fn list_orders(State(state): State<PanelState>, Query(q): Query<OrdersQuery>) -> AppResult<Json<Value>> {
    require_admin(&state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let orders = db::list_orders(&conn, q.city_id)?;
    Ok(Json(json!(orders)))
}

/// Parse an ISO-8601 date-time into a normalized UTC RFC 3339 string.
///
/// Accepts a full RFC 3339 timestamp or the offset-less forms that HTML
/// `datetime-local` inputs produce (`YYYY-MM-DDTHH:MM[:SS]`, taken as UTC).
fn parse_delivery_time(input: &str) -> AppResult<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive).to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }

    Err(AppError::Validation(format!("invalid delivery_time: {}", input)))
}
