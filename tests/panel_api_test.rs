//! Integration tests for the panel: token gate, moderation endpoints and
//! catalog/order API, driving the axum handlers directly.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;

use lavka::auth::issue_admin_token;
use lavka::config::AppConfig;
use lavka::panel::api::{self, CreateOrderPayload, CreateProductPayload, OrdersQuery, ProductsQuery};
use lavka::panel::auth::TokenQuery;
use lavka::panel::{pages, PanelState};
use lavka::storage::db::{self, ProductPatch};
use lavka::storage::{create_pool, get_connection};

const SECRET: &str = "integration-test-secret";

fn make_state() -> (TempDir, PanelState) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("panel.sqlite");
    let db = Arc::new(create_pool(path.to_str().unwrap()).unwrap());

    let config = Arc::new(AppConfig {
        bot_token: SecretString::from("12345:test-token"),
        database_path: path.to_str().unwrap().to_string(),
        panel_base_url: "http://127.0.0.1:8080/".to_string(),
        panel_host: "127.0.0.1".parse().unwrap(),
        panel_port: 8080,
        token_secret: SecretString::from(SECRET),
        token_expires_min: 120,
    });

    (dir, PanelState { db, config })
}

fn admin_token() -> Option<String> {
    Some(issue_admin_token(1, SECRET, 120).unwrap())
}

fn token_query() -> Query<TokenQuery> {
    Query(TokenQuery { token: admin_token() })
}

fn seed_request(state: &PanelState) -> i64 {
    let conn = get_connection(&state.db).unwrap();
    let city_id = db::create_city(&conn, "Dresden").unwrap();
    db::create_registration_request(&conn, 500, Some("alice"), "phc-hash", city_id).unwrap()
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let (_dir, state) = make_state();
    let id = seed_request(&state);

    for token in [None, Some("garbage".to_string()), Some(issue_admin_token(1, "other-secret", 120).unwrap())] {
        let response = api::approve_request(
            State(state.clone()),
            Path(id),
            Query(TokenQuery { token: token.clone() }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {:?}", token);

        let response = api::list_cities(State(state.clone()), Query(TokenQuery { token }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // nothing was approved while unauthenticated
    let conn = get_connection(&state.db).unwrap();
    assert_eq!(db::list_pending_requests(&conn).unwrap().len(), 1);
}

#[tokio::test]
async fn expired_token_is_401() {
    let (_dir, state) = make_state();
    let expired = issue_admin_token(1, SECRET, -5).unwrap();

    let response = api::list_cities(State(state.clone()), Query(TokenQuery { token: Some(expired) }))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn approve_and_reject_moderation() {
    let (_dir, state) = make_state();
    let id = seed_request(&state);

    let Json(body) = api::approve_request(State(state.clone()), Path(id), token_query())
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    // approved: the user exists now
    let conn = get_connection(&state.db).unwrap();
    assert!(db::get_active_user_by_tg_id(&conn, 500).unwrap().is_some());
    drop(conn);

    // double approve → 400
    let response = api::approve_request(State(state.clone()), Path(id), token_query())
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // unknown id → 404
    let response = api::reject_request(State(state.clone()), Path(777), token_query())
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_crud_roundtrip() {
    let (_dir, state) = make_state();
    let conn = get_connection(&state.db).unwrap();
    let city_id = db::create_city(&conn, "Dresden").unwrap();
    drop(conn);

    let Json(created) = api::create_product(
        State(state.clone()),
        token_query(),
        Json(CreateProductPayload {
            code: "003".to_string(),
            name: "Elfliq".to_string(),
            flavor: Some("Grape".to_string()),
            purchase_price: 4.0,
            purchase_quantity: 10,
            sale_price: 10.0,
            sold_quantity: 0,
            avg_sale_price: 0.0,
            city_id,
        }),
    )
    .await
    .unwrap();
    let id = created["id"].as_i64().unwrap();

    // stock was initialized from purchase_quantity
    let Json(products) = api::list_city_products(
        State(state.clone()),
        Path(city_id),
        Query(ProductsQuery {
            token: admin_token(),
            search: Some("elf".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(products.as_array().unwrap().len(), 1);
    assert_eq!(products[0]["stock"], 10);

    api::update_product(
        State(state.clone()),
        Path(id),
        token_query(),
        Json(ProductPatch {
            stock: Some(5),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let response = api::update_product(
        State(state.clone()),
        Path(9999),
        token_query(),
        Json(ProductPatch::default()),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // delete twice: both succeed
    api::delete_product(State(state.clone()), Path(id), token_query()).await.unwrap();
    api::delete_product(State(state.clone()), Path(id), token_query()).await.unwrap();

    let Json(products) = api::list_city_products(
        State(state.clone()),
        Path(city_id),
        Query(ProductsQuery {
            token: admin_token(),
            search: None,
        }),
    )
    .await
    .unwrap();
    assert!(products.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_create_and_list() {
    let (_dir, state) = make_state();

    // a city and two approved users
    let city_id = {
        let mut conn = get_connection(&state.db).unwrap();
        let city_id = db::create_city(&conn, "Dresden").unwrap();
        for (tg_id, username) in [(10, Some("joe")), (11, None)] {
            let request = db::create_registration_request(&conn, tg_id, username, "hash", city_id).unwrap();
            db::approve_registration_request(&mut conn, request).unwrap();
        }
        city_id
    };

    let conn = get_connection(&state.db).unwrap();
    let couriers = db::list_city_couriers(&conn, city_id).unwrap();
    drop(conn);

    // malformed delivery_time → 400
    let response = api::create_order(
        State(state.clone()),
        token_query(),
        Json(CreateOrderPayload {
            city_id,
            courier_id: couriers[0].id,
            receiver_id: couriers[1].id,
            delivery_time: "next tuesday".to_string(),
            address: "Hauptstr. 1".to_string(),
            products: json!([{"code": "003", "qty": 2}]),
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let Json(created) = api::create_order(
        State(state.clone()),
        token_query(),
        Json(CreateOrderPayload {
            city_id,
            courier_id: couriers[0].id,
            receiver_id: couriers[1].id,
            delivery_time: "2026-08-06T18:30".to_string(),
            address: "Hauptstr. 1".to_string(),
            products: json!([{"code": "003", "qty": 2}]),
        }),
    )
    .await
    .unwrap();
    assert_eq!(created["status"], "ok");

    let Json(orders) = api::list_orders(
        State(state.clone()),
        Query(OrdersQuery {
            token: admin_token(),
            city_id: Some(city_id),
        }),
    )
    .await
    .unwrap();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["city"], "Dresden");
    assert_eq!(orders[0]["courier"], "joe");
    assert_eq!(orders[0]["receiver"], "user_11");
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["delivery_time"], "2026-08-06T18:30:00Z");
    assert_eq!(orders[0]["products"][0]["qty"], 2);

    // filtering by another city returns nothing
    let Json(orders) = api::list_orders(
        State(state.clone()),
        Query(OrdersQuery {
            token: admin_token(),
            city_id: Some(city_id + 1),
        }),
    )
    .await
    .unwrap();
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_page_lists_pending_requests() {
    let (_dir, state) = make_state();
    seed_request(&state);

    let html = pages::index(State(state.clone()), token_query()).await.unwrap();
    assert!(html.0.contains("@alice"));
    assert!(html.0.contains("Dresden"));

    let response = pages::index(State(state), Query(TokenQuery { token: None }))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
