//! Integration tests for inventory item CRUD and filtering

mod common;

use axum_test::TestServer;
use common::create_test_server;
use serde_json::{json, Value};

async fn add_item(server: &TestServer, body: Value) -> i64 {
    let response = server.post("/inventory/items").json(&body).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["id"].as_i64().expect("No id in response")
}

#[tokio::test]
async fn test_add_item_applies_defaults() {
    let (server, _store, _mailer) = create_test_server();

    let id = add_item(
        &server,
        json!({
            "name": "Rebar",
            "category": "Steel",
            "quantity": 200,
            "unit": "Pieces",
        }),
    )
    .await;

    let response = server.get(&format!("/inventory/items/{id}")).await;
    assert_eq!(response.status_code(), 200);
    let item: Value = response.json();
    assert_eq!(item["name"], "Rebar");
    assert_eq!(item["quantity"], 200);
    assert_eq!(item["min_stock_level"], 5);
    assert_eq!(item["location"], "Main Warehouse");
    assert_eq!(item["supplier"], "Default Supplier");
    assert_eq!(item["cost"], 0.0);
    assert_eq!(item["description"], "");
}

#[tokio::test]
async fn test_add_item_missing_fields_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/inventory/items")
        .json(&json!({ "name": "Rebar", "quantity": 200 }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_list_items_filters() {
    let (server, _store, _mailer) = create_test_server();

    add_item(
        &server,
        json!({
            "name": "Rebar",
            "category": "Steel",
            "quantity": 200,
            "unit": "Pieces",
            "location": "Main Warehouse",
        }),
    )
    .await;
    add_item(
        &server,
        json!({
            "name": "Cement",
            "category": "Materials",
            "quantity": 3,
            "unit": "Bags",
            "minStockLevel": 10,
            "location": "Site B",
        }),
    )
    .await;
    add_item(
        &server,
        json!({
            "name": "Gravel",
            "category": "Materials",
            "quantity": 0,
            "unit": "Tons",
            "location": "Site B",
        }),
    )
    .await;

    let response = server.get("/inventory/items?category=Materials").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 2);

    let response = server.get("/inventory/items?location=Site+B").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 2);

    // Derived stock status: low = above zero but at/below minimum
    let response = server.get("/inventory/items?status=low").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "Cement");

    let response = server.get("/inventory/items?status=out").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "Gravel");

    let response = server.get("/inventory/items?status=in").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "Rebar");

    let response = server.get("/inventory/items?search=reb").await;
    let items: Value = response.json();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "Rebar");
}

#[tokio::test]
async fn test_get_unknown_item_returns_404() {
    let (server, _store, _mailer) = create_test_server();

    let response = server.get("/inventory/items/999").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_update_item_replaces_fields() {
    let (server, _store, _mailer) = create_test_server();

    let id = add_item(
        &server,
        json!({
            "name": "Rebar",
            "category": "Steel",
            "quantity": 200,
            "unit": "Pieces",
        }),
    )
    .await;

    let response = server
        .put(&format!("/inventory/items/{id}"))
        .json(&json!({
            "name": "Rebar 12mm",
            "category": "Steel",
            "quantity": 150,
            "unit": "Pieces",
            "minStockLevel": 20,
            "cost": 4.2,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server.get(&format!("/inventory/items/{id}")).await;
    let item: Value = response.json();
    assert_eq!(item["name"], "Rebar 12mm");
    assert_eq!(item["quantity"], 150);
    assert_eq!(item["min_stock_level"], 20);
    assert_eq!(item["cost"], 4.2);
}

#[tokio::test]
async fn test_update_unknown_item_returns_404() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .put("/inventory/items/999")
        .json(&json!({
            "name": "Rebar",
            "category": "Steel",
            "quantity": 1,
            "unit": "Pieces",
        }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_delete_item() {
    let (server, _store, _mailer) = create_test_server();

    let id = add_item(
        &server,
        json!({
            "name": "Rebar",
            "category": "Steel",
            "quantity": 200,
            "unit": "Pieces",
        }),
    )
    .await;

    let response = server.delete(&format!("/inventory/items/{id}")).await;
    assert_eq!(response.status_code(), 200);

    let response = server.get(&format!("/inventory/items/{id}")).await;
    assert_eq!(response.status_code(), 404);

    let response = server.delete(&format!("/inventory/items/{id}")).await;
    assert_eq!(response.status_code(), 404);
}
