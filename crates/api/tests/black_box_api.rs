use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use stockroom_api::app::{self, AppServices};
use stockroom_auth::{JwtClaims, Role, UserId};
use stockroom_infra::{AdjusterConfig, InMemoryInventoryStore};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryInventoryStore>,
    refs: Value,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryInventoryStore::new());
        let category = store.add_category("Baking").unwrap();
        let brand = store.add_brand("Acme").unwrap();
        let location = store.add_location("Aisle 1").unwrap();
        let refs = json!({
            "category_id": category.id,
            "brand_id": brand.id,
            "location_id": location.id,
        });

        // Same router as prod, wired to an in-memory store and an ephemeral port.
        let services = Arc::new(AppServices::new(store.clone(), AdjusterConfig::default()));
        let app = app::router(JWT_SECRET, Duration::from_secs(10), services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            refs,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn item_body(&self, name: &str, ref_num: &str, qty: i64) -> Value {
        let mut body = json!({
            "ref_num": ref_num,
            "name": name,
            "qty_in_stock": qty,
            "unit": "kg",
        });
        for key in ["category_id", "brand_id", "location_id"] {
            body[key] = self.refs[key].clone();
        }
        body
    }

    async fn create_item(&self, client: &reqwest::Client, token: &str, body: Value) -> Value {
        let res = client
            .post(self.url("/inventory/items"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token() -> String {
    mint_jwt(UserId::new(), vec![Role::new("staff")])
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/inventory/items"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        roles: vec![],
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"other-secret"),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_user_and_roles() {
    let srv = TestServer::spawn().await;
    let user_id = UserId::new();
    let token = mint_jwt(user_id, vec![Role::new("admin")]);

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn usage_decrements_stock_and_logs_record() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let user_id = UserId::new();
    let token = mint_jwt(user_id, vec![]);

    let item = srv
        .create_item(&client, &token, srv.item_body("Flour", "FL-01", 100))
        .await;
    let id = item["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/inventory/items/{id}/usage")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 30, "date": "2024-01-15", "period": "daily" }))
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::OK {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 200 OK from usage, got {status} body={body}");
    }

    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["item"]["qty_in_stock"], 70);
    assert_eq!(receipt["record"]["item_id"], id.as_str());
    assert_eq!(receipt["record"]["qty_change"], -30);
    assert_eq!(receipt["record"]["update_type"], "shipped");
    assert_eq!(receipt["record"]["update_date"], "2024-01-15");
    assert_eq!(receipt["record"]["remarks"], "Daily usage update");
    assert_eq!(receipt["record"]["recorded_by"], user_id.to_string());
    assert_eq!(receipt["record_attempts"], 1);

    let res = client
        .get(srv.url(&format!("/inventory/items/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["qty_in_stock"], 70);

    let item_id = id.parse().unwrap();
    assert_eq!(srv.store.usage_records_for(item_id).unwrap().len(), 1);
}

#[tokio::test]
async fn usage_above_stock_is_rejected_without_writes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let item = srv
        .create_item(&client, &token, srv.item_body("Yeast", "YE-01", 5))
        .await;
    let id = item["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/inventory/items/{id}/usage")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 10, "date": "2024-01-15", "period": "weekly" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let item_id = id.parse().unwrap();
    assert!(srv.store.usage_records_for(item_id).unwrap().is_empty());
    let res = client
        .get(srv.url(&format!("/inventory/items/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["qty_in_stock"], 5);
}

#[tokio::test]
async fn stale_expected_qty_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let item = srv
        .create_item(&client, &token, srv.item_body("Salt", "SA-01", 40))
        .await;
    let id = item["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/inventory/items/{id}/usage")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 1, "period": "monthly", "expected_qty": 39 }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn usage_on_unknown_item_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();
    let missing = stockroom_inventory::ItemId::new();

    let res = client
        .post(srv.url(&format!("/inventory/items/{missing}/usage")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/inventory/items/not-a-uuid/usage"))
        .bearer_auth(&token)
        .json(&json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_filters_sorts_and_paginates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    for (name, ref_num, qty) in [
        ("Wheat flour", "FL-01", 10),
        ("Rye flour", "FL-02", 30),
        ("Sugar", "SG-01", 20),
    ] {
        srv.create_item(&client, &token, srv.item_body(name, ref_num, qty))
            .await;
    }

    let res = client
        .get(srv.url("/inventory/items?search=FLOUR&sort=qty_in_stock&direction=desc"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 2);
    let names: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Rye flour", "Wheat flour"]);

    let res = client
        .get(srv.url("/inventory/items?search=sg-&page=0&page_size=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Sugar");

    let res = client
        .get(srv.url("/inventory/items?sort=price"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn editing_an_item_replaces_its_fields() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let item = srv
        .create_item(&client, &token, srv.item_body("Cocoa", "CO-01", 8))
        .await;
    let id = item["id"].as_str().unwrap().to_string();

    let mut edit = srv.item_body("Cocoa powder", "CO-01", 12);
    edit["lot_num"] = json!("   ");
    edit["expiry_date"] = json!("2025-06-30");
    let res = client
        .put(srv.url(&format!("/inventory/items/{id}")))
        .bearer_auth(&token)
        .json(&edit)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Cocoa powder");
    assert_eq!(updated["qty_in_stock"], 12);
    assert_eq!(updated["lot_num"], Value::Null);
    assert_eq!(updated["expiry_date"], "2025-06-30");

    let mut invalid = srv.item_body("", "CO-01", 12);
    invalid["name"] = json!("  ");
    let res = client
        .put(srv.url(&format!("/inventory/items/{id}")))
        .bearer_auth(&token)
        .json(&invalid)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn creating_an_item_with_unknown_reference_fails() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let mut body = srv.item_body("Ghost", "GH-01", 1);
    body["brand_id"] = json!(stockroom_inventory::BrandId::new());

    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn reference_data_is_listed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    for (path, name) in [
        ("/inventory/categories", "Baking"),
        ("/inventory/brands", "Acme"),
        ("/inventory/locations", "Aisle 1"),
    ] {
        let res = client.get(srv.url(path)).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let rows: Value = res.json().await.unwrap();
        assert_eq!(rows[0]["name"], name);
    }
}

#[tokio::test]
async fn receiving_an_order_adds_its_quantity_once() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let item = srv
        .create_item(&client, &token, srv.item_body("Oats", "OA-01", 12))
        .await;
    let item_id = item["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": item_id, "qty_ordered": 40, "order_placed_date": "2024-02-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["order_received_date"], Value::Null);
    let order_id = order["id"].as_str().unwrap().to_string();

    let res = client.get(srv.url("/orders")).bearer_auth(&token).send().await.unwrap();
    let orders: Value = res.json().await.unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let receive = srv.url(&format!("/orders/{order_id}/receive"));
    let res = client
        .post(&receive)
        .bearer_auth(&token)
        .json(&json!({ "received_date": "2024-02-05" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["order"]["status"], "received");
    assert_eq!(receipt["order"]["order_received_date"], "2024-02-05");
    assert_eq!(receipt["item"]["qty_in_stock"], 52);
    assert_eq!(receipt["record"]["qty_change"], 40);
    assert_eq!(receipt["record"]["update_type"], "received");

    let res = client.post(&receive).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let records = srv.store.usage_records_for(item_id.parse().unwrap()).unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn invalid_orders_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let item = srv
        .create_item(&client, &token, srv.item_body("Tea", "TE-01", 3))
        .await;

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": item["id"], "qty_ordered": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": stockroom_inventory::ItemId::new(), "qty_ordered": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = stockroom_inventory::OrderId::new();
    let res = client
        .post(srv.url(&format!("/orders/{missing}/receive")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "order not found");
}

#[tokio::test]
async fn dashboard_lists_low_stock_and_expiring_items() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = token();

    let soon = (Utc::now() + ChronoDuration::days(3)).date_naive();
    let mut milk = srv.item_body("Milk", "MI-01", 50);
    milk["expiry_date"] = json!(soon);
    srv.create_item(&client, &token, milk).await;
    srv.create_item(&client, &token, srv.item_body("Salt", "SA-01", 0)).await;
    srv.create_item(&client, &token, srv.item_body("Rice", "RI-01", 4)).await;

    let res = client
        .get(srv.url("/dashboard?low_stock_threshold=5"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["summary"]["item_count"], 3);
    assert_eq!(body["summary"]["total_units"], 54);
    assert_eq!(body["summary"]["out_of_stock"], 1);
    let low: Vec<&str> = body["low_stock"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(low, vec!["Salt", "Rice"]);
    assert_eq!(body["expiring"].as_array().unwrap().len(), 1);
    assert_eq!(body["expiring"][0]["name"], "Milk");

    let res = client
        .get(srv.url("/dashboard?limit=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
