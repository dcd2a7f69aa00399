use std::time::Duration;

use cargohub_core::TenantId;
use cargohub_infra::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = cargohub_api::app::build_app(AppConfig::default())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Api {
    client: reqwest::Client,
    base_url: String,
    tenant: TenantId,
}

impl Api {
    fn new(srv: &TestServer, tenant: TenantId) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: srv.base_url.clone(),
            tenant,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-Tenant-Id", self.tenant.to_string())
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(format!("{}{}", self.base_url, path))
            .header("X-Tenant-Id", self.tenant.to_string())
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Tenant-Id", self.tenant.to_string())
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Poll until `accept` holds. Queries read eventually consistent projections.
    async fn get_eventually(&self, path: &str, accept: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..100 {
            let (status, body) = self.get(path).await;
            if status == StatusCode::OK && accept(&body) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{path} did not reach the expected state within timeout");
    }

    async fn create(&self, path: &str, body: Value) -> String {
        let (status, body) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {path}: {body}");
        let id = body["id"].as_str().unwrap().to_string();
        self.get_eventually(&format!("{path}/{id}"), |_| true).await;
        id
    }
}

fn address(city: &str) -> Value {
    json!({ "line1": "Keizersgracht 1", "city": city, "postal_code": "1015 CJ", "country": "nl" })
}

async fn customer(api: &Api) -> String {
    api.create(
        "/customers",
        json!({ "name": "Lotte de Vries", "email": "lotte@example.nl", "address": address("Amsterdam") }),
    )
    .await
}

async fn warehouse(api: &Api, code: &str, city: &str) -> String {
    api.create(
        "/warehouses",
        json!({ "code": code, "name": format!("{city} hub"), "address": address(city), "capacity": 500 }),
    )
    .await
}

async fn shipment(api: &Api, customer_id: &str, origin: &str, destination: &str) -> String {
    api.create(
        "/shipments",
        json!({
            "customer_id": customer_id,
            "origin_warehouse_id": origin,
            "destination_warehouse_id": destination,
            "recipient_name": "Jan Jansen",
            "delivery_address": address("Utrecht"),
            "weight_grams": 2_500,
            "declared_value": 12_000,
            "description": "books"
        }),
    )
    .await
}

#[tokio::test]
async fn health_needs_no_tenant() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_header_is_required() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/customers", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_tenant");

    let res = client
        .get(format!("{}/customers", srv.base_url))
        .header("X-Tenant-Id", "acme")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shipment_lifecycle_with_tracking_and_notifications() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv, TenantId::new());

    let customer_id = customer(&api).await;
    let origin = warehouse(&api, "ams-1", "Amsterdam").await;
    let destination = warehouse(&api, "utr-1", "Utrecht").await;
    let shipment_id = shipment(&api, &customer_id, &origin, &destination).await;

    let (status, body) = api
        .post(
            &format!("/shipments/{shipment_id}/status"),
            json!({ "status": "in_transit", "location": "A2 Vinkeveen" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["events_committed"], 1);

    let view = api
        .get_eventually(&format!("/shipments/{shipment_id}"), |s| s["status"] == "in_transit")
        .await;
    let history = view["history"].as_array().unwrap();
    let statuses: Vec<&str> = history.iter().map(|e| e["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, ["pending", "picked_up", "in_transit"]);
    assert_eq!(history[0]["location"], "AMS-1 Amsterdam hub");

    let tracking = view["tracking_number"].as_str().unwrap().to_lowercase();
    let (status, tracked) = api.get(&format!("/shipments/track/{tracking}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracked["status"], "in_transit");
    assert!(tracked.get("customer_id").is_none());

    // Going backwards is refused.
    let (status, body) = api
        .post(
            &format!("/shipments/{shipment_id}/status"),
            json!({ "status": "picked_up", "location": "Amsterdam" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    // One notification per shipment event, delivered to the customer.
    let inbox = api
        .get_eventually(
            &format!("/notifications?customer_id={customer_id}&unread=true"),
            |b| b["items"].as_array().is_some_and(|i| i.len() == 2),
        )
        .await;
    let newest = &inbox["items"][0];
    assert_eq!(newest["kind"], "shipment.status_changed");
    assert_eq!(newest["shipment_id"], shipment_id.as_str());

    let notification_id = newest["id"].as_str().unwrap();
    let (status, _) = api
        .post(&format!("/notifications/{notification_id}/read"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = api
        .post(&format!("/notifications/{notification_id}/read"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let listed = api
        .get_eventually(&format!("/shipments?status=in_transit&customer_id={customer_id}"), |b| {
            b["items"].as_array().is_some_and(|i| i.len() == 1)
        })
        .await;
    assert_eq!(listed["items"][0]["id"], shipment_id.as_str());
}

#[tokio::test]
async fn suspended_customers_cannot_book_shipments() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv, TenantId::new());

    let customer_id = customer(&api).await;
    let origin = warehouse(&api, "RTM", "Rotterdam").await;
    let destination = warehouse(&api, "EIN", "Eindhoven").await;

    let (status, _) = api
        .post(
            &format!("/customers/{customer_id}/suspend"),
            json!({ "reason": "unpaid invoices" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    api.get_eventually(&format!("/customers/{customer_id}"), |c| c["status"] == "suspended")
        .await;

    let (status, body) = api
        .post(
            "/shipments",
            json!({
                "customer_id": customer_id,
                "origin_warehouse_id": origin,
                "destination_warehouse_id": destination,
                "recipient_name": "Jan Jansen",
                "delivery_address": address("Utrecht"),
                "weight_grams": 1_000
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
}

#[tokio::test]
async fn invoice_preview_issue_and_pay() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv, TenantId::new());
    let customer_id = customer(&api).await;

    let lines = json!([{
        "description": "Freight Amsterdam-Utrecht",
        "quantity": 2,
        "unit_price": 10_000,
        "discount": { "kind": "percent", "value": 1_000 },
        "tax_rate": 2_100
    }]);

    let (status, preview) = api.post("/invoices/preview", json!({ "lines": lines })).await;
    assert_eq!(status, StatusCode::OK, "{preview}");
    assert_eq!(preview["subtotal"], 20_000);
    assert_eq!(preview["discount_total"], 2_000);
    assert_eq!(preview["tax_total"], 3_780);
    assert_eq!(preview["total"], 21_780);

    let invoice_id = api
        .create(
            "/invoices",
            json!({ "customer_id": customer_id, "currency": "EUR", "lines": lines }),
        )
        .await;

    let (status, body) = api
        .post(&format!("/invoices/{invoice_id}/payments"), json!({ "amount": 30_000 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, _) = api
        .post(
            &format!("/invoices/{invoice_id}/payments"),
            json!({ "amount": 21_780, "reference": "SEPA-0042" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let invoice = api
        .get_eventually(&format!("/invoices/{invoice_id}"), |i| i["status"] == "paid")
        .await;
    assert_eq!(invoice["outstanding"], 0);
    assert!(invoice["invoice_number"].as_str().unwrap().starts_with("INV-"));

    let (status, _) = api
        .post(&format!("/invoices/{invoice_id}/void"), json!({ "reason": "duplicate" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn bad_input_comes_back_as_json_errors() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv, TenantId::new());

    let (status, body) = api
        .post("/customers", json!({ "name": "", "email": "nobody@example.nl" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = api.post("/customers", json!({ "name": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = api.get("/shipments/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = api.get("/shipments?status=lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = api
        .post(
            &format!("/customers/{}/suspend", uuid::Uuid::now_v7()),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn route_stops_are_visited_in_order() {
    let srv = TestServer::spawn().await;
    let api = Api::new(&srv, TenantId::new());

    let customer_id = customer(&api).await;
    let origin = warehouse(&api, "AMS", "Amsterdam").await;
    let destination = warehouse(&api, "UTR", "Utrecht").await;
    let first = shipment(&api, &customer_id, &origin, &destination).await;
    let second = shipment(&api, &customer_id, &origin, &destination).await;

    let driver_id = api
        .create(
            "/drivers",
            json!({ "name": "Sven Bakker", "phone": "+31 6 1234 5678", "license_number": "NL-889211" }),
        )
        .await;

    let route_id = api
        .create(
            "/routes",
            json!({
                "scheduled_date": "2026-10-15",
                "driver_id": driver_id,
                "stops": [{ "shipment_id": first }, { "shipment_id": second }]
            }),
        )
        .await;

    let (status, body) = api
        .put(&format!("/routes/{route_id}/stops"), json!({ "order": [second, first] }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = api.post(&format!("/routes/{route_id}/start"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // `first` is now the second stop.
    let (status, _) = api
        .post(&format!("/routes/{route_id}/stops/{first}/complete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = api
        .post(&format!("/routes/{route_id}/stops/{second}/complete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = api
        .post(
            &format!("/routes/{route_id}/stops/{first}/fail"),
            json!({ "note": "nobody home" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events_committed"], 2);

    let route = api
        .get_eventually(&format!("/routes/{route_id}"), |r| r["status"] == "completed")
        .await;
    assert_eq!(route["stops"][0]["shipment_id"], second.as_str());
    assert_eq!(route["stops"][0]["sequence"], 1);
    assert_eq!(route["stops"][1]["status"], "failed");
}

#[tokio::test]
async fn tenants_do_not_see_each_other() {
    let srv = TestServer::spawn().await;
    let acme = Api::new(&srv, TenantId::new());
    let globex = Api::new(&srv, TenantId::new());

    let customer_id = customer(&acme).await;

    let (status, _) = globex.get(&format!("/customers/{customer_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = globex.get("/customers").await;
    assert_eq!(listed["items"].as_array().unwrap().len(), 0);

    let (status, _) = globex
        .post(&format!("/customers/{customer_id}/suspend"), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, history) = globex.get(&format!("/events/{customer_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 0);

    let (_, history) = acme.get(&format!("/events/{customer_id}")).await;
    assert_eq!(history["total"], 1);
}
