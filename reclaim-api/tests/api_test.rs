use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use reclaim_api::middleware::auth::issue_token;
use reclaim_api::{app, state::{AppState, AuthConfig}};
use reclaim_core::{PickupRequest, Role, Stores, User};
use reclaim_pickup::{PricingPolicy, SimulatedGateway};
use reclaim_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const KEY_ID: &str = "rzp_test_key";
const KEY_SECRET: &str = "rzp_test_secret";

struct TestApp {
    router: Router,
    stores: Stores,
    auth: AuthConfig,
}

impl TestApp {
    fn new() -> Self {
        let stores = MemoryStore::new().into_stores();
        let auth = AuthConfig { secret: "integration-secret".to_string(), expiration: 3600 };
        let state = AppState::new(
            stores.clone(),
            Arc::new(SimulatedGateway::new(KEY_ID, KEY_SECRET)),
            PricingPolicy::default(),
            "INR",
            auth.clone(),
        );
        Self { router: app(state), stores, auth }
    }

    /// Seed an account directly and return it with a bearer token.
    async fn account(&self, name: &str, role: Role) -> (User, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = User::new(name.to_string(), &email, "unused".to_string(), role);
        self.stores.users.create_user(&user).await.unwrap();
        let token = issue_token(&user, &self.auth).unwrap();
        (user, token)
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn priced_pickup(&self, owner: &User, engineer_price: i64) -> PickupRequest {
        let mut pickup = PickupRequest::new(owner.id, owner.name.clone(), "12 MG Road".into(), "Old laptop".into());
        pickup.engineer_price = Some(engineer_price);
        self.stores.pickups.create_pickup(&pickup).await.unwrap();
        pickup
    }
}

#[tokio::test]
async fn test_status_and_index() {
    let t = TestApp::new();

    let (status, body) = t.call(Method::GET, "/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let (_, body) = t.call(Method::GET, "/", None, None).await;
    assert_eq!(body["redirect"], "/auth/login");

    let (_, token) = t.account("Dev", Role::Driver).await;
    let (_, body) = t.call(Method::GET, "/", Some(&token), None).await;
    assert_eq!(body["redirect"], "/driver/route");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let t = TestApp::new();

    let (status, body) = t
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Meera", "email": "Meera@Example.com", "password": "recycle-all-things" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = t
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Meera", "email": "meera@example.com", "password": "recycle-all-things" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "meera@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "meera@example.com", "password": "recycle-all-things" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dashboard"], "/user/requests");

    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = t.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "meera@example.com");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let t = TestApp::new();
    let (status, _) = t.call(Method::GET, "/invoices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.call(Method::GET, "/dashboard", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_recyclers_can_pay() {
    let t = TestApp::new();
    let (owner, owner_token) = t.account("Owner", Role::User).await;
    let (_, warehouse_token) = t.account("Depot", Role::Warehouse).await;
    let pickup = t.priced_pickup(&owner, 20_000).await;

    for token in [&owner_token, &warehouse_token] {
        let (status, body) = t.post(&format!("/payment/initiate/{}", pickup.id), token, json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) = t
            .post("/payment/confirm-simulated", token, json!({ "pickup_id": pickup.id }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // Nothing was settled
    let stored = t.stores.pickups.get_pickup(pickup.id).await.unwrap().unwrap();
    assert!(!stored.is_settled());
}

#[tokio::test]
async fn test_pricing_estimate_is_public() {
    let t = TestApp::new();

    let (status, body) = t.call(Method::GET, "/pricing/estimate?weight_grams=4000", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 20_000);
    assert_eq!(body["splits"]["user"], 10_000);
    assert_eq!(body["splits"]["warehouse"], 5_000);

    // Light loads are raised to the minimum
    let (_, body) = t.call(Method::GET, "/pricing/estimate?weight_grams=10", None, None).await;
    assert_eq!(body["amount"], 10_000);

    let (_, body) = t
        .call(Method::GET, "/pricing/estimate?weight_grams=10&engineer_price=55500", None, None)
        .await;
    assert_eq!(body["amount"], 55_500);

    let (status, _) = t.call(Method::GET, "/pricing/estimate?weight_grams=-5", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_payment_settles_once() {
    let t = TestApp::new();
    let (owner, _) = t.account("Owner", Role::User).await;
    let (_, recycler_token) = t.account("Green", Role::Recycler).await;
    let pickup = t.priced_pickup(&owner, 30_000).await;

    let (status, body) = t.post(&format!("/payment/initiate/{}", pickup.id), &recycler_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 30_000);
    assert_eq!(body["key_id"], KEY_ID);
    assert_eq!(body["email"], "green@example.com");
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (status, body) = t
        .post(
            "/payment/verify",
            &recycler_token,
            json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_test_1",
                "razorpay_signature": "deadbeef",
                "pickup_id": pickup.id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment verification failed");

    let signature = SimulatedGateway::new(KEY_ID, KEY_SECRET).sign(&order_id, "pay_test_1").unwrap();
    let verify_body = json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": "pay_test_1",
        "razorpay_signature": signature,
        "pickup_id": pickup.id,
    });
    let (status, body) = t.post("/payment/verify", &recycler_token, verify_body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["invoices"].as_array().unwrap().len(), 4);

    let stored = t.stores.pickups.get_pickup(pickup.id).await.unwrap().unwrap();
    assert_eq!(stored.transaction_id.as_deref(), Some("pay_test_1"));

    // Replaying the callback must not pay twice
    let (status, _) = t.post("/payment/verify", &recycler_token, verify_body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(t.stores.invoices.invoices_for_pickup(pickup.id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_pickup_lifecycle_to_settlement() {
    let t = TestApp::new();
    let (owner, user_token) = t.account("Owner", Role::User).await;
    let (engineer, engineer_token) = t.account("Eng", Role::Engineer).await;
    let (driver, driver_token) = t.account("Drive", Role::Driver).await;
    let (warehouse, warehouse_token) = t.account("Depot", Role::Warehouse).await;
    let (_, recycler_token) = t.account("Green", Role::Recycler).await;

    // User asks for a pickup
    let (status, body) = t
        .post(
            "/user/requests",
            &user_token,
            json!({ "item_description": "CRT monitor", "address": "4 Lake View", "approx_weight": 6000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let pickup_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = t.get(&format!("/user/requests/{}", pickup_id), &user_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], json!(owner.id));

    // Warehouse assigns, engineer inspects
    let (status, body) = t
        .post(
            &format!("/warehouse/requests/{}/assign", pickup_id),
            &warehouse_token,
            json!({ "engineer_id": engineer.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "assigned");

    let (status, _) = t
        .post(
            &format!("/engineer/requests/{}/inspect", pickup_id),
            &user_token,
            json!({ "final_weight": 5800.0, "engineer_price": 40000 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .post(
            &format!("/engineer/requests/{}/inspect", pickup_id),
            &engineer_token,
            json!({ "final_weight": 5800.0, "engineer_price": 40000 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "inspected");

    let (_, body) = t.get("/engineer/requests", &engineer_token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Cluster and route
    let (status, cluster) = t
        .post(
            "/warehouse/clusters",
            &warehouse_token,
            json!({ "name": "North loop", "driver_id": driver.id, "pickup_ids": [pickup_id] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cluster_id = cluster["id"].as_str().unwrap().to_string();

    let (_, body) = t.get("/driver/route", &driver_token).await;
    assert!(body["route"].is_null());

    let (status, route) = t
        .post(&format!("/warehouse/clusters/{}/dispatch", cluster_id), &warehouse_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let route_id = route["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .post(&format!("/warehouse/clusters/{}/dispatch", cluster_id), &warehouse_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, sheet) = t.get("/driver/route", &driver_token).await;
    assert_eq!(sheet["route"]["id"], route_id.as_str());
    assert_eq!(sheet["pickups"].as_array().unwrap().len(), 1);

    // Driver's pending view shows their 10% cut
    let (_, body) = t.get("/invoices", &driver_token).await;
    assert_eq!(body["role"], "driver");
    assert_eq!(body["pending_items"][0]["estimated_share"], 4_000);

    let (status, body) = t
        .post(&format!("/driver/pickups/{}/collect", pickup_id), &driver_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "collected");

    let (status, _) = t
        .post(&format!("/driver/routes/{}/complete", route_id), &driver_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .post(&format!("/warehouse/requests/{}/receive", pickup_id), &warehouse_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warehouse_id"], json!(warehouse.id));

    let (_, queue) = t.get("/warehouse/requests?status=collected", &warehouse_token).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    // Recycler pays through the simulated flow
    let (status, preview) = t.get(&format!("/payment/preview/{}", pickup_id), &recycler_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["amount"], 40_000);
    assert_eq!(preview["splits"]["engineer"], 6_000);

    let (status, body) = t
        .post("/payment/confirm-simulated", &recycler_token, json!({ "pickup_id": pickup_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["transaction_id"].as_str().unwrap().starts_with("TXN_SIM_"));
    let invoices = body["invoices"].as_array().unwrap();
    assert_eq!(invoices.len(), 4);
    let total: i64 = invoices.iter().map(|i| i["amount"].as_i64().unwrap()).sum();
    assert_eq!(total, 40_000);

    let (status, _) = t
        .post("/payment/confirm-simulated", &recycler_token, json!({ "pickup_id": pickup_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Each party sees its invoice and nothing pending
    let (_, body) = t.get("/invoices", &user_token).await;
    assert_eq!(body["invoices"].as_array().unwrap().len(), 1);
    assert_eq!(body["invoices"][0]["amount"], 20_000);
    assert!(body["pending_items"].as_array().unwrap().is_empty());

    let (_, body) = t.get("/invoices", &warehouse_token).await;
    assert_eq!(body["invoices"][0]["amount"], 10_000);

    let (_, body) = t.get(&format!("/user/requests/{}", pickup_id), &user_token).await;
    assert_eq!(body["status"], "recycled");
    assert_eq!(body["payment_status"], "paid");

    let (_, notes) = t.get("/notifications", &user_token).await;
    let note_id = notes[0]["id"].as_str().unwrap().to_string();
    let (status, _) = t.post(&format!("/notifications/{}/read", note_id), &driver_token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.post(&format!("/notifications/{}/read", note_id), &user_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_manages_staff() {
    let t = TestApp::new();
    let (_, admin_token) = t.account("Root", Role::Admin).await;
    let (_, user_token) = t.account("Plain", Role::User).await;

    let staff = json!({ "name": "Ravi", "email": "ravi@example.com", "password": "drives-trucks", "role": "driver" });
    let (status, _) = t.post("/admin/users", &user_token, staff.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.post("/admin/users", &admin_token, staff).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "driver");

    let (status, body) = t.get("/admin/users?role=driver", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, dashboard) = t.get("/dashboard", &admin_token).await;
    assert_eq!(dashboard["counters"]["users"], 3);
    assert_eq!(dashboard["counters"]["by_role"]["driver"], 1);

    // Unknown pickup
    let (status, _) = t.get(&format!("/user/requests/{}", Uuid::new_v4()), &user_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
