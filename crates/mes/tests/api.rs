// tests/api.rs
mod common;

use common::{insert_operation, setup_db};

use mes::api::{self, ApiState, ErrorBody};
use mes::client::{ClientError, HttpRoutingBackend, OperationList};
use mes::config::ClientConfig;
use mes::routing::{Operation, OperationStatus, Page};
use serial_test::serial;
use sqlx::PgPool;

async fn spawn_api(pool: PgPool) -> String {
    let app = api::router(ApiState::new(pool, 100));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn backend(base_url: &str) -> HttpRoutingBackend {
    HttpRoutingBackend::new(&ClientConfig {
        base_url: base_url.to_string(),
        timeout_ms: 5_000,
    })
    .unwrap()
}

#[tokio::test]
#[serial]
async fn editor_round_trip_over_http() {
    let Some(pool) = setup_db().await else { return };
    let base = spawn_api(pool.clone()).await;

    insert_operation(&pool, "P-A", "Primer").await;
    insert_operation(&pool, "P-B", "Base coat").await;
    insert_operation(&pool, "P-C", "Clear coat").await;

    let mut list = OperationList::new(backend(&base));
    list.load().await.unwrap();

    list.toggle_edit();
    list.reorder(0, 2).unwrap();
    list.rename(2, "Primer").unwrap();
    list.save().await.unwrap();

    let codes: Vec<_> = list.rows().iter().map(|op| op.code.as_str()).collect();
    assert_eq!(codes, vec!["P-B", "P-C", "P-A"]);
    assert_eq!(list.rows()[0].name, "Primer");
    assert!(!list.is_editing());

    list.select(list.rows()[1].id).unwrap();
    list.start().await.unwrap();
    assert_eq!(list.rows()[1].status, OperationStatus::InProgress);
    assert!(list.rows()[1].start_time.is_some());

    list.complete().await.unwrap();
    assert_eq!(list.rows()[1].status, OperationStatus::Completed);

    // a second start on a completed operation is a 409
    let err = list.start().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 409, .. }));
}

#[tokio::test]
#[serial]
async fn registry_endpoints_and_error_mapping() {
    let Some(pool) = setup_db().await else { return };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{base}/info/routing"))
        .json(&serde_json::json!({"code": "P-A", "name": "Primer", "standardTime": 30}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Operation = resp.json().await.unwrap();
    assert_eq!(created.order, 1);

    let resp = http
        .post(format!("{base}/info/routing"))
        .json(&serde_json::json!({"code": "P-A", "name": "Again", "standardTime": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: ErrorBody = resp.json().await.unwrap();
    assert!(body.error.contains("P-A"));

    let taken: bool = http
        .get(format!("{base}/info/routing/check-code?code=P-A"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(taken);

    let page: Page<Operation> = http
        .get(format!(
            "{base}/info/routing?page=1&limit=10&searchType=name&searchTerm=prim"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.total_elements, 1);

    let resp = http
        .put(format!("{base}/info/routing/order"))
        .json(&serde_json::json!([{"id": created.id, "order": 2}]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = http
        .delete(format!("{base}/info/routing/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = http
        .patch(format!("{base}/info/routing/{}/start", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let health = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(health, "ok");
}

#[tokio::test]
#[serial]
async fn inventory_flow_over_http() {
    let Some(pool) = setup_db().await else { return };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let supplier: serde_json::Value = http
        .post(format!("{base}/partners"))
        .json(&serde_json::json!({"partnerType": "supplier", "name": "Hanil Paint"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let item: serde_json::Value = http
        .post(format!("{base}/raws-items"))
        .json(&serde_json::json!({
            "itemCode": "RM-001",
            "itemName": "Epoxy primer",
            "supplierId": supplier["id"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = http
        .post(format!("{base}/raw-inbound"))
        .json(&serde_json::json!({
            "rawItemId": item["id"],
            "qty": 20,
            "inboundDate": "2025-03-14",
            "manufacturingDate": "2025-03-01"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let lot: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(lot["lotNumber"], "MINC-20250314-001");

    let resp = http
        .post(format!("{base}/raw-outbound"))
        .json(&serde_json::json!({
            "rawItemId": item["id"],
            "qty": 21,
            "outboundDate": "2025-03-15"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let stock: Vec<serde_json::Value> = http
        .get(format!("{base}/inventory/raw-items?keyword=hanil"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0]["qty"], 20);

    let resp = http
        .get(format!("{base}/partners/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
#[serial]
async fn sales_flow_over_http() {
    let Some(pool) = setup_db().await else { return };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let primer = insert_operation(&pool, "P-A", "Primer").await;
    let clear = insert_operation(&pool, "P-C", "Clear coat").await;

    let customer: serde_json::Value = http
        .post(format!("{base}/partners"))
        .json(&serde_json::json!({"partnerType": "customer", "name": "Daesung Motors"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = http
        .post(format!("{base}/sales-items"))
        .json(&serde_json::json!({
            "partnerId": customer["id"],
            "itemCode": "SI-001",
            "itemName": "Bumper cover",
            "classification": "exterior",
            "operationIds": [clear.id, 9999]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = http
        .post(format!("{base}/sales-items"))
        .json(&serde_json::json!({
            "partnerId": customer["id"],
            "itemCode": "SI-001",
            "itemName": "Bumper cover",
            "classification": "exterior",
            "operationIds": [primer.id, clear.id]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let item: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(item["totalOperations"], 2);

    let inbound: serde_json::Value = http
        .post(format!("{base}/sales-inbound"))
        .json(&serde_json::json!({
            "salesItemId": item["id"],
            "qty": 8,
            "receivedAt": "2025-06-09"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbound["lotNumber"], "LOT-20250609-001");

    let order: serde_json::Value = http
        .get(format!("{base}/work-order/{}", inbound["id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["customerName"], "Daesung Motors");
    assert_eq!(order["routing"][0]["code"], "P-A");
    assert_eq!(order["routing"][1]["seq"], 2);

    let resp = http
        .get(format!("{base}/work-order/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // the routed operation is pinned
    let resp = http
        .delete(format!("{base}/info/routing/{}", primer.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}
