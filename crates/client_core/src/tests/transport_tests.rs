use super::*;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct BackendState {
    chat_messages: Arc<Mutex<Vec<String>>>,
    population_requests: Arc<Mutex<Vec<PopulationRequest>>>,
    page_queries: Arc<Mutex<Vec<ProductPageQuery>>>,
}

fn product_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "price": 12999.0,
        "description": "Solid wood",
        "features": ["Solid wood"],
        "image_url": null,
        "category": "Tables",
        "brand": "Furlenco",
        "availability": "In Stock",
        "product_url": null,
        "additional_attributes": {"material": "Oak"},
        "created_at": null,
        "updated_at": null
    })
}

async fn handle_chat(State(state): State<BackendState>, Json(body): Json<ChatRequest>) -> Json<Value> {
    state.chat_messages.lock().await.push(body.message.clone());
    Json(json!({
        "response_type": "recommendation",
        "message": format!("Picks for {}", body.message),
        "products": [{"title": "Index-only Chair", "price": 4999.0}],
        "clarifying_questions": ["Which room?"]
    }))
}

async fn handle_list(
    State(state): State<BackendState>,
    Query(query): Query<ProductPageQuery>,
) -> Json<Value> {
    state.page_queries.lock().await.push(query);
    Json(json!([product_json(1, "Dining Table"), product_json(2, "Coffee Table")]))
}

async fn handle_get(Path(id): Path<i64>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if id == 404 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Product not found"})),
        ));
    }
    Ok(Json(product_json(id, "Side Table")))
}

async fn handle_category(Path(category): Path<String>) -> Json<Value> {
    Json(json!([product_json(3, &category)]))
}

async fn handle_search(Path(query): Path<String>) -> Json<Value> {
    Json(json!({"products": [product_json(4, &query)]}))
}

async fn handle_trigger(
    State(state): State<BackendState>,
    Json(request): Json<PopulationRequest>,
) -> Json<Value> {
    state.population_requests.lock().await.push(request);
    Json(json!({"message": "Scraping started in background"}))
}

async fn handle_status() -> Json<Value> {
    Json(json!({"database_products": 0, "vector_products": 7, "status": "no_data"}))
}

async fn handle_broken_status() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

async fn handle_slow_chat() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"message": "too late"}))
}

async fn spawn_backend(router: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}/api")
}

async fn spawn_shop_backend() -> (HttpTransport, BackendState) {
    let state = BackendState::default();
    let router = Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/chat/search/:query", get(handle_search))
        .route("/api/products", get(handle_list))
        .route("/api/products/:id", get(handle_get))
        .route("/api/products/category/:category", get(handle_category))
        .route("/api/scraping", post(handle_trigger))
        .route("/api/scraping/status", get(handle_status))
        .with_state(state.clone());
    let base_url = spawn_backend(router).await;
    let settings = ClientSettings {
        api_base_url: base_url,
        ..ClientSettings::default()
    };
    (HttpTransport::new(&settings).expect("transport"), state)
}

#[tokio::test]
async fn chat_posts_message_and_decodes_reply() {
    let (transport, state) = spawn_shop_backend().await;

    let reply = transport
        .send_message("compact sofa")
        .await
        .expect("chat reply");

    assert_eq!(reply.message, "Picks for compact sofa");
    let products = reply.products.expect("products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, None);
    assert_eq!(
        reply.clarifying_questions,
        Some(vec!["Which room?".to_string()])
    );
    assert_eq!(*state.chat_messages.lock().await, vec!["compact sofa".to_string()]);
}

#[tokio::test]
async fn list_products_sends_page_query() {
    let (transport, state) = spawn_shop_backend().await;

    let products = transport
        .list_products(ProductPageQuery { skip: 5, limit: 20 })
        .await
        .expect("list");

    assert_eq!(products.len(), 2);
    assert_eq!(products[1].title, "Coffee Table");
    assert_eq!(
        products[0].additional_attributes.get("material").map(String::as_str),
        Some("Oak")
    );
    let queries = state.page_queries.lock().await;
    assert_eq!((queries[0].skip, queries[0].limit), (5, 20));
}

#[tokio::test]
async fn missing_product_surfaces_backend_detail() {
    let (transport, _state) = spawn_shop_backend().await;

    let found = transport.get_product(ProductId(8)).await.expect("product");
    assert_eq!(found.id, Some(ProductId(8)));

    let err = transport
        .get_product(ProductId(404))
        .await
        .expect_err("must be not found");
    assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    assert!(
        err.to_string().contains("Product not found"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn path_segments_are_percent_encoded() {
    let (transport, _state) = spawn_shop_backend().await;

    let by_category = transport
        .products_by_category("living room")
        .await
        .expect("category");
    assert_eq!(by_category[0].title, "living room");

    let searched = transport
        .search_products("sofa/bed & chair?")
        .await
        .expect("search");
    assert_eq!(searched[0].title, "sofa/bed & chair?");
}

#[tokio::test]
async fn population_trigger_and_status_round_trip() {
    let (transport, state) = spawn_shop_backend().await;

    let ack = transport
        .trigger_population(PopulationRequest::default())
        .await
        .expect("ack");
    assert_eq!(ack.message.as_deref(), Some("Scraping started in background"));
    let requests = state.population_requests.lock().await;
    assert_eq!(requests[0].max_products, 30);
    assert!(requests[0].use_fallback);
    drop(requests);

    let status = transport.population_status().await.expect("status");
    assert_eq!(
        status,
        StoreStatus {
            primary_count: 0,
            index_count: 7
        }
    );
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_reason_phrase() {
    let router = Router::new().route("/api/scraping/status", get(handle_broken_status));
    let base_url = spawn_backend(router).await;
    let transport = HttpTransport::new(&ClientSettings {
        api_base_url: base_url,
        ..ClientSettings::default()
    })
    .expect("transport");

    match transport.population_status().await {
        Err(TransportError::Status { status, detail, .. }) => {
            assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
            assert_eq!(detail, "Bad Gateway");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_backend_times_out() {
    let router = Router::new().route("/api/chat", post(handle_slow_chat));
    let base_url = spawn_backend(router).await;
    let transport = HttpTransport::new(&ClientSettings {
        api_base_url: base_url,
        request_timeout: Duration::from_millis(100),
        ..ClientSettings::default()
    })
    .expect("transport");

    let err = transport
        .send_message("anything")
        .await
        .expect_err("must time out");
    assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let transport = HttpTransport::new(&ClientSettings {
        api_base_url: format!("http://{addr}/api"),
        ..ClientSettings::default()
    })
    .expect("transport");

    let err = transport
        .list_products(ProductPageQuery::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Network { .. }), "got {err:?}");
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let transport = HttpTransport::new(&ClientSettings {
        api_base_url: "http://shop.example/api/".to_string(),
        ..ClientSettings::default()
    })
    .expect("transport");

    let url = transport.endpoint(&["scraping", "status"]).expect("url");
    assert_eq!(url.as_str(), "http://shop.example/api/scraping/status");
}
