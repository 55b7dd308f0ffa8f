//! Integration tests for the PowChain REST API
//!
//! Each test builds a fresh low-difficulty service and drives the router
//! through `axum_test`.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use powchain::api::{build_api_router, ApiNode};
use powchain::node::NodeState;
use powchain::service::BlockchainService;

fn test_server(state: Option<NodeState>) -> (TestServer, Arc<BlockchainService>) {
    let service = Arc::new(BlockchainService::with_difficulty(1).expect("Failed to create service"));
    let state = state.map(|s| Arc::new(RwLock::new(s)));
    let api_node = Arc::new(ApiNode::new_shared(service.clone(), state));
    let server = TestServer::new(build_api_router(api_node)).expect("Failed to create test server");
    (server, service)
}

#[tokio::test]
async fn test_health_reports_up() {
    let (server, _) = test_server(Some(NodeState::Ready));

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "UP");
    assert_eq!(json["service"], "PowChain API");
    assert_eq!(json["blocks_count"], 1);
    assert!(json["timestamp"].is_i64());
}

#[tokio::test]
async fn test_health_while_booting() {
    let (server, _) = test_server(Some(NodeState::Booting));

    let response = server.get("/api/health").expect_failure().await;
    assert_eq!(response.status_code(), 503);
    let json: Value = response.json();
    assert_eq!(json["status"], "BOOTING");
}

#[tokio::test]
async fn test_blockchain_starts_with_genesis() {
    let (server, _) = test_server(None);

    let response = server.get("/api/blockchain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_blocks"], 1);
    assert_eq!(json["is_valid"], true);
    assert_eq!(json["blocks"][0]["id"], 0);
    assert_eq!(json["blocks"][0]["previous_hash"], "0");
    assert_eq!(json["blocks"][0]["content"], "Genesis Block");
    assert_eq!(json["last_block_hash"], json["blocks"][0]["hash"]);
}

#[tokio::test]
async fn test_get_block_by_id() {
    let (server, _) = test_server(None);

    let response = server.get("/api/blockchain/block/0").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["id"], 0);
    assert_eq!(json["hash"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn test_unknown_block_is_not_found() {
    let (server, _) = test_server(None);

    let response = server.get("/api/blockchain/block/999").expect_failure().await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_mine_with_data() {
    let (server, service) = test_server(None);
    let genesis_hash = service.get_block_by_id(0).unwrap().hash().to_string();

    let response = server
        .post("/api/blockchain/mine")
        .json(&json!({ "data": "hello" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["block_id"], 1);
    assert_eq!(json["block"]["content"], "hello");
    assert_eq!(json["block"]["previous_hash"], genesis_hash.as_str());
    assert!(json["hash"].as_str().unwrap().starts_with('0'));

    assert_eq!(service.size(), 2);
}

#[tokio::test]
async fn test_mine_without_data_uses_placeholder() {
    let (server, _) = test_server(None);

    let response = server.post("/api/blockchain/mine").json(&json!({})).await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["block"]["content"], "Automatically mined block");

    let response = server.post("/api/blockchain/mine").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["block_id"], 2);
    assert_eq!(json["block"]["content"], "Automatically mined block");
}

#[tokio::test]
async fn test_validate_endpoint() {
    let (server, _) = test_server(None);
    server
        .post("/api/blockchain/mine")
        .json(&json!({ "data": "a" }))
        .await;

    let response = server.post("/api/blockchain/validate").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["is_valid"], true);
    assert_eq!(json["total_blocks"], 2);
    assert_eq!(json["valid_blocks"], 2);
    assert_eq!(json["invalid_blocks"], 0);
    assert_eq!(json["integrity_score"], 100);
    assert_eq!(json["errors"], json!([]));
}

#[tokio::test]
async fn test_stats_track_requests_and_rewards() {
    let (server, _) = test_server(None);
    server
        .post("/api/blockchain/mine")
        .json(&json!({ "data": "a" }))
        .await;
    server.get("/api/blockchain/block/42").expect_failure().await;

    let response = server.get("/api/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_blocks"], 2);
    assert_eq!(json["is_chain_valid"], true);
    assert_eq!(json["difficulty"], 1);
    assert_eq!(json["blocks_mined"], 2);
    assert_eq!(json["total_reward"], 100);
    assert_eq!(json["blocks_submitted"], 1);
    // The stats request itself is recorded after the handler runs.
    assert_eq!(json["total_requests"], 2);
    assert_eq!(json["failed_requests"], 1);
}

#[tokio::test]
async fn test_blocks_pagination_is_newest_first() {
    let (server, _) = test_server(None);
    for data in ["a", "b", "c"] {
        server
            .post("/api/blockchain/mine")
            .json(&json!({ "data": data }))
            .await;
    }

    let response = server
        .get("/api/blockchain/blocks")
        .add_query_param("page", 0)
        .add_query_param("limit", 2)
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total"], 4);
    assert_eq!(json["blocks"][0]["id"], 3);
    assert_eq!(json["blocks"][1]["id"], 2);

    let response = server
        .get("/api/blockchain/blocks")
        .add_query_param("page", 5)
        .add_query_param("limit", 2)
        .await;
    let json: Value = response.json();
    assert_eq!(json["blocks"], json!([]));
}

#[tokio::test]
async fn test_cancel_without_active_search() {
    let (server, _) = test_server(None);

    let response = server.post("/api/mining/cancel").await;
    assert_eq!(response.status_code(), 200);

    // The flag is reset when the next search starts.
    let response = server
        .post("/api/blockchain/mine")
        .json(&json!({ "data": "after cancel" }))
        .await;
    assert_eq!(response.status_code(), 200);
}
