//! REST API server for PowChain
//!
//! Thin HTTP adapter over [`BlockchainService`]: maps requests to facade
//! calls and facade errors to HTTP status codes.

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, ValidationReport};
use crate::error::ChainError;
use crate::node::NodeState;
use crate::service::BlockchainService;

const SERVICE_NAME: &str = "PowChain API";

/// Shared handler state
#[derive(Clone)]
pub struct ApiNode {
    pub service: Arc<BlockchainService>,
    // Optional orchestrator state for health checks and logging
    pub state: Option<Arc<RwLock<NodeState>>>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    blocks_submitted: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl ApiNode {
    pub fn new(service: Arc<BlockchainService>) -> Self {
        Self::new_shared(service, None)
    }

    /// Create an API node that observes the orchestrator's `NodeState`.
    pub fn new_shared(
        service: Arc<BlockchainService>,
        state: Option<Arc<RwLock<NodeState>>>,
    ) -> Self {
        Self {
            service,
            state,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);
        let chain = self.service.stats();

        ApiStatsResponse {
            total_blocks: chain.total_blocks,
            is_chain_valid: chain.is_chain_valid,
            difficulty: chain.difficulty,
            total_reward: chain.total_reward,
            blocks_mined: chain.blocks_mined,
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            blocks_submitted: stats.blocks_submitted,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match e {
                    ChainError::MiningCancelled { .. } => StatusCode::CONFLICT,
                    ChainError::MiningExhausted { .. } | ChainError::NonceOverflow(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MineRequest {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub success: bool,
    pub message: String,
    pub block: Block,
    pub block_id: u64,
    pub hash: String,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_blocks: usize,
    pub is_chain_valid: bool,
    pub difficulty: usize,
    pub total_reward: u64,
    pub blocks_mined: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub blocks_submitted: u64,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
struct SuccessResponse {
    message: String,
}

#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_page() -> u64 {
    0
}
fn default_limit() -> u64 {
    10
}

// ============================================================================
// Middleware
// ============================================================================

/// Request statistics middleware
async fn stats_middleware(State(node): State<Arc<ApiNode>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status, duration and current `NodeState` (when available).
async fn logging_middleware(
    State(node): State<Arc<ApiNode>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    let node_state = if let Some(s) = &node.state {
        format!("{:?}", s.read().await.clone())
    } else {
        "unknown".to_string()
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<ApiNode>) -> Router {
    // CORS configuration - allow all origins with credentials
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Blockchain endpoints
        .route("/blockchain", get(get_blockchain))
        .route("/blockchain/blocks", get(get_blocks))
        .route("/blockchain/block/:id", get(get_block_by_id))
        .route("/blockchain/mine", post(mine_block))
        .route("/blockchain/validate", post(validate_blockchain))
        // Mining endpoints
        .route("/mining/cancel", post(cancel_mining))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Serve the API on `0.0.0.0:port` until the listener fails.
pub async fn run_api_server(node: Arc<ApiNode>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    let node_state = match &node.state {
        Some(s) => s.read().await.clone(),
        // No orchestrator state: the service exists, so it is ready
        None => NodeState::Ready,
    };
    let (status, label) = match node_state {
        NodeState::Ready => (StatusCode::OK, "UP"),
        NodeState::Booting => (StatusCode::SERVICE_UNAVAILABLE, "BOOTING"),
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "service": SERVICE_NAME,
            "node_state": format!("{:?}", node_state),
            "timestamp": chrono::Utc::now().timestamp_millis(),
            "blocks_count": node.service.size(),
        })),
    )
}

async fn get_blockchain(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.service.info())
}

async fn get_blocks(
    State(node): State<Arc<ApiNode>>,
    Query(params): Query<PaginationQuery>,
) -> impl IntoResponse {
    let blocks = node.service.get_all_blocks();
    let total = blocks.len();

    let limit = params.limit.min(100); // Max 100 blocks per request
    let offset = params.page.saturating_mul(limit);

    let page: Vec<Block> = blocks
        .into_iter()
        .rev()
        .skip(offset.min(total as u64) as usize)
        .take(limit as usize)
        .collect();

    Json(serde_json::json!({
        "blocks": page,
        "total": total,
        "page": params.page,
        "limit": limit
    }))
}

async fn get_block_by_id(
    State(node): State<Arc<ApiNode>>,
    Path(id): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    node.service
        .get_block_by_id(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block {} not found", id)))
}

async fn mine_block(
    State(node): State<Arc<ApiNode>>,
    payload: Option<Json<MineRequest>>,
) -> Result<Json<MineResponse>, ApiError> {
    let content = payload
        .and_then(|Json(req)| req.data)
        .unwrap_or_default();

    // Proof-of-work is CPU bound; keep it off the async workers.
    let service = node.service.clone();
    let block = tokio::task::spawn_blocking(move || service.create_block(&content))
        .await
        .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))??;

    {
        let mut stats = node.api_stats.write().await;
        stats.blocks_submitted += 1;
    }

    Ok(Json(MineResponse {
        success: true,
        message: "Block mined successfully".to_string(),
        block_id: block.id(),
        hash: block.hash().to_string(),
        block,
    }))
}

async fn cancel_mining(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    node.service.cancel_mining();
    Json(SuccessResponse {
        message: "Cancellation requested".to_string(),
    })
}

async fn validate_blockchain(State(node): State<Arc<ApiNode>>) -> Json<ValidationReport> {
    Json(node.service.validate())
}

async fn get_api_stats(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
