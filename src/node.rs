use crate::config::Config;
use crate::error::{self, ChainError};
use crate::service::BlockchainService;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second install (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
}

pub struct Node {
    pub config: Config,
    pub service: Arc<BlockchainService>,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    /// Builds the service and mines the genesis block on a blocking thread.
    pub async fn init(config: Config) -> error::Result<Self> {
        let state = Arc::new(RwLock::new(NodeState::Booting));
        info!(
            difficulty = config.chain.difficulty,
            threads = config.miner.threads,
            "Starting PowChain node"
        );

        let service_config = config.clone();
        let service = tokio::task::spawn_blocking(move || BlockchainService::new(&service_config))
            .await
            .map_err(|e| ChainError::TaskFailed(e.to_string()))??;

        *state.write().await = NodeState::Ready;
        info!(blocks = service.size(), "Node ready");

        Ok(Self {
            config,
            service: Arc::new(service),
            state,
        })
    }

    /// API port from the config, overridden by the `PORT` environment variable.
    pub fn api_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(self.config.api.port)
    }

    #[cfg(feature = "api")]
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        let port = self.api_port();
        let api_node = crate::api::ApiNode::new_shared(self.service.clone(), Some(self.state.clone()));
        crate::api::run_api_server(Arc::new(api_node), port).await
    }

    #[cfg(not(feature = "api"))]
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        Err("API feature not enabled in this build".into())
    }
}
