#![forbid(unsafe_code)]
//! Runs the PowChain node: mines the genesis block and serves the REST API.

use powchain::config::load_config;
use powchain::node::{init_logging, Node};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info");

    let config = load_config()?;
    let node = Node::init(config).await?;
    node.start().await
}
