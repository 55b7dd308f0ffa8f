//! Configuration management for PowChain

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::crypto::DIGEST_HEX_LEN;
use crate::miner::{MinerSettings, BLOCK_REWARD, DEFAULT_DIFFICULTY, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_GENESIS_CONTENT: &str = "Genesis Block";
pub const DEFAULT_BLOCK_CONTENT: &str = "Automatically mined block";
pub const DEFAULT_API_PORT: u16 = 8080;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_genesis_content")]
    pub genesis_content: String,
    /// Used when a block is requested with blank content.
    #[serde(default = "default_block_content")]
    pub default_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,
    #[serde(default = "default_block_reward")]
    pub block_reward: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            genesis_content: default_genesis_content(),
            default_content: default_block_content(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_attempts: default_max_attempts(),
            block_reward: default_block_reward(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.chain.difficulty > DIGEST_HEX_LEN {
            return Err(format!(
                "chain.difficulty must be at most {}, got {}",
                DIGEST_HEX_LEN, self.chain.difficulty
            )
            .into());
        }
        if self.chain.genesis_content.trim().is_empty() {
            return Err("chain.genesis_content must not be empty".into());
        }
        if self.miner.threads == 0 {
            return Err("miner.threads must be at least 1".into());
        }
        if self.miner.max_attempts == 0 {
            return Err("miner.max_attempts must be at least 1".into());
        }
        Ok(())
    }

    pub fn miner_settings(&self) -> MinerSettings {
        MinerSettings {
            difficulty: self.chain.difficulty,
            block_reward: self.miner.block_reward,
            max_attempts: self.miner.max_attempts,
            threads: self.miner.threads,
        }
    }
}

/// Loads `config.toml` from the working directory.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads and validates a config file. A missing or empty file yields defaults;
/// any other read failure is returned.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    config.validate()?;
    Ok(config)
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_genesis_content() -> String {
    DEFAULT_GENESIS_CONTENT.to_string()
}

fn default_block_content() -> String {
    DEFAULT_BLOCK_CONTENT.to_string()
}

fn default_threads() -> usize {
    1
}

fn default_max_attempts() -> u64 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_block_reward() -> u64 {
    BLOCK_REWARD
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}
