//! Configuration management for the transactor
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub transactor: TransactorConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub nonce: NonceConfig,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactorConfig {
    /// Chain id used by `send_transaction` when none is given
    pub chain_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NonceConfig {
    /// Chains whose pending nonce ignores the mempool. Replaces the built-in
    /// optimistic rollup list when set.
    pub tracked_pending_chains: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "TRANSACTOR_PRIVATE_KEY".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the file named by `TRANSACTOR_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TRANSACTOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::from_path(&config_path)
    }

    /// Load settings from a specific file
    pub fn from_path(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.transactor.chain_id == 0 {
            anyhow::bail!("transactor.chain_id must be non-zero");
        }

        if self.chain.rpc_urls.is_empty() {
            anyhow::bail!("Chain {} has no RPC URLs configured", self.chain.name);
        }

        if let Some(db) = &self.database {
            if db.min_connections > db.max_connections {
                anyhow::bail!(
                    "database.min_connections ({}) exceeds max_connections ({})",
                    db.min_connections,
                    db.max_connections
                );
            }
        }

        if self.wallet.private_key_env.is_empty() {
            tracing::warn!("wallet.private_key_env is empty - signing will be unavailable");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex is valid");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [transactor]
        chain_id = 10

        [chain]
        name = "optimism"
        rpc_urls = ["https://mainnet.optimism.io", "https://rpc.example.com/${TRANSACTOR_TEST_KEY}"]

        [nonce]
        tracked_pending_chains = [10, 8453]

        [database]
        url = "postgres://localhost/transactor"
        max_connections = 4
        min_connections = 1
    "#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_parse_full_settings() {
        env::set_var("TRANSACTOR_TEST_KEY", "abc123");
        let settings = Settings::parse(SAMPLE).unwrap();

        assert_eq!(settings.transactor.chain_id, 10);
        assert_eq!(settings.chain.rpc_urls[1], "https://rpc.example.com/abc123");
        assert_eq!(settings.nonce.tracked_pending_chains, Some(vec![10, 8453]));
        assert_eq!(settings.database.unwrap().max_connections, 4);
        assert_eq!(settings.wallet.private_key_env, "TRANSACTOR_PRIVATE_KEY");
    }

    #[test]
    fn test_rejects_missing_rpc_urls() {
        let input = r#"
            [transactor]
            chain_id = 1

            [chain]
            name = "mainnet"
            rpc_urls = []
        "#;
        let err = Settings::parse(input).unwrap_err();
        assert!(err.to_string().contains("no RPC URLs"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[transactor]\nchain_id = 1\n\n[chain]\nname = \"mainnet\"\nrpc_urls = [\"http://127.0.0.1:8545\"]\n"
        )
        .unwrap();

        let settings = Settings::from_path(file.path()).unwrap();
        assert_eq!(settings.chain.name, "mainnet");
        assert!(settings.database.is_none());
        assert!(settings.nonce.tracked_pending_chains.is_none());
    }
}
