use clap::{
    Parser,
    ValueEnum,
};
use tracing::level_filters::LevelFilter;
use zk_aa_core::constants::DEFAULT_GAS_PER_PUBDATA_LIMIT;

/// Chain id of the public zkSync Sepolia testnet.
pub const DEFAULT_CHAIN_ID: u64 = 300;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct NetworkConfig {
    /// Chain id envelopes are built for
    #[arg(long, env = "AA_CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,
    /// Name of the target network, e.g. `zkSyncSepoliaTestnet` or `inMemoryNode`
    #[arg(long, env = "AA_NETWORK", default_value = "zkSyncSepoliaTestnet")]
    pub network: String,
    /// Overrides the kind derived from the network name
    #[arg(long, env = "AA_NETWORK_KIND", value_enum)]
    pub network_kind: Option<NetworkKind>,
    /// Gas per byte of published data
    #[arg(long, env = "AA_GAS_PER_PUBDATA", default_value_t = DEFAULT_GAS_PER_PUBDATA_LIMIT)]
    pub gas_per_pubdata: u64,
    /// Log level
    #[arg(long, env = "AA_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl NetworkConfig {
    pub fn kind(&self) -> NetworkKind {
        self.network_kind
            .unwrap_or_else(|| NetworkKind::from_network_name(&self.network))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_chain_id(self.chain_id)
            .with_gas_per_pubdata_limit(self.gas_per_pubdata)
            .with_network(self.kind())
    }
}

/// Whether deployments on a network outlive the session that made them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum NetworkKind {
    #[default]
    Persistent,
    /// Local or in-memory node.
    Ephemeral,
}

impl NetworkKind {
    pub fn from_network_name(name: &str) -> Self {
        if ["Node", "localhost", "inMemory"]
            .iter()
            .any(|marker| name.contains(marker))
        {
            Self::Ephemeral
        } else {
            Self::Persistent
        }
    }

    /// Explorer verification only makes sense where the contract persists.
    pub fn should_verify(&self) -> bool {
        matches!(self, Self::Persistent)
    }
}

/// Configuration of a [`crate::DeploymentOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub chain_id: u64,
    pub gas_per_pubdata_limit: u64,
    pub network: NetworkKind,
    /// Fixed gas limit instead of asking the chain for an estimate.
    pub gas_limit: Option<u64>,
    /// Fixed gas price instead of asking the chain.
    pub gas_price: Option<u128>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            chain_id: DEFAULT_CHAIN_ID,
            gas_per_pubdata_limit: DEFAULT_GAS_PER_PUBDATA_LIMIT,
            network: NetworkKind::Persistent,
            gas_limit: None,
            gas_price: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_gas_per_pubdata_limit(mut self, limit: u64) -> Self {
        self.gas_per_pubdata_limit = limit;
        self
    }

    pub fn with_network(mut self, network: NetworkKind) -> Self {
        self.network = network;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_kind_from_name() {
        assert_eq!(
            NetworkKind::from_network_name("inMemoryNode"),
            NetworkKind::Ephemeral
        );
        assert_eq!(
            NetworkKind::from_network_name("dockerizedNode"),
            NetworkKind::Ephemeral
        );
        assert_eq!(
            NetworkKind::from_network_name("localhost"),
            NetworkKind::Ephemeral
        );
        assert_eq!(
            NetworkKind::from_network_name("zkSyncSepoliaTestnet"),
            NetworkKind::Persistent
        );
        assert!(NetworkKind::Persistent.should_verify());
        assert!(!NetworkKind::Ephemeral.should_verify());
    }

    #[test]
    fn test_parse_network_config() {
        let config = NetworkConfig::try_parse_from([
            "aa-deploy",
            "--chain-id",
            "260",
            "--network",
            "inMemoryNode",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(config.chain_id, 260);
        assert_eq!(config.gas_per_pubdata, DEFAULT_GAS_PER_PUBDATA_LIMIT);
        assert_eq!(config.log_level, LevelFilter::DEBUG);

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.chain_id, 260);
        assert_eq!(orchestrator.network, NetworkKind::Ephemeral);
    }

    #[test]
    fn test_network_kind_override() {
        let config = NetworkConfig::try_parse_from([
            "aa-deploy",
            "--network",
            "inMemoryNode",
            "--network-kind",
            "persistent",
        ])
        .unwrap();
        assert_eq!(config.kind(), NetworkKind::Persistent);
        assert!(config.orchestrator_config().network.should_verify());

        let config =
            NetworkConfig::try_parse_from(["aa-deploy", "--network-kind", "ephemeral"]).unwrap();
        assert_eq!(config.network, "zkSyncSepoliaTestnet");
        assert_eq!(config.kind(), NetworkKind::Ephemeral);

        assert!(NetworkConfig::try_parse_from(["aa-deploy", "--network-kind", "mainnet"]).is_err());
    }

    #[test]
    fn test_orchestrator_config_builders() {
        let config = OrchestratorConfig::default()
            .with_gas_limit(2_000_000)
            .with_gas_price(1);
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.gas_limit, Some(2_000_000));
        assert_eq!(config.gas_price, Some(1));
    }
}
