use std::path::PathBuf;

use alloy_primitives::{
    Address,
    Bytes,
};
use anyhow::{
    Context,
    Result,
};
use clap::{
    Parser,
    Subcommand,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use zk_aa_core::{
    codec,
    create2_address_for_input,
    primitives::Salt,
};
use zk_aa_deployer::{
    Artifact,
    NetworkConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "aa-deploy",
    author,
    version,
    about = "Offline helpers for deterministic account deployments"
)]
struct Cli {
    #[command(flatten)]
    network: NetworkConfig,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the bytecode hash of a compiled contract
    Hash {
        #[arg(long)]
        artifact: PathBuf,
    },
    /// Print the address a salted deployment will occupy
    Predict {
        #[arg(long)]
        artifact: PathBuf,
        /// Deployer of the contract: the sending account or a factory
        #[arg(long)]
        deployer: Address,
        #[arg(long)]
        salt: Option<Salt>,
        /// ABI encoded constructor input
        #[arg(long)]
        input: Option<Bytes>,
    },
    /// Decode a serialized account-abstraction envelope
    Decode { raw: Bytes },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.network.log_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(
        chain_id = cli.network.chain_id,
        network = %cli.network.network,
        kind = ?cli.network.kind(),
        "Starting aa-deploy"
    );

    match cli.command {
        Command::Hash { artifact } => {
            let artifact = Artifact::load(&artifact)?;
            println!("{}", artifact.code_hash()?);
        }
        Command::Predict {
            artifact,
            deployer,
            salt,
            input,
        } => {
            let artifact = Artifact::load(&artifact)?;
            let input = input.unwrap_or_default();
            let address = create2_address_for_input(
                deployer,
                artifact.code_hash()?,
                salt.unwrap_or(Salt::ZERO),
                &input,
            );
            println!("{address}");
        }
        Command::Decode { raw } => {
            let envelope = codec::decode(&raw).context("failed to decode envelope")?;
            let factory_deps: Vec<String> = envelope
                .factory_deps()
                .hashes()
                .map(ToString::to_string)
                .collect();
            let decoded = json!({
                "type": envelope.tx_type().marker(),
                "chainId": envelope.chain_id(),
                "nonce": envelope.nonce(),
                "from": envelope.from(),
                "to": envelope.to(),
                "value": envelope.value(),
                "data": envelope.input(),
                "gasLimit": envelope.gas_limit(),
                "maxFeePerGas": envelope.gas_price().to_string(),
                "maxPriorityFeePerGas": envelope.max_priority_fee_per_gas().to_string(),
                "gasPerPubdata": envelope.gas_per_pubdata_limit(),
                "factoryDeps": factory_deps,
                "customSignature": envelope.custom_signature().map(|signature| signature.as_bytes()),
                "paymaster": envelope.paymaster().map(|params| json!({
                    "paymaster": params.paymaster,
                    "input": params.input,
                })),
                "signingDigest": envelope.signing_digest(),
                "hash": envelope.tx_hash(),
            });
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
    }

    Ok(())
}
