pub mod adapter;
pub mod arguments;
pub mod artifact;
pub mod etherscan;
pub mod ethrpc;
pub mod factory;
pub mod http_client;
pub mod network;
pub mod signer;
pub mod task;

use {
    crate::{
        arguments::Arguments,
        etherscan::Etherscan,
        factory::NodeContractFactory,
        http_client::HttpClientFactory,
        signer::Accounts,
        task::{Context, Stdout},
    },
    alloy::primitives::Address,
    anyhow::{Result, ensure},
    clap::Parser,
    std::sync::Arc,
};

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    observe::tracing::initialize(&args.logging.observe_config());
    tracing::info!("running deployer with validated arguments:\n{}", args);
    if let Err(err) = run(args).await {
        tracing::error!(?err, "deployment task failed");
        std::process::exit(1);
    }
}

pub async fn run(args: Arguments) -> Result<Address> {
    let context = setup(&args)?;
    Ok(task::deploy_uniswap_repay_adapter(&context, args.verify).await?)
}

/// Builds the execution context of the deployment task from the command line.
/// Does not talk to the node or the explorer.
pub fn setup(args: &Arguments) -> Result<Context> {
    let network = args.network.network_config()?;
    ensure!(
        !args.verify || args.etherscan.etherscan_api_key.is_some(),
        "--verify needs an Etherscan API key"
    );

    let http_factory = HttpClientFactory::new(&args.http_client);
    let signers = Accounts::new(
        args.accounts.local_signers()?,
        ethrpc::provider(&network.node_url),
    );
    let factory = NodeContractFactory::new(
        network.node_url.clone(),
        network.chain_id,
        args.artifacts.clone(),
    );
    let verifier = Etherscan::new(
        http_factory.create()?,
        args.etherscan.api_url(network.chain_id),
        args.etherscan.etherscan_api_key.clone(),
        args.artifacts.clone(),
        args.etherscan.retry_config(),
    );

    Ok(Context {
        network,
        signers: Arc::new(signers),
        factory: Arc::new(factory),
        verifier: Arc::new(verifier),
        reporter: Arc::new(Stdout),
    })
}

#[cfg(test)]
mod tests {
    use {super::*, crate::task::DeployError};

    fn parse(args: &[&str]) -> Arguments {
        Arguments::try_parse_from(std::iter::once("deploy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_without_api_key_is_rejected_up_front() {
        let args = parse(&["--network", "hardhat", "--verify"]);
        assert!(setup(&args).is_err());
    }

    #[test]
    fn setup_resolves_network() {
        let args = parse(&["--network", "hardhat"]);
        let context = setup(&args).unwrap();
        assert_eq!(context.network.chain_id, Some(31337));
        assert_eq!(context.network.node_url.as_str(), "http://localhost:8545/");
    }

    #[tokio::test]
    async fn localhost_without_chain_id_is_rejected() {
        let args = parse(&["--network", "localhost", "--http-timeout", "1s"]);
        let err = run(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::InvalidChainId)
        ));
    }

    #[tokio::test]
    async fn zero_chain_id_is_rejected_before_contacting_the_node() {
        // Nothing listens on the node URL, reaching it would fail differently.
        let args = parse(&[
            "--network",
            "localhost",
            "--chain-id",
            "0",
            "--node-url",
            "http://127.0.0.1:9",
        ]);
        let err = run(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::InvalidChainId)
        ));
    }
}
