//! The deployment task: validate the network, deploy the adapter, wait for it
//! to be mined and optionally verify its source.

use {
    crate::{
        adapter::{CONTRACT_NAME, ConstructorArgs},
        etherscan::ContractVerifier,
        factory::ContractFactory,
        network::NetworkConfig,
        signer::SignerProvider,
    },
    alloy::primitives::Address,
    anyhow::Context as _,
    std::sync::Arc,
};

/// Everything the deployment task depends on.
pub struct Context {
    pub network: NetworkConfig,
    pub signers: Arc<dyn SignerProvider>,
    pub factory: Arc<dyn ContractFactory>,
    pub verifier: Arc<dyn ContractVerifier>,
    pub reporter: Arc<dyn Reporter>,
}

/// Receives the address of the deployed contract as soon as it is mined.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter: Send + Sync {
    fn deployed(&self, address: Address);
}

/// Prints the deployment report to stdout, where scripts pick it up.
pub struct Stdout;

impl Reporter for Stdout {
    fn deployed(&self, address: Address) {
        println!("{}", report_line(address));
    }
}

pub fn report_line(address: Address) -> String {
    format!("{CONTRACT_NAME}.address {address}")
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("INVALID_CHAIN_ID")]
    InvalidChainId,
    /// Nothing is known to be on chain.
    #[error("UniswapRepayAdapter deployment failed")]
    Deployment(#[source] anyhow::Error),
    /// The contract is live but its source could not be verified.
    #[error("UniswapRepayAdapter deployed at {address} but verification failed")]
    Verification {
        address: Address,
        #[source]
        source: anyhow::Error,
    },
}

/// Deploys `UniswapRepayAdapter` with the Kovan constructor arguments and
/// returns its address. With `verify` set the source is verified once the
/// creation transaction is mined.
///
/// Every call submits a new creation transaction.
pub async fn deploy_uniswap_repay_adapter(
    ctx: &Context,
    verify: bool,
) -> Result<Address, DeployError> {
    // A chain id of zero counts as unset.
    let Some(chain_id) = ctx.network.chain_id.filter(|id| *id != 0) else {
        return Err(DeployError::InvalidChainId);
    };

    tracing::info!(network = %ctx.network.name, chain_id, "{CONTRACT_NAME} deployment");
    let args = ConstructorArgs::KOVAN;

    let signer = ctx
        .signers
        .first_signer()
        .await
        .context("could not acquire a signer")
        .map_err(DeployError::Deployment)?;
    tracing::debug!(deployer = %signer.address(), "acquired signer");

    let mut deployment = ctx
        .factory
        .deploy(signer, args)
        .await
        .map_err(DeployError::Deployment)?;
    let address = deployment.address;
    tracing::info!(
        %address,
        tx = ?deployment.transaction.hash(),
        "waiting for creation transaction"
    );

    deployment
        .transaction
        .wait()
        .await
        .map_err(DeployError::Deployment)?;
    tracing::info!("{}", report_line(address));
    ctx.reporter.deployed(address);

    if verify {
        tracing::info!(%address, "verifying {CONTRACT_NAME}");
        ctx.verifier
            .verify(address, args)
            .await
            .map_err(|source| DeployError::Verification { address, source })?;
    }

    tracing::info!("finished {CONTRACT_NAME} deployment");
    Ok(address)
}
