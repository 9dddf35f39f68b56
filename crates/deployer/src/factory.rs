//! Submission of the contract creation transaction.

use {
    crate::{adapter::ConstructorArgs, artifact::Artifact, ethrpc, signer::Signer},
    alloy::{
        network::{Ethereum, TransactionBuilder},
        primitives::{Address, TxHash},
        providers::{DynProvider, PendingTransactionBuilder, Provider},
        rpc::types::TransactionRequest,
    },
    anyhow::{Context, Result, ensure},
    std::path::PathBuf,
    url::Url,
};

/// Capability to submit a contract creation transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractFactory: Send + Sync {
    /// Sends the creation transaction signed by `signer`. Returns once the
    /// transaction was accepted by the node, not once it was mined.
    async fn deploy(&self, signer: Signer, args: ConstructorArgs) -> Result<Deployment>;
}

/// Handle of a submitted deployment.
pub struct Deployment {
    /// Address the contract will live at once the creation transaction is
    /// mined.
    pub address: Address,
    pub transaction: Box<dyn PendingTransaction>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PendingTransaction: Send {
    fn hash(&self) -> TxHash;

    /// Blocks until the transaction is mined with one confirmation. Fails if
    /// it reverted or the node gave up on it.
    async fn wait(&mut self) -> Result<()>;
}

/// Deploys through a JSON-RPC node.
pub struct NodeContractFactory {
    node_url: Url,
    /// Chain id the node has to report before anything is sent.
    chain_id: Option<u64>,
    artifacts: PathBuf,
}

impl NodeContractFactory {
    pub fn new(node_url: Url, chain_id: Option<u64>, artifacts: PathBuf) -> Self {
        Self {
            node_url,
            chain_id,
            artifacts,
        }
    }

    fn provider(&self, signer: Signer) -> DynProvider {
        match signer {
            Signer::Local(key) => ethrpc::provider_with_signer(&self.node_url, key),
            Signer::Node(_) => ethrpc::provider(&self.node_url),
        }
    }
}

#[async_trait::async_trait]
impl ContractFactory for NodeContractFactory {
    async fn deploy(&self, signer: Signer, args: ConstructorArgs) -> Result<Deployment> {
        let artifact = Artifact::load(&self.artifacts)?;
        let from = signer.address();
        let provider = self.provider(signer);

        if let Some(expected) = self.chain_id {
            ensure_chain_id(&provider, expected).await?;
        }

        let nonce = provider
            .get_transaction_count(from)
            .pending()
            .await
            .context("could not fetch deployer nonce")?;
        let address = from.create(nonce);

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_nonce(nonce)
            .with_deploy_code(artifact.creation_code(args));
        let pending = provider
            .send_transaction(tx)
            .await
            .context("failed to send creation transaction")?;
        tracing::debug!(%from, nonce, tx = ?pending.tx_hash(), "sent creation transaction");

        Ok(Deployment {
            address,
            transaction: Box::new(Creation {
                address,
                hash: *pending.tx_hash(),
                pending: Some(pending.with_required_confirmations(1)),
            }),
        })
    }
}

/// Guards against deploying the network specific constructor arguments to a
/// node of another chain.
async fn ensure_chain_id(provider: &DynProvider, expected: u64) -> Result<()> {
    let actual = provider
        .get_chain_id()
        .await
        .context("could not fetch chain id")?;
    ensure!(
        actual == expected,
        "node reports chain id {actual} but the network is configured with {expected}"
    );
    Ok(())
}

struct Creation {
    address: Address,
    hash: TxHash,
    pending: Option<PendingTransactionBuilder<Ethereum>>,
}

#[async_trait::async_trait]
impl PendingTransaction for Creation {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .context("creation transaction was already awaited")?;
        let receipt = pending
            .get_receipt()
            .await
            .context("failed to wait for creation transaction")?;
        ensure!(
            receipt.status(),
            "creation transaction {:?} reverted",
            receipt.transaction_hash
        );
        ensure!(
            receipt.contract_address == Some(self.address),
            "contract created at {:?} instead of the expected {}",
            receipt.contract_address,
            self.address
        );
        tracing::debug!(
            tx = ?receipt.transaction_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "creation transaction mined"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{U64, address},
            providers::{ProviderBuilder, mock::Asserter},
        },
    };

    #[test]
    fn create_address_follows_sender_nonce() {
        // First contract deployed by the first Hardhat dev account.
        let from = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(
            from.create(0),
            address!("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );
    }

    #[tokio::test]
    async fn missing_artifact_fails_before_contacting_the_node() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens on this port, a network call would fail with a
        // connection error instead.
        let factory = NodeContractFactory::new(
            "http://127.0.0.1:9".parse().unwrap(),
            Some(42),
            dir.path().to_path_buf(),
        );
        let Err(err) = factory
            .deploy(
                Signer::Node(Address::repeat_byte(1)),
                ConstructorArgs::KOVAN,
            )
            .await
        else {
            panic!("deployment without artifact succeeded");
        };
        assert!(format!("{err:?}").contains("could not read artifact"));
    }

    fn mocked_chain(chain_id: u64) -> DynProvider {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(chain_id));
        ProviderBuilder::new()
            .connect_mocked_client(asserter)
            .erased()
    }

    #[tokio::test]
    async fn accepts_matching_chain_id() {
        ensure_chain_id(&mocked_chain(42), 42).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_node_on_other_chain() {
        let err = ensure_chain_id(&mocked_chain(1), 42).await.unwrap_err();
        assert!(err.to_string().contains("chain id 1"));
    }
}
