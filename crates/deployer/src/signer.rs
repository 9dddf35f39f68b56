//! Accounts used to sign the deployment transaction.

use {
    crate::arguments::display_secret_option,
    alloy::{
        primitives::Address,
        providers::{DynProvider, Provider},
        signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    },
    anyhow::{Context, Result},
    std::fmt::{self, Display, Formatter},
};

/// Number of accounts derived from a mnemonic.
const MNEMONIC_ACCOUNTS: u32 = 20;

/// An account that can authorize transactions.
#[derive(Clone, Debug)]
pub enum Signer {
    /// Key held by this process.
    Local(PrivateKeySigner),
    /// Account unlocked on the node, transactions are signed by the node via
    /// `eth_sendTransaction`.
    Node(Address),
}

impl Signer {
    pub fn address(&self) -> Address {
        match self {
            Self::Local(signer) => signer.address(),
            Self::Node(address) => *address,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SignerProvider: Send + Sync {
    /// Returns the first available signer.
    async fn first_signer(&self) -> Result<Signer>;
}

/// Locally configured keys, falling back to the accounts the node manages
/// when none are configured.
pub struct Accounts {
    local: Vec<PrivateKeySigner>,
    provider: DynProvider,
}

impl Accounts {
    pub fn new(local: Vec<PrivateKeySigner>, provider: DynProvider) -> Self {
        Self { local, provider }
    }
}

#[async_trait::async_trait]
impl SignerProvider for Accounts {
    async fn first_signer(&self) -> Result<Signer> {
        if let Some(signer) = self.local.first() {
            return Ok(Signer::Local(signer.clone()));
        }
        let accounts = self
            .provider
            .get_accounts()
            .await
            .context("could not fetch node accounts")?;
        let account = accounts
            .first()
            .context("no local keys configured and the node manages no accounts")?;
        Ok(Signer::Node(*account))
    }
}

#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// BIP-39 mnemonic to derive the deployer accounts from
    /// (m/44'/60'/0'/0/<index>, first account at index 0).
    #[clap(long, env, conflicts_with = "private_keys")]
    pub mnemonic: Option<String>,

    /// Hex encoded private keys of the deployer accounts. The first one signs
    /// the deployment.
    #[clap(long = "private-key", env = "PRIVATE_KEYS", use_value_delimiter = true)]
    pub private_keys: Vec<String>,
}

impl Arguments {
    /// Signers configured on the command line, in account order.
    pub fn local_signers(&self) -> Result<Vec<PrivateKeySigner>> {
        if let Some(phrase) = &self.mnemonic {
            return (0..MNEMONIC_ACCOUNTS)
                .map(|index| {
                    MnemonicBuilder::<English>::default()
                        .phrase(phrase.as_str())
                        .index(index)?
                        .build()
                        .with_context(|| format!("could not derive account {index}"))
                })
                .collect();
        }
        self.private_keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                key.parse::<PrivateKeySigner>()
                    .with_context(|| format!("invalid private key at position {i}"))
            })
            .collect()
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            mnemonic,
            private_keys,
        } = self;

        display_secret_option(f, "mnemonic", mnemonic)?;
        writeln!(f, "private_keys: {} configured", private_keys.len())?;
        Ok(())
    }
}
