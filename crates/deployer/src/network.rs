//! Network selection. Known networks come with a chain id and an RPC
//! endpoint, anything else has to be fully described on the command line.

use {
    crate::arguments::{display_option, display_secret_option},
    anyhow::{Context, Result},
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
    url::Url,
};

/// Configuration of the network the deployment runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    /// Chain id the network is expected to have. Deployments are refused
    /// when it is missing.
    pub chain_id: Option<u64>,
    pub node_url: Url,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Preset {
    Main,
    Ropsten,
    Kovan,
    Coverage,
    Hardhat,
    Localhost,
}

impl Preset {
    pub fn chain_id(self) -> Option<u64> {
        match self {
            Self::Main => Some(1),
            Self::Ropsten => Some(3),
            Self::Kovan => Some(42),
            Self::Coverage => Some(1337),
            Self::Hardhat => Some(31337),
            // Hardhat's implicit `localhost` network carries no chain id.
            Self::Localhost => None,
        }
    }

    /// Default RPC endpoint. Public networks are reached through Infura and
    /// need a project key.
    pub fn node_url(self, infura_key: Option<&str>) -> Result<Url> {
        let url = match self {
            Self::Main | Self::Ropsten | Self::Kovan => {
                let key = infura_key
                    .with_context(|| format!("network {self} needs --infura-key or --node-url"))?;
                let subdomain = match self {
                    Self::Main => "mainnet".to_string(),
                    other => other.to_string(),
                };
                format!("https://{subdomain}.infura.io/v3/{key}")
            }
            Self::Coverage => "http://localhost:8555".to_string(),
            Self::Hardhat => "http://localhost:8545".to_string(),
            Self::Localhost => "http://127.0.0.1:8545".to_string(),
        };
        Ok(url.parse()?)
    }
}

#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// Name of the network to deploy to. `main`, `ropsten`, `kovan`,
    /// `coverage`, `hardhat` and `localhost` are known, any other name is
    /// treated as a custom network and requires `--node-url`.
    #[clap(long, env, default_value = "kovan")]
    pub network: String,

    /// The Ethereum node URL to connect to. Overrides the network default.
    #[clap(long, env)]
    pub node_url: Option<Url>,

    /// Infura project key used to build node URLs for public networks.
    #[clap(long, env)]
    pub infura_key: Option<String>,

    /// Chain id of the network. Overrides the network default.
    #[clap(long, env)]
    pub chain_id: Option<u64>,
}

impl Arguments {
    /// Resolves the arguments into the configuration of the active network.
    pub fn network_config(&self) -> Result<NetworkConfig> {
        let (preset_chain_id, preset_url) = match Preset::from_str(&self.network) {
            Ok(preset) => {
                let url = match &self.node_url {
                    Some(url) => url.clone(),
                    None => preset.node_url(self.infura_key.as_deref())?,
                };
                (preset.chain_id(), url)
            }
            Err(_) => {
                let url = self.node_url.clone().with_context(|| {
                    format!("custom network {} needs --node-url", self.network)
                })?;
                (None, url)
            }
        };

        Ok(NetworkConfig {
            name: self.network.clone(),
            chain_id: self.chain_id.or(preset_chain_id),
            node_url: preset_url,
        })
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            network,
            node_url,
            infura_key,
            chain_id,
        } = self;

        writeln!(f, "network: {network}")?;
        // Node URLs frequently embed API keys.
        display_secret_option(f, "node_url", node_url)?;
        display_secret_option(f, "infura_key", infura_key)?;
        display_option(f, "chain_id", chain_id)?;
        Ok(())
    }
}
