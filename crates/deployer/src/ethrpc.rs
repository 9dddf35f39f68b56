use {
    alloy::{
        network::EthereumWallet,
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::client::ClientBuilder,
        signers::local::PrivateKeySigner,
    },
    url::Url,
};

/// Read-only provider for the node at `url`. Transactions sent through it are
/// signed by the node.
pub fn provider(url: &Url) -> DynProvider {
    let rpc = ClientBuilder::default().http(url.clone());
    ProviderBuilder::new().connect_client(rpc).erased()
}

/// Provider that signs transactions locally with `signer`.
pub fn provider_with_signer(url: &Url, signer: PrivateKeySigner) -> DynProvider {
    let rpc = ClientBuilder::default().http(url.clone());
    ProviderBuilder::new()
        .wallet(EthereumWallet::new(signer))
        .connect_client(rpc)
        .erased()
}
