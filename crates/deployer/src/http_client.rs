use {
    anyhow::Result,
    reqwest::{Client, ClientBuilder},
    std::{
        fmt::{self, Display, Formatter},
        time::Duration,
    },
};

const USER_AGENT: &str = concat!("deployer/", env!("CARGO_PKG_VERSION"));

/// An HTTP client factory.
///
/// Keeps the configuration of the clients talking to block explorers in one
/// place.
#[derive(Clone, Debug)]
pub struct HttpClientFactory {
    timeout: Duration,
}

impl HttpClientFactory {
    pub fn new(args: &Arguments) -> Self {
        Self {
            timeout: args.http_timeout,
        }
    }

    /// Creates a new HTTP client with the configured settings.
    pub fn create(&self) -> Result<Client> {
        Ok(ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?)
    }
}

/// Command line arguments for the common HTTP factory.
#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// Default timeout for http requests.
    #[clap(
        long,
        env,
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub http_timeout: Duration,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self { http_timeout } = self;

        writeln!(f, "http_timeout: {http_timeout:?}")
    }
}
