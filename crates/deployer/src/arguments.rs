//! Command line arguments of the deployment binary.

use {
    crate::{etherscan, http_client, network, signer},
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
    },
    tracing::level_filters::LevelFilter,
};

#[derive(clap::Parser)]
#[clap(
    name = "deploy-UniswapRepayAdapter",
    about = "Deploys the UniswapRepayAdapter contract"
)]
pub struct Arguments {
    /// Verify contract via explorer API.
    #[clap(long, env)]
    pub verify: bool,

    /// Directory holding the Hardhat compilation artifacts.
    #[clap(long, env, default_value = "artifacts")]
    pub artifacts: PathBuf,

    #[clap(flatten)]
    pub network: network::Arguments,

    #[clap(flatten)]
    pub accounts: signer::Arguments,

    #[clap(flatten)]
    pub etherscan: etherscan::Arguments,

    #[clap(flatten)]
    pub http_client: http_client::Arguments,

    #[clap(flatten)]
    pub logging: LoggingArguments,
}

#[derive(clap::Parser)]
#[group(skip)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,deployer=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    /// Output log events as JSON.
    #[clap(long, env)]
    pub log_json: bool,
}

impl LoggingArguments {
    pub fn observe_config(&self) -> observe::Config {
        observe::Config::new(
            &self.log_filter,
            self.log_stderr_threshold,
            self.log_json,
        )
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            verify,
            artifacts,
            network,
            accounts,
            etherscan,
            http_client,
            logging,
        } = self;

        writeln!(f, "verify: {verify}")?;
        writeln!(f, "artifacts: {}", artifacts.display())?;
        write!(f, "{network}")?;
        write!(f, "{accounts}")?;
        write!(f, "{etherscan}")?;
        write!(f, "{http_client}")?;
        write!(f, "{logging}")?;
        Ok(())
    }
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            log_json,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "log_json: {log_json}")?;
        Ok(())
    }
}

pub fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

pub fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}
