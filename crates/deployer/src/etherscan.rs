//! Source verification through the Etherscan contract API.
//!
//! For more information on the HTTP API, consult:
//! <https://docs.etherscan.io/api-endpoints/contracts#verify-source-code>

use {
    crate::{
        adapter::ConstructorArgs,
        arguments::{display_option, display_secret_option},
        artifact::{Artifact, BuildInfo},
    },
    alloy::primitives::Address,
    anyhow::{Context, Result, anyhow, bail},
    reqwest::{Client, Url},
    serde::Deserialize,
    std::{
        fmt::{self, Display, Formatter},
        num::NonZeroUsize,
        path::PathBuf,
        time::Duration,
    },
};

/// Service that publishes the source of a deployed contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractVerifier: Send + Sync {
    async fn verify(&self, address: Address, args: ConstructorArgs) -> Result<()>;
}

/// Etherscan API endpoint of a chain, `None` for chains Etherscan does not
/// serve.
pub fn api_url(chain_id: u64) -> Option<Url> {
    let url = match chain_id {
        1 => "https://api.etherscan.io/api",
        3 => "https://api-ropsten.etherscan.io/api",
        42 => "https://api-kovan.etherscan.io/api",
        _ => return None,
    };
    url.parse().ok()
}

/// Responses meaning the contract is verified already.
const ALREADY_VERIFIED: &[&str] = &["Contract source code already verified", "Already Verified"];

/// Responses that will not change by trying again.
const FATAL: &[&str] = &[
    "The address provided as argument contains a contract, but its bytecode",
    "Daily limit of 100 source code submissions reached",
    "has no bytecode",
    "Invalid API Key",
];

const PENDING: &str = "Pending in queue";
const VERIFIED: &str = "Pass - Verified";

/// Upper bound of status checks per submission.
const MAX_STATUS_POLLS: usize = 30;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Waited before the first submission and between attempts. Explorers
    /// need a while to index freshly deployed contracts.
    pub delay: Duration,
    pub attempts: NonZeroUsize,
    pub poll_interval: Duration,
}

pub struct Etherscan {
    client: Client,
    url: Option<Url>,
    api_key: Option<String>,
    artifacts: PathBuf,
    retry: RetryConfig,
}

/// Result of one submission that did not end in an error.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Verified,
    AlreadyVerified,
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("{0}")]
    Fatal(String),
    #[error(transparent)]
    Retryable(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

impl Response {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

fn classify_failure(result: &str) -> Result<Outcome, AttemptError> {
    if ALREADY_VERIFIED.iter().any(|ok| result.contains(ok)) {
        return Ok(Outcome::AlreadyVerified);
    }
    if FATAL.iter().any(|fatal| result.contains(fatal)) {
        return Err(AttemptError::Fatal(result.to_string()));
    }
    Err(AttemptError::Retryable(anyhow!("{result}")))
}

impl Etherscan {
    pub fn new(
        client: Client,
        url: Option<Url>,
        api_key: Option<String>,
        artifacts: PathBuf,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            url,
            api_key,
            artifacts,
            retry,
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        api_key: &str,
        form: &[(&str, &str)],
    ) -> Result<Outcome, AttemptError> {
        let submission: Response = self
            .client
            .post(url.clone())
            .form(form)
            .send()
            .await
            .context("submission request failed")?
            .error_for_status()
            .context("submission rejected")?
            .json()
            .await
            .context("invalid submission response")?;
        if !submission.is_ok() {
            tracing::debug!(message = %submission.message, "submission rejected");
            return classify_failure(&submission.result);
        }

        let guid = submission.result;
        tracing::debug!(%guid, "source code submitted");
        for _ in 0..MAX_STATUS_POLLS {
            tokio::time::sleep(self.retry.poll_interval).await;
            let status: Response = self
                .client
                .get(url.clone())
                .query(&[
                    ("apikey", api_key),
                    ("module", "contract"),
                    ("action", "checkverifystatus"),
                    ("guid", guid.as_str()),
                ])
                .send()
                .await
                .context("status request failed")?
                .error_for_status()
                .context("status check rejected")?
                .json()
                .await
                .context("invalid status response")?;
            match status.result.as_str() {
                PENDING => continue,
                VERIFIED => return Ok(Outcome::Verified),
                result if status.is_ok() => {
                    return Err(AttemptError::Retryable(anyhow!(
                        "unexpected verification status {result}"
                    )));
                }
                result => return classify_failure(result),
            }
        }
        Err(AttemptError::Retryable(anyhow!(
            "verification of {guid} still pending"
        )))
    }
}

#[async_trait::async_trait]
impl ContractVerifier for Etherscan {
    async fn verify(&self, address: Address, args: ConstructorArgs) -> Result<()> {
        let api_key = self.api_key.as_deref().context("missing Etherscan API key")?;
        let url = self
            .url
            .as_ref()
            .context("current network is not supported by Etherscan")?;

        let artifact = Artifact::load(&self.artifacts)?;
        let build_info = BuildInfo::load(&self.artifacts)?;
        let address = address.to_string();
        let source_code = serde_json::to_string(&build_info.input)?;
        let contract_name = artifact.qualified_name();
        let compiler_version = build_info.compiler_version();
        let constructor_args = const_hex::encode(args.abi_encode());
        let form = [
            ("apikey", api_key),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", contract_name.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // Etherscan's spelling.
            ("constructorArguements", constructor_args.as_str()),
        ];

        tracing::info!(
            delay = ?self.retry.delay,
            "delaying verification until Etherscan indexed the contract"
        );
        for attempt in 1..=self.retry.attempts.get() {
            tokio::time::sleep(self.retry.delay).await;
            match self.attempt(url, api_key, &form).await {
                Ok(Outcome::Verified) => {
                    tracing::info!(%address, "contract verified");
                    return Ok(());
                }
                Ok(Outcome::AlreadyVerified) => {
                    tracing::info!(%address, "contract was already verified");
                    return Ok(());
                }
                Err(AttemptError::Fatal(reason)) => {
                    bail!("verification failed permanently: {reason}");
                }
                Err(AttemptError::Retryable(err)) => {
                    tracing::warn!(
                        ?err,
                        attempt,
                        remaining = self.retry.attempts.get() - attempt,
                        "verification attempt failed"
                    );
                }
            }
        }
        bail!(
            "verification failed after {} attempts",
            self.retry.attempts
        )
    }
}

/// Etherscan API arguments.
#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// API key for Etherscan. Required when verifying.
    #[clap(long, env)]
    pub etherscan_api_key: Option<String>,

    /// Etherscan compatible API endpoint. Defaults to Etherscan's endpoint
    /// for the chain.
    #[clap(long, env)]
    pub etherscan_api_url: Option<Url>,

    /// Time to wait before the first verification attempt and between
    /// attempts.
    #[clap(
        long,
        env,
        default_value = "100s",
        value_parser = humantime::parse_duration,
    )]
    pub verification_delay: Duration,

    /// Number of verification attempts.
    #[clap(long, env, default_value = "4")]
    pub verification_attempts: NonZeroUsize,

    /// Interval between verification status checks.
    #[clap(
        long,
        env,
        default_value = "5s",
        value_parser = humantime::parse_duration,
    )]
    pub verification_poll_interval: Duration,
}

impl Arguments {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            delay: self.verification_delay,
            attempts: self.verification_attempts,
            poll_interval: self.verification_poll_interval,
        }
    }

    /// Endpoint to use for `chain_id`, preferring the configured override.
    pub fn api_url(&self, chain_id: Option<u64>) -> Option<Url> {
        self.etherscan_api_url
            .clone()
            .or_else(|| chain_id.and_then(api_url))
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            etherscan_api_key,
            etherscan_api_url,
            verification_delay,
            verification_attempts,
            verification_poll_interval,
        } = self;

        display_secret_option(f, "etherscan_api_key", etherscan_api_key)?;
        display_option(f, "etherscan_api_url", etherscan_api_url)?;
        writeln!(f, "verification_delay: {verification_delay:?}")?;
        writeln!(f, "verification_attempts: {verification_attempts}")?;
        writeln!(
            f,
            "verification_poll_interval: {verification_poll_interval:?}"
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::artifact::tests::write_artifacts,
        axum::{Form, Json, Router, extract::Query, routing::post},
        serde_json::{Value, json},
        std::{
            collections::HashMap,
            sync::{Arc, Mutex},
        },
    };

    #[derive(Clone, Default)]
    struct State {
        submissions: Arc<Mutex<Vec<HashMap<String, String>>>>,
        submission_responses: Arc<Mutex<Vec<Value>>>,
        status_responses: Arc<Mutex<Vec<Value>>>,
    }

    async fn submit(
        state: axum::extract::State<State>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        state.submissions.lock().unwrap().push(form);
        Json(state.submission_responses.lock().unwrap().remove(0))
    }

    async fn status(
        state: axum::extract::State<State>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        assert_eq!(query["action"], "checkverifystatus");
        assert_eq!(query["guid"], "guid-1");
        Json(state.status_responses.lock().unwrap().remove(0))
    }

    /// Serves the given responses in order and returns the API URL.
    async fn mock_api(submissions: Vec<Value>, statuses: Vec<Value>) -> (Url, State) {
        let state = State {
            submission_responses: Arc::new(Mutex::new(submissions)),
            status_responses: Arc::new(Mutex::new(statuses)),
            ..Default::default()
        };
        let app = Router::new()
            .route("/api", post(submit).get(status))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (url.parse().unwrap(), state)
    }

    fn etherscan(url: Option<Url>, api_key: Option<&str>, artifacts: PathBuf) -> Etherscan {
        Etherscan::new(
            Client::new(),
            url,
            api_key.map(str::to_string),
            artifacts,
            RetryConfig {
                delay: Duration::ZERO,
                attempts: NonZeroUsize::new(3).unwrap(),
                poll_interval: Duration::ZERO,
            },
        )
    }

    fn ok(result: &str) -> Value {
        json!({ "status": "1", "message": "OK", "result": result })
    }

    fn not_ok(result: &str) -> Value {
        json!({ "status": "0", "message": "NOTOK", "result": result })
    }

    #[test]
    fn supported_networks() {
        assert!(api_url(1).is_some());
        assert!(api_url(3).is_some());
        assert_eq!(
            api_url(42).unwrap().as_str(),
            "https://api-kovan.etherscan.io/api"
        );
        assert!(api_url(31337).is_none());
    }

    #[test]
    fn classifies_failures() {
        assert_eq!(
            classify_failure("Contract source code already verified").unwrap(),
            Outcome::AlreadyVerified
        );
        assert!(matches!(
            classify_failure("Invalid API Key"),
            Err(AttemptError::Fatal(_))
        ));
        assert!(matches!(
            classify_failure("Fail - Unable to verify"),
            Err(AttemptError::Retryable(_))
        ));
    }

    #[tokio::test]
    async fn submits_and_polls_until_verified() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), "0x6080");
        let (url, state) = mock_api(
            vec![ok("guid-1")],
            vec![ok(PENDING), ok(VERIFIED)],
        )
        .await;

        let address = Address::repeat_byte(0xab);
        etherscan(Some(url), Some("key"), dir.path().to_path_buf())
            .verify(address, ConstructorArgs::KOVAN)
            .await
            .unwrap();

        let submissions = state.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        let form = &submissions[0];
        assert_eq!(form["apikey"], "key");
        assert_eq!(form["action"], "verifysourcecode");
        assert_eq!(form["contractaddress"], address.to_string());
        assert_eq!(
            form["contractname"],
            "contracts/adapters/UniswapRepayAdapter.sol:UniswapRepayAdapter"
        );
        assert_eq!(form["compilerversion"], "v0.6.12+commit.27d51765");
        assert_eq!(
            form["constructorArguements"],
            const_hex::encode(ConstructorArgs::KOVAN.abi_encode())
        );
        let input: Value = serde_json::from_str(&form["sourceCode"]).unwrap();
        assert_eq!(input["language"], "Solidity");
    }

    #[tokio::test]
    async fn already_verified_is_success() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), "0x6080");
        let (url, state) = mock_api(
            vec![not_ok("Contract source code already verified")],
            vec![],
        )
        .await;

        etherscan(Some(url), Some("key"), dir.path().to_path_buf())
            .verify(Address::ZERO, ConstructorArgs::KOVAN)
            .await
            .unwrap();
        assert_eq!(state.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retries_until_attempts_are_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), "0x6080");
        let (url, state) = mock_api(
            vec![
                not_ok("Unable to locate ContractCode"),
                ok("guid-1"),
                not_ok("Unable to locate ContractCode"),
            ],
            vec![not_ok("Fail - Unable to verify")],
        )
        .await;

        let result = etherscan(Some(url), Some("key"), dir.path().to_path_buf())
            .verify(Address::ZERO, ConstructorArgs::KOVAN)
            .await;
        assert!(result.is_err());
        assert_eq!(state.submissions.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fatal_response_stops_retrying() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), "0x6080");
        let (url, state) = mock_api(vec![not_ok("Invalid API Key")], vec![]).await;

        let err = etherscan(Some(url), Some("key"), dir.path().to_path_buf())
            .verify(Address::ZERO, ConstructorArgs::KOVAN)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
        assert_eq!(state.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_network_or_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let url: Url = "http://127.0.0.1:9/api".parse().unwrap();

        let err = etherscan(None, Some("key"), dir.path().to_path_buf())
            .verify(Address::ZERO, ConstructorArgs::KOVAN)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not supported"));

        let err = etherscan(Some(url), None, dir.path().to_path_buf())
            .verify(Address::ZERO, ConstructorArgs::KOVAN)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn at_least_one_attempt() {
        use clap::Parser;

        assert!(Arguments::try_parse_from(["deploy", "--verification-attempts", "0"]).is_err());
        let args = Arguments::try_parse_from(["deploy", "--verification-attempts", "2"]).unwrap();
        assert_eq!(args.retry_config().attempts.get(), 2);
    }

    #[test]
    fn api_url_override_wins() {
        let args = Arguments {
            etherscan_api_key: None,
            etherscan_api_url: Some("http://explorer.local/api".parse().unwrap()),
            verification_delay: Duration::ZERO,
            verification_attempts: NonZeroUsize::MIN,
            verification_poll_interval: Duration::ZERO,
        };
        assert_eq!(
            args.api_url(Some(42)).unwrap().as_str(),
            "http://explorer.local/api"
        );
        assert!(
            Arguments {
                etherscan_api_url: None,
                ..args
            }
            .api_url(None)
            .is_none()
        );
    }
}
