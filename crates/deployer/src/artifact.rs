//! Hardhat compilation artifacts of the adapter contract.
//!
//! Hardhat writes one JSON file per contract to
//! `<artifacts>/<source name>/<contract name>.json` next to a `.dbg.json` file
//! that references the build info of the compiler run that produced it. The
//! artifact carries the creation code, the build info carries what explorers
//! need to reproduce the compilation.

use {
    crate::adapter::{CONTRACT_NAME, ConstructorArgs, SOURCE_NAME},
    alloy::primitives::Bytes,
    anyhow::{Context, Result, ensure},
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    bytecode: String,
}

impl Artifact {
    pub fn path(artifacts: &Path) -> PathBuf {
        artifacts
            .join(SOURCE_NAME)
            .join(format!("{CONTRACT_NAME}.json"))
    }

    pub fn load(artifacts: &Path) -> Result<Self> {
        let path = Self::path(artifacts);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read artifact {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid artifact {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: HardhatArtifact = serde_json::from_str(json)?;
        ensure!(
            artifact.contract_name == CONTRACT_NAME,
            "artifact is for {} instead of {CONTRACT_NAME}",
            artifact.contract_name
        );
        // Unlinked library references show up as `__$<hash>$__` placeholders.
        ensure!(
            !artifact.bytecode.contains("__"),
            "bytecode contains unlinked library references"
        );
        let bytecode = const_hex::decode(&artifact.bytecode).context("bytecode is not hex")?;
        ensure!(!bytecode.is_empty(), "{CONTRACT_NAME} has no bytecode");

        Ok(Self {
            contract_name: artifact.contract_name,
            source_name: artifact.source_name,
            bytecode: bytecode.into(),
        })
    }

    /// Creation code followed by the ABI encoded constructor arguments.
    pub fn creation_code(&self, args: ConstructorArgs) -> Bytes {
        [&self.bytecode[..], args.abi_encode().as_slice()]
            .concat()
            .into()
    }

    /// Fully qualified name as used by explorers, `<source>:<contract>`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// Compiler input and version of the run that produced an artifact.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    /// Standard JSON input handed to solc.
    pub input: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

impl BuildInfo {
    /// Loads the build info referenced by the adapter's debug file.
    pub fn load(artifacts: &Path) -> Result<Self> {
        let artifact = Artifact::path(artifacts);
        let debug_path = artifact.with_file_name(format!("{CONTRACT_NAME}.dbg.json"));
        let debug: DebugFile = serde_json::from_str(
            &std::fs::read_to_string(&debug_path)
                .with_context(|| format!("could not read {}", debug_path.display()))?,
        )
        .with_context(|| format!("invalid debug file {}", debug_path.display()))?;

        // The reference is relative to the directory of the debug file.
        let path = debug_path
            .parent()
            .map(|dir| dir.join(&debug.build_info))
            .unwrap_or(debug.build_info);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read build info {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("invalid build info {}", path.display()))
    }

    /// Compiler version in the form explorers expect, e.g.
    /// `v0.6.12+commit.27d51765`.
    pub fn compiler_version(&self) -> String {
        format!("v{}", self.solc_long_version)
    }
}
