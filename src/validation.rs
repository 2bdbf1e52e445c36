//! This module contains the validation snapshot: the read-only description
//! of every contract the external compile step produced, keyed by bytecode
//! fingerprint.
//!
//! The snapshot is injected explicitly into every resolving operation rather
//! than living in ambient global state, so concurrent pipelines over
//! different snapshots cannot observe each other.

use serde::{Deserialize, Serialize};

use crate::{
    bytecode::{Bytecode, LinkReference},
    chain::Address,
    error::resolution,
    layout::StorageLayout,
    manifest::ManifestDocument,
    version::{Digest, Version},
};

/// A read-only snapshot of every contract known to the compile step.
///
/// The deployer never mutates a snapshot; a fresh compile produces a fresh
/// snapshot.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationData {
    artifacts: Vec<ContractArtifact>,
}

impl ValidationData {
    /// Creates a new snapshot over the provided `artifacts`.
    #[must_use]
    pub fn new(artifacts: Vec<ContractArtifact>) -> Self {
        Self { artifacts }
    }

    /// Gets the artifacts in the snapshot.
    #[must_use]
    pub fn artifacts(&self) -> &[ContractArtifact] {
        self.artifacts.as_slice()
    }

    /// Finds the single artifact whose normalised bytecode matches the
    /// provided unlinked creation `bytecode`.
    ///
    /// # Errors
    ///
    /// - [`resolution::Error::UnknownBytecode`] when no artifact matches.
    /// - [`resolution::Error::AmbiguousBytecode`] when more than one does.
    pub fn artifact_for_bytecode(
        &self,
        bytecode: &Bytecode,
        link_references: &[LinkReference],
    ) -> resolution::Result<&ContractArtifact> {
        let fingerprint = bytecode.fingerprint(link_references);
        let matches: Vec<&ContractArtifact> = self
            .artifacts
            .iter()
            .filter(|artifact| artifact.fingerprint() == fingerprint)
            .collect();

        match matches.as_slice() {
            [] => Err(resolution::Error::UnknownBytecode),
            [only] => Ok(only),
            many => Err(resolution::Error::AmbiguousBytecode {
                matches: many.iter().map(|artifact| artifact.name.clone()).collect(),
            }),
        }
    }

    /// Finds the artifact corresponding to the provided `version`, if the
    /// snapshot contains one.
    #[must_use]
    pub fn artifact_for_version(&self, version: &Version) -> Option<&ContractArtifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.fingerprint() == *version.unlinked.bytes())
    }

    /// Gets the storage layout of the implementation identified by
    /// `version`.
    ///
    /// # Errors
    ///
    /// [`resolution::Error::UnknownVersion`] when no artifact in the
    /// snapshot corresponds to the version.
    pub fn layout_for_version(&self, version: &Version) -> resolution::Result<&StorageLayout> {
        self.artifact_for_version(version)
            .map(|artifact| &artifact.layout)
            .ok_or_else(|| resolution::Error::UnknownVersion {
                version: version.id_hex(),
            })
    }

    /// Gets the storage layout of the artifact whose unlinked fingerprint is
    /// `digest`, if the snapshot contains one.
    #[must_use]
    pub fn layout_for_unlinked_digest(&self, digest: &Digest) -> Option<&StorageLayout> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.fingerprint() == *digest.bytes())
            .map(|artifact| &artifact.layout)
    }
}

/// Reconstructs the storage layout of the implementation currently deployed
/// at `address`, as recorded in `manifest`.
///
/// When the recorded version still has an artifact in `validations` the
/// fresh layout from the snapshot is preferred over the recorded copy, so
/// that layout information follows the compiler output rather than whatever
/// was serialised at deployment time. The recorded copy is the fallback for
/// implementations whose source has since left the project.
///
/// # Errors
///
/// [`resolution::Error::UnrecordedImplementation`] when `address` has no
/// record in the manifest, deliberately failing closed instead of guessing
/// a layout from on-chain bytes.
pub fn layout_for_address(
    manifest: &ManifestDocument,
    validations: &ValidationData,
    address: Address,
) -> resolution::Result<StorageLayout> {
    let record = manifest
        .implementation_at(address)
        .ok_or(resolution::Error::UnrecordedImplementation { address })?;

    let fresh = validations.layout_for_unlinked_digest(&record.version.unlinked);
    Ok(fresh.unwrap_or(&record.layout).clone())
}

/// Everything the compile step knows about one contract.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ContractArtifact {
    /// The fully qualified name of the contract.
    pub name: String,

    /// The unlinked creation bytecode of the contract.
    pub bytecode: Bytecode,

    /// The spans of the creation bytecode that the linker fills in with
    /// library addresses.
    pub link_references: Vec<LinkReference>,

    /// The storage layout the compiler reports for the contract.
    pub layout: StorageLayout,

    /// The safety findings the validation step reports for the contract,
    /// already flattened across its inheritance chain.
    pub findings: Vec<SafetyFinding>,
}

impl ContractArtifact {
    /// Computes the fingerprint under which this artifact is keyed: the
    /// keccak256 digest of its normalised creation bytecode.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        self.bytecode.fingerprint(self.link_references.as_slice())
    }
}

/// One construct flagged by the validation step as unsafe for upgradeable
/// deployment.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SafetyFinding {
    /// The check the construct violates.
    pub check: SafetyCheck,

    /// The contract in which the construct occurs, which for inherited
    /// state may differ from the artifact carrying the finding.
    pub contract: String,

    /// A human-readable description of the construct, usually naming the
    /// variable or call site involved.
    pub detail: String,
}

/// The static checks an implementation must satisfy to be deployed behind a
/// proxy or beacon.
///
/// Each check can be waived individually through the deployment
/// configuration; there is no waiver that covers all of them at once.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyCheck {
    /// The contract declares a constructor with logic in it. Proxied state
    /// lives in the proxy, so constructor effects are lost to it; an
    /// initializer must be used instead.
    Constructor,

    /// A state variable is assigned at its declaration site, which has the
    /// same problem as constructor logic.
    StateVariableAssignment,

    /// A state variable is declared `immutable`; immutables are baked into
    /// the implementation's code rather than living in the proxy's storage.
    StateVariableImmutable,

    /// The contract performs a `delegatecall`, which from inside an
    /// implementation can be aimed at code that self-destructs the
    /// implementation out from under every proxy pointing at it.
    Delegatecall,

    /// The contract can `selfdestruct`, destroying the implementation out
    /// from under every proxy pointing at it.
    Selfdestruct,

    /// The contract links against an external library, whose own code is
    /// outside the reach of these checks.
    ExternalLibraryLinking,
}

impl std::fmt::Display for SafetyCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Constructor => "constructor",
            Self::StateVariableAssignment => "state-variable-assignment",
            Self::StateVariableImmutable => "state-variable-immutable",
            Self::Delegatecall => "delegatecall",
            Self::Selfdestruct => "selfdestruct",
            Self::ExternalLibraryLinking => "external-library-linking",
        };
        write!(f, "{name}")
    }
}
