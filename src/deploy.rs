//! This module contains the orchestrator that ties the pipeline together:
//! resolve the deployment inputs, classify the upgrade target, run the
//! safety gates, and fetch or create the deployment through the manifest.
//!
//! The orchestrator is a linear state machine. Each step depends on the
//! previous one's output and a failure at any gate aborts the whole
//! deployment before anything is broadcast; there are no retries here, as
//! retry policy belongs to the chain provider and the deployment callback.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::{
    bytecode::{Bytecode, LinkReference},
    chain::{Address, ChainProvider, Transaction},
    error,
    layout::StorageLayout,
    manifest,
    manifest::{ManifestStore, RawDeployment},
    proxy,
    proxy::ProxyKind,
    safety,
    validation,
    validation::{ContractArtifact, SafetyCheck, ValidationData},
    version::Version,
};

/// The configuration for one deployment request.
///
/// Every `unsafe_` flag is an explicit opt-out of a gate that exists to
/// protect on-chain state; nothing in the pipeline ever sets one on the
/// caller's behalf.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeployConfig {
    /// The ABI-encoded constructor arguments the implementation will be
    /// deployed with.
    pub constructor_args: Vec<u8>,

    /// The static safety checks the caller explicitly waives.
    pub unsafe_allow: BTreeSet<SafetyCheck>,

    /// Skips the storage compatibility gate entirely; when set, the layout
    /// of the currently deployed implementation is not even computed.
    pub unsafe_skip_storage_check: bool,

    /// The proxy kind the caller expects the upgrade target to be, checked
    /// against what the on-chain code actually is.
    pub kind: Option<ProxyKind>,

    /// Fetches the deployment transaction and carries it in the result,
    /// even when the deployment was served from the manifest.
    pub get_tx_response: bool,
}

/// What the deployment is for: an implementation behind a proxy, or an
/// implementation a beacon points at.
///
/// In both arms the address is the upgrade target: `None` means a first
/// deployment with nothing on chain yet, `Some` means the proxy being
/// upgraded or the beacon being repointed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeployTarget {
    /// The implementation will live behind a transparent or UUPS proxy.
    Proxy {
        /// The proxy being upgraded, if this is an upgrade.
        address: Option<Address>,
    },

    /// The implementation will be pointed at by a beacon.
    Beacon {
        /// The beacon being repointed, if this is an upgrade.
        address: Option<Address>,
    },
}

/// The compiled output the caller wants deployed, as produced by its
/// compiler: the unlinked creation bytecode with its link references, and
/// the fully linked creation bytecode that will actually go on chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImplementationArtifact {
    /// The unlinked creation bytecode.
    pub unlinked_bytecode: Bytecode,

    /// The spans of the unlinked bytecode that the linker fills in.
    pub link_references: Vec<LinkReference>,

    /// The fully linked, deployable creation bytecode.
    pub linked_bytecode: Bytecode,
}

/// The resolved inputs of one deployment request: the version identity and
/// the validated artifact it corresponds to.
#[derive(Clone, Debug)]
pub struct DeployData<'a> {
    /// The content-addressed identity of the deployment.
    pub version: Version,

    /// The validated artifact the bytecode resolved to.
    pub artifact: &'a ContractArtifact,
}

impl<'a> DeployData<'a> {
    /// Resolves the deployment inputs: matches `source` to exactly one
    /// validated artifact and derives the version of the deployment.
    ///
    /// # Errors
    ///
    /// The resolution errors of
    /// [`ValidationData::artifact_for_bytecode`].
    pub fn resolve(
        validations: &'a ValidationData,
        source: &ImplementationArtifact,
        config: &DeployConfig,
    ) -> error::Result<Self> {
        let artifact = validations
            .artifact_for_bytecode(&source.unlinked_bytecode, source.link_references.as_slice())?;

        let version = Version::resolve(
            &source.unlinked_bytecode,
            source.link_references.as_slice(),
            &source.linked_bytecode,
            config.constructor_args.as_slice(),
        );

        Ok(Self { version, artifact })
    }

    /// Gets the storage layout of the resolved artifact.
    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.artifact.layout
    }
}

/// The terminal state of a successful deployment request.
#[derive(Clone, Debug)]
pub struct Deployment {
    /// The address of the implementation, freshly deployed or served from
    /// the manifest.
    pub address: Address,

    /// The deployment transaction, fetched only when the request asked for
    /// it.
    pub tx: Option<Transaction>,
}

/// Deploys the implementation described by `source` for the provided
/// `target` on `network`, reusing a previously recorded deployment of the
/// same version when one exists.
///
/// The pipeline runs strictly in order: resolve the deployment inputs,
/// classify the target, locate the implementation the upgrade replaces,
/// run the static safety gate, run the storage compatibility gate, then
/// fetch or create the deployment. Any gate failure aborts before the
/// deployment callback is invoked.
///
/// When `config.unsafe_skip_storage_check` is set, the storage gate is not
/// merely bypassed: the currently deployed layout is never fetched and no
/// storage reads happen at all, since the only reason to pay for them is
/// the comparison being skipped.
///
/// # Errors
///
/// A typed failure from whichever gate rejected; see [`crate::error`] for
/// the taxonomy.
#[allow(clippy::too_many_arguments)] // This is the composition point of the whole pipeline
pub fn deploy_implementation<P, F>(
    provider: &P,
    store: &ManifestStore,
    network: &str,
    validations: &ValidationData,
    source: &ImplementationArtifact,
    target: &DeployTarget,
    config: &DeployConfig,
    deploy_fn: F,
) -> error::Result<Deployment>
where
    P: ChainProvider,
    F: FnOnce() -> error::Result<RawDeployment>,
{
    // Resolve the deployment inputs
    let data = DeployData::resolve(validations, source, config)?;
    debug!(
        "resolved {} to version {}",
        data.artifact.name,
        data.version.id_hex()
    );

    // Classify the target, and locate the implementation this deployment
    // replaces unless the storage gate is switched off
    let current = match target {
        DeployTarget::Proxy {
            address: Some(address),
        } => {
            // A kind recorded for this proxy at creation binds later
            // upgrades just like an explicitly requested one
            let recorded = store.read(network)?.proxy(*address).map(|proxy| proxy.kind);
            let kind = proxy::assert_proxy_kind(provider, *address, config.kind.or(recorded))?;
            debug!("classified {address} as a `{kind}` proxy");

            if config.unsafe_skip_storage_check {
                None
            } else {
                proxy::implementation_at_proxy(provider, *address)?
            }
        }
        DeployTarget::Beacon {
            address: Some(address),
        } => {
            proxy::assert_not_proxy(provider, *address)?;

            if config.unsafe_skip_storage_check {
                None
            } else {
                proxy::implementation_at_beacon(provider, *address)?
            }
        }
        DeployTarget::Proxy { address: None } | DeployTarget::Beacon { address: None } => None,
    };

    // Reconstruct the layout the upgrade must stay compatible with
    let deployed_layout = match current {
        Some(address) => Some(validation::layout_for_address(
            &store.read(network)?,
            validations,
            address,
        )?),
        None => None,
    };
    if config.unsafe_skip_storage_check {
        info!("the storage compatibility gate is switched off for this deployment");
    }

    // The static gate runs for first deployments and upgrades alike
    safety::assert_upgrade_safe(validations, &data.version, config)?;

    // The storage gate runs only when there is a deployed layout to honour
    if let Some(deployed_layout) = &deployed_layout {
        safety::assert_storage_upgrade_safe(deployed_layout, data.layout())?;
    }

    // Fetch or create the deployment through the manifest
    let record = manifest::fetch_or_deploy(
        store,
        network,
        provider,
        &data.version,
        data.layout(),
        deploy_fn,
    )?;

    // Assemble the result, fetching the transaction only on request
    let tx = if config.get_tx_response {
        match record.tx_hash {
            Some(hash) => provider.get_transaction(hash)?,
            None => None,
        }
    } else {
        None
    };

    Ok(Deployment {
        address: record.address,
        tx,
    })
}
