//! This module contains the durable record of what has been deployed: a
//! per-network document mapping each implementation version to the
//! deployment that realised it, plus auxiliary records of the proxies the
//! tooling has created.
//!
//! The document is the memoisation table of the whole pipeline. Its one
//! hard invariant is that a given (network, version) pair is deployed at
//! most once: a version already present in the document short-circuits the
//! deployment callback entirely, and the store's insert primitive makes the
//! at-most-one guarantee hold even across racing processes.

pub mod store;

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use self::store::{InsertOutcome, ManifestStore};
use crate::{
    chain::{Address, ChainProvider, TxHash},
    constant::MANIFEST_SCHEMA_VERSION,
    error,
    error::manifest::Error,
    layout::StorageLayout,
    proxy::ProxyKind,
    version::Version,
};

/// The manifest document for one network.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ManifestDocument {
    /// The schema version of the document.
    pub schema_version: u32,

    /// The network the document describes.
    pub network: String,

    /// The recorded implementation deployments, keyed by the hex encoding
    /// of their version identifier.
    pub implementations: BTreeMap<String, DeploymentRecord>,

    /// The proxies the tooling has created on this network.
    pub proxies: Vec<ProxyRecord>,
}

impl ManifestDocument {
    /// Creates a new, empty document for `network`.
    #[must_use]
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            schema_version:  MANIFEST_SCHEMA_VERSION,
            network:         network.into(),
            implementations: BTreeMap::new(),
            proxies:         Vec::new(),
        }
    }

    /// Gets the deployment record for the version identified by
    /// `version_id`, if one has been recorded.
    #[must_use]
    pub fn implementation(&self, version_id: &str) -> Option<&DeploymentRecord> {
        self.implementations.get(version_id)
    }

    /// Gets the deployment record of the implementation deployed at
    /// `address`, if one has been recorded.
    #[must_use]
    pub fn implementation_at(&self, address: Address) -> Option<&DeploymentRecord> {
        self.implementations
            .values()
            .find(|record| record.address == address)
    }

    /// Gets the proxy record for `address`, if one has been recorded.
    #[must_use]
    pub fn proxy(&self, address: Address) -> Option<&ProxyRecord> {
        self.proxies.iter().find(|proxy| proxy.address == address)
    }
}

/// The durable record of one implementation deployment.
///
/// A record is created exactly once per (network, version) pair and is
/// never updated in place afterwards; an implementation that differs in any
/// way has a different version and hence a different record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DeploymentRecord {
    /// The version of the implementation the record describes.
    pub version: Version,

    /// The address the implementation was deployed at.
    pub address: Address,

    /// The hash of the deployment transaction, when one is known.
    ///
    /// Records imported from elsewhere may legitimately lack one.
    pub tx_hash: Option<TxHash>,

    /// The storage layout of the implementation at deployment time, kept so
    /// that future upgrades can be checked even after the source has left
    /// the project.
    pub layout: StorageLayout,

    /// The ABI of the implementation, kept verbatim as the deployment
    /// callback reported it.
    pub abi: serde_json::Value,
}

/// The record of one proxy created by the tooling.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProxyRecord {
    /// The address of the proxy.
    pub address: Address,

    /// The proxy pattern the proxy was created with, which must remain
    /// stable for the address across its lifetime.
    pub kind: ProxyKind,
}

/// What the caller-supplied deployment callback reports back after
/// broadcasting a deployment.
#[derive(Clone, Debug)]
pub struct RawDeployment {
    /// The address the implementation was deployed at.
    pub address: Address,

    /// The hash of the deployment transaction, when the callback has one.
    pub tx_hash: Option<TxHash>,

    /// The ABI of the deployed implementation.
    pub abi: serde_json::Value,
}

/// Fetches the deployment record for `version` on `network`, deploying via
/// `deploy_fn` only when no valid record exists.
///
/// On a hit the recorded address is revalidated against the chain: an
/// address that no longer holds code (a wiped development chain, usually)
/// invalidates the record, which is removed and replaced by a fresh
/// deployment. On a miss `deploy_fn` is invoked exactly once; losing the
/// insert race to a concurrent writer yields the winner's record.
///
/// A failure to record a deployment that did reach the chain is surfaced as
/// [`Error::OrphanedDeployment`] rather than a plain store failure, since
/// silently losing the record would permit duplicate deployments on later
/// runs.
///
/// # Errors
///
/// - Provider failures during revalidation, propagated unchanged.
/// - Whatever `deploy_fn` fails with, propagated unchanged and unretried.
/// - [`Error::OrphanedDeployment`] for the partial-write hazard above.
pub fn fetch_or_deploy<P, F>(
    store: &ManifestStore,
    network: &str,
    provider: &P,
    version: &Version,
    layout: &StorageLayout,
    deploy_fn: F,
) -> error::Result<DeploymentRecord>
where
    P: ChainProvider,
    F: FnOnce() -> error::Result<RawDeployment>,
{
    let version_id = version.id_hex();

    if let Some(record) = store.read(network)?.implementation(&version_id) {
        let code = provider.get_code(record.address)?;
        if code.is_empty() {
            warn!(
                "version {version_id} is recorded at {} but no code is there; discarding the \
                 stale record",
                record.address
            );
            store.remove(network, &version_id)?;
        } else {
            debug!(
                "version {version_id} is already deployed at {}; skipping deployment",
                record.address
            );
            return Ok(record.clone());
        }
    }

    let raw = deploy_fn()?;
    info!("deployed version {version_id} at {}", raw.address);

    let record = DeploymentRecord {
        version: *version,
        address: raw.address,
        tx_hash: raw.tx_hash,
        layout:  layout.clone(),
        abi:     raw.abi,
    };

    match store.insert_if_absent(network, record.clone()) {
        Ok(InsertOutcome::Inserted) => Ok(record),
        Ok(InsertOutcome::AlreadyPresent(existing)) => {
            warn!(
                "a concurrent deployment of version {version_id} was recorded first at {}; the \
                 deployment at {} is redundant",
                existing.address, record.address
            );
            Ok(existing)
        }
        Err(cause) => Err(Error::orphaned(record.address, version_id, cause).into()),
    }
}
