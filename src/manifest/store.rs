//! This module contains the durable store behind the deployment manifest: a
//! directory of per-network JSON documents with an insert-if-absent
//! primitive that is atomic with respect to concurrent writers.
//!
//! Atomicity has to hold across *processes*, not just threads, because
//! independent tool invocations share the same manifest directory. The
//! primitive is therefore built from two filesystem guarantees rather than
//! any in-process lock: `create_new` open of a lock file (which exactly one
//! contender can win) around the read-modify-write, and a temp-file rename
//! for the document write itself so that readers never observe a torn
//! document.

use std::{
    fs,
    fs::OpenOptions,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use log::debug;

use crate::{
    constant::{DEFAULT_MANIFEST_LOCK_RETRIES, DEFAULT_MANIFEST_LOCK_RETRY_DELAY_MS},
    error::manifest::{Error, Result},
    manifest::{DeploymentRecord, ManifestDocument, ProxyRecord},
};

/// The file extension of manifest documents.
const DOCUMENT_EXTENSION: &str = "json";

/// The file extension of manifest lock files.
const LOCK_EXTENSION: &str = "lock";

/// The outcome of an insert-if-absent against the store.
#[derive(Clone, Debug)]
pub enum InsertOutcome {
    /// The record was inserted; no record existed for the version.
    Inserted,

    /// A record for the version already existed and was left untouched; the
    /// existing record is carried for the caller to use.
    AlreadyPresent(DeploymentRecord),
}

/// A durable store of per-network manifest documents rooted at a directory.
#[derive(Clone, Debug)]
pub struct ManifestStore {
    /// The directory in which the per-network documents live.
    root: PathBuf,

    /// The number of times to retry acquiring a per-network lock.
    lock_retries: usize,

    /// The pause between attempts to acquire a per-network lock.
    lock_retry_delay: Duration,
}

impl ManifestStore {
    /// Creates a new store rooted at the provided `root` directory.
    ///
    /// The directory is created lazily on the first write, so constructing a
    /// store performs no I/O.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_retries: DEFAULT_MANIFEST_LOCK_RETRIES,
            lock_retry_delay: Duration::from_millis(DEFAULT_MANIFEST_LOCK_RETRY_DELAY_MS),
        }
    }

    /// Specifies how often and how patiently the store retries acquiring a
    /// per-network lock.
    #[must_use]
    pub fn with_lock_retries(mut self, retries: usize, delay: Duration) -> Self {
        self.lock_retries = retries;
        self.lock_retry_delay = delay;
        self
    }

    /// Gets the path of the manifest document for `network`.
    #[must_use]
    pub fn document_path(&self, network: &str) -> PathBuf {
        self.root.join(format!("{network}.{DOCUMENT_EXTENSION}"))
    }

    /// Gets the path of the lock file for `network`.
    #[must_use]
    pub fn lock_path(&self, network: &str) -> PathBuf {
        self.root.join(format!("{network}.{LOCK_EXTENSION}"))
    }

    /// Reads the manifest document for `network`, yielding a fresh empty
    /// document when none has been written yet.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] when the document exists but cannot be read.
    /// - [`Error::Corrupt`] when the document exists but does not parse.
    pub fn read(&self, network: &str) -> Result<ManifestDocument> {
        let path = self.document_path(network);
        if !path.exists() {
            return Ok(ManifestDocument::new(network));
        }

        let contents = fs::read(&path).map_err(|source| Error::Io {
            network: network.to_string(),
            source,
        })?;

        serde_json::from_slice(contents.as_slice()).map_err(|source| Error::Corrupt {
            network: network.to_string(),
            source,
        })
    }

    /// Inserts `record` for its version into the manifest for `network`,
    /// unless a record for that version already exists.
    ///
    /// The read-modify-write runs under the per-network lock, so exactly one
    /// of any set of racing writers inserts; the others observe the winner's
    /// record in the [`InsertOutcome::AlreadyPresent`] outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::LockContended`] when the lock cannot be acquired.
    /// - [`Error::Io`] / [`Error::Corrupt`] when the document cannot be
    ///   read back or written.
    pub fn insert_if_absent(&self, network: &str, record: DeploymentRecord) -> Result<InsertOutcome> {
        let version_id = record.version.id_hex();

        self.with_lock(network, |store| {
            let mut document = store.read(network)?;

            if let Some(existing) = document.implementation(&version_id) {
                debug!("manifest already records version {version_id}; leaving it untouched");
                return Ok(InsertOutcome::AlreadyPresent(existing.clone()));
            }

            document.implementations.insert(version_id, record);
            store.write(network, &document)?;

            Ok(InsertOutcome::Inserted)
        })
    }

    /// Removes the record for `version_id` from the manifest for `network`,
    /// reporting whether a record was actually removed.
    ///
    /// This exists for cache revalidation: a recorded address that no
    /// longer holds code (a wiped development chain, usually) must make way
    /// for a fresh deployment.
    ///
    /// # Errors
    ///
    /// As [`Self::insert_if_absent`].
    pub fn remove(&self, network: &str, version_id: &str) -> Result<bool> {
        self.with_lock(network, |store| {
            let mut document = store.read(network)?;

            let removed = document.implementations.remove(version_id).is_some();
            if removed {
                store.write(network, &document)?;
            }

            Ok(removed)
        })
    }

    /// Records the proxy described by `proxy` in the manifest for `network`,
    /// leaving any existing record for the same address untouched.
    ///
    /// # Errors
    ///
    /// As [`Self::insert_if_absent`].
    pub fn record_proxy(&self, network: &str, proxy: ProxyRecord) -> Result<()> {
        self.with_lock(network, |store| {
            let mut document = store.read(network)?;

            if document.proxy(proxy.address).is_none() {
                document.proxies.push(proxy);
                store.write(network, &document)?;
            }

            Ok(())
        })
    }

    /// Runs `operation` while holding the per-network lock for `network`.
    fn with_lock<T>(
        &self,
        network: &str,
        operation: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let guard = self.acquire_lock(network)?;
        let outcome = operation(self);
        drop(guard);

        outcome
    }

    /// Acquires the per-network lock for `network`, retrying within the
    /// configured budget.
    fn acquire_lock(&self, network: &str) -> Result<LockGuard> {
        let path = self.lock_path(network);
        self.ensure_root(network)?;

        for attempt in 0..=self.lock_retries {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(LockGuard { path }),
                Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt < self.lock_retries {
                        thread::sleep(self.lock_retry_delay);
                    }
                }
                Err(source) => {
                    return Err(Error::Io {
                        network: network.to_string(),
                        source,
                    })
                }
            }
        }

        Err(Error::LockContended {
            network:   network.to_string(),
            lock_path: path.display().to_string(),
        })
    }

    /// Writes `document` as the manifest for `network`.
    ///
    /// The document is serialised to a temporary file next to its final
    /// location and renamed into place, so a reader can never observe a
    /// partially written document.
    fn write(&self, network: &str, document: &ManifestDocument) -> Result<()> {
        self.ensure_root(network)?;

        let path = self.document_path(network);
        let temp_path = path.with_extension("tmp");

        let encoded =
            serde_json::to_vec_pretty(document).map_err(|source| Error::Corrupt {
                network: network.to_string(),
                source,
            })?;

        let io_error = |source| Error::Io {
            network: network.to_string(),
            source,
        };
        fs::write(&temp_path, encoded).map_err(io_error)?;
        fs::rename(&temp_path, &path).map_err(io_error)?;

        Ok(())
    }

    /// Ensures that the store's root directory exists.
    fn ensure_root(&self, network: &str) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| Error::Io {
            network: network.to_string(),
            source,
        })
    }
}

/// Holds the per-network lock file; removing it on drop releases the lock
/// even when the guarded operation fails.
#[derive(Debug)]
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(Path::new(&self.path));
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{InsertOutcome, ManifestStore};
    use crate::{
        chain::Address,
        error::manifest::Error,
        layout::StorageLayout,
        manifest::DeploymentRecord,
        proxy::ProxyKind,
        version::Version,
    };

    fn record_for(byte: u8) -> DeploymentRecord {
        let bytecode = crate::bytecode::Bytecode::new(vec![0x60, byte]);
        DeploymentRecord {
            version: Version::resolve(&bytecode, &[], &bytecode, &[]),
            address: Address::new([byte; 20]),
            tx_hash: None,
            layout:  StorageLayout::new(),
            abi:     serde_json::json!([]),
        }
    }

    #[test]
    fn reading_a_missing_document_yields_an_empty_one() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());

        let document = store.read("goerli")?;
        assert!(document.implementations.is_empty());

        Ok(())
    }

    #[test]
    fn first_insert_wins_and_later_inserts_observe_it() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());
        let record = record_for(0x01);

        // The first insert creates the record
        let first = store.insert_if_absent("goerli", record.clone())?;
        assert!(matches!(first, InsertOutcome::Inserted));

        // A competing insert for the same version yields the winner's record
        let mut competing = record.clone();
        competing.address = Address::new([0xff; 20]);
        let second = store.insert_if_absent("goerli", competing)?;
        match second {
            InsertOutcome::AlreadyPresent(existing) => {
                assert_eq!(existing.address, record.address);
            }
            InsertOutcome::Inserted => panic!("The second insert must not win"),
        }

        Ok(())
    }

    #[test]
    fn different_versions_do_not_contend() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());

        store.insert_if_absent("goerli", record_for(0x01))?;
        store.insert_if_absent("goerli", record_for(0x02))?;

        let document = store.read("goerli")?;
        assert_eq!(document.implementations.len(), 2);

        Ok(())
    }

    #[test]
    fn networks_have_independent_documents() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());

        store.insert_if_absent("goerli", record_for(0x01))?;

        assert_eq!(store.read("goerli")?.implementations.len(), 1);
        assert!(store.read("mainnet")?.implementations.is_empty());

        Ok(())
    }

    #[test]
    fn removal_clears_the_record() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());
        let record = record_for(0x01);
        let version_id = record.version.id_hex();

        store.insert_if_absent("goerli", record)?;
        assert!(store.remove("goerli", &version_id)?);
        assert!(!store.remove("goerli", &version_id)?);
        assert!(store.read("goerli")?.implementations.is_empty());

        Ok(())
    }

    #[test]
    fn a_stale_lock_file_is_reported_with_its_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path())
            .with_lock_retries(1, Duration::from_millis(1));

        // Simulate a crashed invocation that left its lock behind
        std::fs::create_dir_all(dir.path())?;
        std::fs::write(store.lock_path("goerli"), b"")?;

        let result = store.insert_if_absent("goerli", record_for(0x01));
        match result {
            Err(Error::LockContended { lock_path, .. }) => {
                assert!(lock_path.contains("goerli.lock"));
            }
            other => panic!("Expected lock contention, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn proxy_records_are_kept_per_address() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());
        let address = Address::new([0x01; 20]);

        store.record_proxy(
            "goerli",
            crate::manifest::ProxyRecord {
                address,
                kind: ProxyKind::Transparent,
            },
        )?;

        // Recording the same address again must not duplicate it or change
        // its kind
        store.record_proxy(
            "goerli",
            crate::manifest::ProxyRecord {
                address,
                kind: ProxyKind::Uups,
            },
        )?;

        let document = store.read("goerli")?;
        assert_eq!(document.proxies.len(), 1);
        assert_eq!(document.proxy(address).unwrap().kind, ProxyKind::Transparent);

        Ok(())
    }
}
