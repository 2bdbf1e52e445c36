//! This library manages the deployment of upgradeable contract
//! implementations behind [proxies](https://eips.ethereum.org/EIPS/eip-1967)
//! and beacons. Sending the transaction is the easy part and is left to the
//! caller; what the library owns is everything that must be true *before*
//! a transaction is worth sending, and the memory of what has already been
//! sent.
//!
//! # How it Works
//!
//! From a very high level, a deployment request is processed as follows:
//!
//! 1. The compiled bytecode is matched against the injected
//!    [`validation::ValidationData`] snapshot and a content-addressed
//!    [`version::Version`] is derived from it together with the ABI-encoded
//!    constructor arguments.
//! 2. The upgrade target is classified by [`proxy`] pattern matching the
//!    on-chain code: upgrades of a proxy must name an actual proxy of the
//!    expected kind, while beacon targets must *not* be proxies.
//! 3. The [`safety`] gates run: the static findings of the validation step
//!    must all be waived or absent, and for upgrades the candidate's
//!    [`layout::StorageLayout`] must be a compatible extension of the
//!    layout deployed behind the target.
//! 4. The [`manifest`] is consulted for an existing deployment of the same
//!    version. Only on a miss is the caller's deployment callback invoked,
//!    and the result is durably recorded with an insert that stays atomic
//!    across racing processes.
//!
//! # Basic Usage
//!
//! The interface entry point is [`deploy_implementation`], which drives the
//! whole pipeline:
//!
//! ```no_run
//! use upgrade_deployer::{
//!     bytecode::Bytecode,
//!     deploy::{DeployConfig, DeployTarget, ImplementationArtifact},
//!     manifest::ManifestStore,
//!     validation::ValidationData,
//! };
//!
//! # fn example(provider: impl upgrade_deployer::chain::ChainProvider) -> upgrade_deployer::error::Result<()> {
//! let store = ManifestStore::new(".deployments");
//! let validations: ValidationData = ValidationData::default();
//! let source = ImplementationArtifact {
//!     unlinked_bytecode: Bytecode::from_hex("0x6080604052").unwrap(),
//!     link_references:   vec![],
//!     linked_bytecode:   Bytecode::from_hex("0x6080604052").unwrap(),
//! };
//!
//! let deployment = upgrade_deployer::deploy_implementation(
//!     &provider,
//!     &store,
//!     "mainnet",
//!     &validations,
//!     &source,
//!     &DeployTarget::Proxy { address: None },
//!     &DeployConfig::default(),
//!     || {
//!         // Broadcast the deployment and report where it landed
//!         # unimplemented!()
//!     },
//! )?;
//! println!("implementation at {}", deployment.address);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod bytecode;
pub mod chain;
pub mod constant;
pub mod deploy;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod proxy;
pub mod safety;
pub mod utility;
pub mod validation;
pub mod version;

// Re-exports to provide the library interface.
pub use deploy::{deploy_implementation, DeployConfig, DeployTarget, Deployment};
pub use layout::StorageLayout;
pub use version::Version;
