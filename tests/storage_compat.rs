//! This module provides integration tests for the storage compatibility
//! gate as exercised through upgrades of proxies and beacons.
#![cfg(test)]

use upgrade_deployer::{
    constant::EIP1967_IMPLEMENTATION_SLOT,
    deploy::{deploy_implementation, DeployConfig, DeployTarget},
    error::{safety, Error},
    manifest::ManifestStore,
    validation::ValidationData,
};

mod common;

use common::MockChain;

/// Deploys `code` as a fresh implementation and returns its address.
fn deploy_fresh(
    chain: &MockChain,
    store: &ManifestStore,
    validations: &ValidationData,
    code: &[u8],
) -> anyhow::Result<upgrade_deployer::chain::Address> {
    let deployment = deploy_implementation(
        chain,
        store,
        "goerli",
        validations,
        &common::source_for(code),
        &DeployTarget::Proxy { address: None },
        &DeployConfig::default(),
        || Ok(chain.broadcast_deployment(code)),
    )?;

    Ok(deployment.address)
}

#[test]
fn appending_variables_is_a_compatible_upgrade() -> anyhow::Result<()> {
    let chain = MockChain::new();
    let dir = tempfile::tempdir()?;
    let store = ManifestStore::new(dir.path());

    let code_v1 = common::plain_code();
    let mut code_v2 = common::plain_code();
    code_v2.push(0x01);

    let validations = ValidationData::new(vec![
        common::artifact("Vault", &code_v1, common::layout_of(&["owner", "total"]), vec![]),
        common::artifact(
            "VaultV2",
            &code_v2,
            common::layout_of(&["owner", "total", "paused"]),
            vec![],
        ),
    ]);

    // Deploy v1 and stand a proxy in front of it
    let implementation = deploy_fresh(&chain, &store, &validations, &code_v1)?;
    let proxy = chain.install(common::transparent_proxy_code());
    chain.set_storage_address(
        proxy,
        common::slot_word(EIP1967_IMPLEMENTATION_SLOT),
        implementation,
    );

    // Upgrading to the appended layout must pass the gate and deploy
    let upgraded = deploy_implementation(
        &chain,
        &store,
        "goerli",
        &validations,
        &common::source_for(&code_v2),
        &DeployTarget::Proxy {
            address: Some(proxy),
        },
        &DeployConfig::default(),
        || Ok(chain.broadcast_deployment(&code_v2)),
    )?;

    assert_ne!(upgraded.address, implementation);
    assert_eq!(store.read("goerli")?.implementations.len(), 2);

    Ok(())
}

#[test]
fn reordering_variables_fails_naming_both() -> anyhow::Result<()> {
    let chain = MockChain::new();
    let dir = tempfile::tempdir()?;
    let store = ManifestStore::new(dir.path());

    let code_v1 = common::plain_code();
    let mut code_v2 = common::plain_code();
    code_v2.push(0x01);

    let validations = ValidationData::new(vec![
        common::artifact("Vault", &code_v1, common::layout_of(&["owner", "total"]), vec![]),
        common::artifact(
            "VaultV2",
            &code_v2,
            common::layout_of(&["total", "owner"]),
            vec![],
        ),
    ]);

    let implementation = deploy_fresh(&chain, &store, &validations, &code_v1)?;
    let proxy = chain.install(common::transparent_proxy_code());
    chain.set_storage_address(
        proxy,
        common::slot_word(EIP1967_IMPLEMENTATION_SLOT),
        implementation,
    );

    let result = deploy_implementation(
        &chain,
        &store,
        "goerli",
        &validations,
        &common::source_for(&code_v2),
        &DeployTarget::Proxy {
            address: Some(proxy),
        },
        &DeployConfig::default(),
        || panic!("The callback must not be invoked when the storage gate rejects"),
    );

    // The rejection must name both reordered variables, not just the first
    match result {
        Err(Error::Safety(safety::Error::IncompatibleLayout(violations))) => {
            assert_eq!(violations.len(), 2);
            let rendered = violations.to_string();
            assert!(rendered.contains("owner"));
            assert!(rendered.contains("total"));
        }
        other => panic!("Expected a layout rejection, got {other:?}"),
    }

    Ok(())
}

#[test]
fn deleting_a_variable_fails_the_upgrade() -> anyhow::Result<()> {
    let chain = MockChain::new();
    let dir = tempfile::tempdir()?;
    let store = ManifestStore::new(dir.path());

    let code_v1 = common::plain_code();
    let mut code_v2 = common::plain_code();
    code_v2.push(0x01);

    let validations = ValidationData::new(vec![
        common::artifact("Vault", &code_v1, common::layout_of(&["owner", "total"]), vec![]),
        common::artifact("VaultV2", &code_v2, common::layout_of(&["owner"]), vec![]),
    ]);

    let implementation = deploy_fresh(&chain, &store, &validations, &code_v1)?;
    let proxy = chain.install(common::transparent_proxy_code());
    chain.set_storage_address(
        proxy,
        common::slot_word(EIP1967_IMPLEMENTATION_SLOT),
        implementation,
    );

    let result = deploy_implementation(
        &chain,
        &store,
        "goerli",
        &validations,
        &common::source_for(&code_v2),
        &DeployTarget::Proxy {
            address: Some(proxy),
        },
        &DeployConfig::default(),
        || panic!("The callback must not be invoked when the storage gate rejects"),
    );

    match result {
        Err(Error::Safety(safety::Error::IncompatibleLayout(violations))) => {
            assert!(violations.to_string().contains("total"));
        }
        other => panic!("Expected a layout rejection, got {other:?}"),
    }

    Ok(())
}

#[test]
fn beacon_upgrades_check_against_the_beacon_implementation() -> anyhow::Result<()> {
    let chain = MockChain::new();
    let dir = tempfile::tempdir()?;
    let store = ManifestStore::new(dir.path());

    let code_v1 = common::plain_code();
    let mut code_v2 = common::plain_code();
    code_v2.push(0x01);

    let validations = ValidationData::new(vec![
        common::artifact("Vault", &code_v1, common::layout_of(&["owner", "total"]), vec![]),
        common::artifact(
            "VaultV2",
            &code_v2,
            common::layout_of(&["total", "owner"]),
            vec![],
        ),
    ]);

    // Deploy v1 and stand a beacon (a plain contract) pointing at it
    let implementation = deploy_fresh(&chain, &store, &validations, &code_v1)?;
    let beacon = chain.install(common::plain_code());
    chain.set_storage_address(beacon, ethnum::U256::ZERO, implementation);

    // The incompatible candidate must be rejected against the layout of
    // what the beacon currently points at
    let result = deploy_implementation(
        &chain,
        &store,
        "goerli",
        &validations,
        &common::source_for(&code_v2),
        &DeployTarget::Beacon {
            address: Some(beacon),
        },
        &DeployConfig::default(),
        || panic!("The callback must not be invoked when the storage gate rejects"),
    );

    assert!(matches!(
        result,
        Err(Error::Safety(safety::Error::IncompatibleLayout(_)))
    ));

    Ok(())
}
