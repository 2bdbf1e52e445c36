//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use ethnum::U256;
use upgrade_deployer::{
    bytecode::Bytecode,
    chain::{Address, ChainProvider, Transaction, TransactionRequest, TxHash},
    constant::{EIP1967_ADMIN_SLOT, EIP1967_BEACON_SLOT, EIP1967_IMPLEMENTATION_SLOT},
    deploy::ImplementationArtifact,
    error::provider,
    layout::{StorageItem, StorageLayout, StorageType},
    manifest::RawDeployment,
    validation::{ContractArtifact, SafetyCheck, SafetyFinding},
};

/// An in-memory chain for exercising the pipeline without a node.
///
/// Every read is counted so that tests can assert not just on outcomes but
/// on which collaborators were (or were not) consulted.
#[derive(Debug, Default)]
pub struct MockChain {
    code:         RefCell<HashMap<Address, Vec<u8>>>,
    storage:      RefCell<HashMap<(Address, U256), [u8; 32]>>,
    transactions: RefCell<HashMap<TxHash, Transaction>>,
    next_account: Cell<u8>,

    /// The number of `get_storage_at` calls the chain has served.
    pub storage_reads: Cell<usize>,

    /// The number of transactions the chain has accepted.
    pub transactions_sent: Cell<usize>,
}

#[allow(unused)] // Each suite uses its own subset
impl MockChain {
    /// Creates a new, empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `code` as the runtime code of a fresh account and returns
    /// its address.
    pub fn install(&self, code: Vec<u8>) -> Address {
        let address = self.fresh_address();
        self.code.borrow_mut().insert(address, code);
        address
    }

    /// Sets the storage `slot` of `address` to hold the provided `word`.
    pub fn set_storage(&self, address: Address, slot: U256, word: [u8; 32]) {
        self.storage.borrow_mut().insert((address, slot), word);
    }

    /// Sets the storage `slot` of `address` to hold the provided `points_at`
    /// address, in the low bytes as the proxy patterns store it.
    pub fn set_storage_address(&self, address: Address, slot: U256, points_at: Address) {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(points_at.bytes());
        self.set_storage(address, slot, word);
    }

    /// Removes all code from the chain, simulating a wiped development
    /// network.
    pub fn wipe(&self) {
        self.code.borrow_mut().clear();
        self.storage.borrow_mut().clear();
    }

    /// Gets the code installed at `address`, empty when there is none.
    #[must_use]
    pub fn code_at(&self, address: Address) -> Vec<u8> {
        self.code.borrow().get(&address).cloned().unwrap_or_default()
    }

    /// Broadcasts a creation transaction carrying `creation_code`, installs
    /// the code at a fresh address, and reports the deployment the way a
    /// deployment callback would.
    pub fn broadcast_deployment(&self, creation_code: &[u8]) -> RawDeployment {
        let hash = self
            .send_transaction(TransactionRequest {
                to:   None,
                data: creation_code.to_vec(),
            })
            .expect("The mock chain never rejects a transaction");
        let address = self.install(creation_code.to_vec());

        RawDeployment {
            address,
            tx_hash: Some(hash),
            abi: serde_json::json!([]),
        }
    }

    fn fresh_address(&self) -> Address {
        let index = self.next_account.get() + 1;
        self.next_account.set(index);
        Address::new([index; 20])
    }
}

impl ChainProvider for MockChain {
    fn get_code(&self, address: Address) -> provider::Result<Vec<u8>> {
        Ok(self.code.borrow().get(&address).cloned().unwrap_or_default())
    }

    fn get_storage_at(&self, address: Address, slot: U256) -> provider::Result<[u8; 32]> {
        self.storage_reads.set(self.storage_reads.get() + 1);
        Ok(self
            .storage
            .borrow()
            .get(&(address, slot))
            .copied()
            .unwrap_or([0u8; 32]))
    }

    fn send_transaction(&self, request: TransactionRequest) -> provider::Result<TxHash> {
        let index = self.transactions_sent.get() + 1;
        self.transactions_sent.set(index);

        let hash = TxHash::new([index as u8; 32]);
        self.transactions.borrow_mut().insert(
            hash,
            Transaction {
                hash,
                block_number: Some(index as u64),
                to: request.to,
                input: request.data,
            },
        );

        Ok(hash)
    }

    fn get_transaction(&self, hash: TxHash) -> provider::Result<Option<Transaction>> {
        Ok(self.transactions.borrow().get(&hash).cloned())
    }
}

/// Gets the canonical `uint256` storage type.
#[allow(unused)] // It is actually
pub fn uint256() -> StorageType {
    StorageType::new("t_uint256", 32)
}

/// Builds a layout declaring one `uint256` per label, one slot each, in the
/// order provided.
#[allow(unused)] // It is actually
pub fn layout_of(labels: &[&str]) -> StorageLayout {
    labels
        .iter()
        .enumerate()
        .map(|(slot, label)| StorageItem::new(*label, uint256(), slot, 0, "Vault"))
        .collect()
}

/// Builds a validated artifact named `name` with the provided creation
/// `code`, `layout`, and `findings`.
#[allow(unused)] // It is actually
pub fn artifact(
    name: &str,
    code: &[u8],
    layout: StorageLayout,
    findings: Vec<SafetyFinding>,
) -> ContractArtifact {
    ContractArtifact {
        name: name.into(),
        bytecode: Bytecode::new(code.to_vec()),
        link_references: vec![],
        layout,
        findings,
    }
}

/// Builds the deployment source for an artifact with no link references,
/// whose unlinked and linked bytecode therefore coincide.
#[allow(unused)] // It is actually
pub fn source_for(code: &[u8]) -> ImplementationArtifact {
    ImplementationArtifact {
        unlinked_bytecode: Bytecode::new(code.to_vec()),
        link_references:   vec![],
        linked_bytecode:   Bytecode::new(code.to_vec()),
    }
}

/// Builds a finding for `check` in the contract `Vault`.
#[allow(unused)] // It is actually
pub fn finding(check: SafetyCheck, detail: &str) -> SafetyFinding {
    SafetyFinding {
        check,
        contract: "Vault".into(),
        detail: detail.into(),
    }
}

/// Builds runtime code that embeds the provided 32-byte slot constants the
/// way the real proxy implementations do.
#[allow(unused)] // It is actually
pub fn code_embedding(slots: &[&str]) -> Vec<u8> {
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for slot in slots {
        code.push(0x7f); // PUSH32
        code.extend_from_slice(&slot_bytes(slot));
    }
    code.push(0x54); // SLOAD
    code
}

/// Builds the runtime code of a transparent proxy.
#[allow(unused)] // It is actually
pub fn transparent_proxy_code() -> Vec<u8> {
    code_embedding(&[EIP1967_IMPLEMENTATION_SLOT, EIP1967_ADMIN_SLOT])
}

/// Builds the runtime code of a UUPS proxy.
#[allow(unused)] // It is actually
pub fn uups_proxy_code() -> Vec<u8> {
    code_embedding(&[EIP1967_IMPLEMENTATION_SLOT])
}

/// Builds the runtime code of a beacon proxy.
#[allow(unused)] // It is actually
pub fn beacon_proxy_code() -> Vec<u8> {
    code_embedding(&[EIP1967_BEACON_SLOT])
}

/// Builds runtime code that matches no proxy pattern, as a beacon or plain
/// implementation would have.
#[allow(unused)] // It is actually
pub fn plain_code() -> Vec<u8> {
    vec![0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15]
}

/// Decodes a 32-byte hex slot constant.
#[allow(unused)] // It is actually
pub fn slot_bytes(slot: &str) -> [u8; 32] {
    let decoded = hex::decode(&slot[2..]).expect("The slot constant was not valid hexadecimal");
    decoded
        .as_slice()
        .try_into()
        .expect("The slot constant was not 32 bytes")
}

/// Parses a 32-byte hex slot constant into the word used as a storage key.
#[allow(unused)] // It is actually
pub fn slot_word(slot: &str) -> U256 {
    U256::from_str_hex(slot).expect("The slot constant was not valid hexadecimal")
}
